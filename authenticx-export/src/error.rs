//! Error types for the export pipeline.

use authenticx_core::ConfigError;
use std::path::PathBuf;

/// Top-level error for a single export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from snapshotting a live widget.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture region not found: {region}")]
    RegionNotFound { region: String },

    #[error("Element {id} is not part of the surface")]
    UnknownElement { id: u32 },

    #[error("Fonts never became ready: {message}")]
    FontsUnavailable { message: String },

    #[error("Unsupported color in '{property}': {value}")]
    UnsupportedColor { property: String, value: String },

    #[error("Rasterization failed: {message}")]
    RasterFailed { message: String },
}

/// Errors from encoding a document as PDF.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Document has no pages")]
    NoPages,

    #[error("PDF encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_converts_into_export_error() {
        let err: ExportError = CaptureError::RegionNotFound {
            region: "heatmap-section".into(),
        }
        .into();
        assert!(matches!(
            err,
            ExportError::Capture(CaptureError::RegionNotFound { .. })
        ));
        assert_eq!(
            err.to_string(),
            "Capture error: Capture region not found: heatmap-section"
        );
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ExportError::Io {
            path: PathBuf::from("/tmp/x.pdf"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to write /tmp/x.pdf: disk full");
    }
}

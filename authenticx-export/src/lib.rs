//! AuthenticX Export: turns scan results into downloadable PDF reports.
//!
//! - **Color conversion:** OKLCH / OKLAB to sRGB rewriting for capture
//! - **Snapshot capture:** expand, clone, normalize and rasterize a live widget
//! - **Layout:** paginated table, bar chart, heatmap grid, attack path and image slices
//! - **Output:** PDF serialization and document sinks
//! - **Orchestration:** [`ReportExporter`], one operation per document type

pub mod capture;
pub mod color;
pub mod error;
pub mod exporter;
pub mod layout;
pub mod pdf;
pub mod sink;
pub mod widgets;

// Re-exports for convenience
pub use capture::{RenderSurface, SceneSurface, Snapshot, SnapshotCapturer};
pub use color::{ColorConversion, Rgba, convert};
pub use error::{CaptureError, ExportError, PdfError};
pub use exporter::{DocumentKind, ExportReceipt, ReportExporter, sanitize_target};
pub use layout::{Document, LayoutEngine, PageGeometry, Section, ShapeStyle};
pub use pdf::PdfMetadata;
pub use sink::{DirectorySink, DocumentSink, MemorySink};

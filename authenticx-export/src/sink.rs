//! Destinations for finished documents.

use crate::error::ExportError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores serialized documents under a file name.
pub trait DocumentSink: Send + Sync {
    /// Save `bytes` as `file_name` and return where it ended up.
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Writes documents into a directory.
///
/// Each file is written to a `.tmp` sibling and renamed into place, so a
/// partial document never appears under its final name.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DocumentSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        let path = self.dir.join(file_name);
        let io_err = |source| ExportError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = path.with_extension("pdf.tmp");
        if let Err(source) = std::fs::write(&tmp, bytes) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(source));
        }
        if let Err(source) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(source));
        }
        tracing::info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Keeps documents in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of saved documents, in save order.
    pub fn file_names(&self) -> Vec<String> {
        self.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Bytes of the most recent document saved under `file_name`.
    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.lock()
            .iter()
            .rev()
            .find(|(name, _)| name == file_name)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Vec<u8>)>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentSink for MemorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        self.lock().push((file_name.to_string(), bytes.to_vec()));
        tracing::info!("Stored {} in memory ({} bytes)", file_name, bytes.len());
        Ok(PathBuf::from(file_name))
    }
}

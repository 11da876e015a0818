use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shared::{Result, ServiceError};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::media::file::MediaFile;

/// Hands out local preview copies of selected files and counts the live ones.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    live: Arc<AtomicUsize>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the file to a temporary location the operator can open.
    ///
    /// Blocking; call from a blocking-capable context.
    pub fn create(&self, file: &MediaFile) -> Result<PreviewHandle> {
        let suffix = file
            .extension()
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        let mut temp = tempfile::Builder::new()
            .prefix("matrix-preview-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| ServiceError::Internal(format!("Failed to create preview: {}", e)))?;

        temp.write_all(file.bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| ServiceError::Internal(format!("Failed to write preview: {}", e)))?;

        self.live.fetch_add(1, Ordering::SeqCst);
        debug!(path = %temp.path().display(), "Created preview");

        Ok(PreviewHandle {
            file: temp,
            live: Arc::clone(&self.live),
        })
    }

    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Owned preview reference; dropping it deletes the file.
pub struct PreviewHandle {
    file: NamedTempFile,
    live: Arc<AtomicUsize>,
}

impl PreviewHandle {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(path = %self.file.path().display(), "Released preview");
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("path", &self.file.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_holds_file_contents() {
        let store = PreviewStore::new();
        let file = MediaFile::new("logo.png", "image/png", b"pixels".to_vec());

        let preview = store.create(&file).unwrap();

        assert_eq!(std::fs::read(preview.path()).unwrap(), b"pixels");
        assert!(preview.path().to_string_lossy().ends_with(".png"));
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn test_drop_releases_once() {
        let store = PreviewStore::new();
        let file = MediaFile::new("logo.png", "image/png", b"pixels".to_vec());

        let first = store.create(&file).unwrap();
        let second = store.create(&file).unwrap();
        let path = first.path().to_path_buf();
        assert_eq!(store.live_count(), 2);

        drop(first);
        assert_eq!(store.live_count(), 1);
        assert!(!path.exists());

        drop(second);
        assert_eq!(store.live_count(), 0);
    }
}

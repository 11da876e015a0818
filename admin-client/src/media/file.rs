use std::path::Path;
use std::sync::Arc;

use shared::{Result, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

impl MediaKind {
    pub fn from_mime(mime_type: &str) -> Self {
        let top_level = mime_type
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match top_level.as_str() {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            _ => MediaKind::Unsupported,
        }
    }
}

/// MIME type for the extensions the display backend knows how to render.
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "bmp" => Some("image/bmp"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "mp4" => Some("video/mp4"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}

/// A file picked for upload, held in memory.
#[derive(Clone)]
pub struct MediaFile {
    file_name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl MediaFile {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Reads a file from disk, inferring the MIME type from its extension
    /// unless one is given.
    pub async fn from_path(path: impl AsRef<Path>, mime_type: Option<&str>) -> Result<Self> {
        let path = path.as_ref();

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ServiceError::ValidationFailed(format!("Not a file path: {}", path.display()))
            })?
            .to_string();

        let mime_type = match mime_type {
            Some(mime) => mime.to_string(),
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(mime_for_extension)
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ServiceError::ValidationFailed(format!("Cannot read {}: {}", path.display(), e))
        })?;

        Ok(Self::new(file_name, mime_type, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
    }
}

impl std::fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

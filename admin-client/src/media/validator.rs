use tracing::debug;

use crate::media::file::{MediaFile, MediaKind};

pub const NOT_SQUARE_REASON: &str = "Image is not square";
pub const UNSUPPORTED_REASON: &str = "Unsupported file type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub reason: Option<String>,
    pub dimensions: Option<(u32, u32)>,
}

impl Validation {
    fn accepted(dimensions: Option<(u32, u32)>) -> Self {
        Self {
            valid: true,
            reason: None,
            dimensions,
        }
    }

    fn rejected(reason: impl Into<String>, dimensions: Option<(u32, u32)>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            dimensions,
        }
    }
}

/// Decides whether a selected file may be uploaded to the matrix.
///
/// Images must be square. Videos pass without a dimension check; the matrix
/// rescales frames server-side.
#[derive(Debug, Clone, Default)]
pub struct MediaValidator;

impl MediaValidator {
    pub fn new() -> Self {
        Self
    }

    pub async fn validate(&self, file: &MediaFile) -> Validation {
        match file.kind() {
            MediaKind::Image => {
                let bytes = file.clone();
                let decoded = tokio::task::spawn_blocking(move || decode_dimensions(bytes.bytes())).await;

                let validation = match decoded {
                    Ok(Ok(dimensions)) => check_square(dimensions),
                    Ok(Err(reason)) => Validation::rejected(reason, None),
                    Err(e) => Validation::rejected(format!("Image decoding aborted: {}", e), None),
                };

                debug!(
                    file = file.file_name(),
                    valid = validation.valid,
                    dimensions = ?validation.dimensions,
                    "Validated image"
                );

                validation
            }
            MediaKind::Video => {
                debug!(file = file.file_name(), "Accepting video without dimension check");
                Validation::accepted(None)
            }
            MediaKind::Unsupported => {
                debug!(file = file.file_name(), mime = file.mime_type(), "Rejecting unsupported media");
                Validation::rejected(UNSUPPORTED_REASON, None)
            }
        }
    }
}

fn decode_dimensions(bytes: &[u8]) -> Result<(u32, u32), String> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| format!("Could not decode image: {}", e))?;
    Ok((image.width(), image.height()))
}

fn check_square((width, height): (u32, u32)) -> Validation {
    if width == height {
        Validation::accepted(Some((width, height)))
    } else {
        Validation::rejected(NOT_SQUARE_REASON, Some((width, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = ImageBuffer::from_pixel(width, height, Rgb([255u8, 0, 0]));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[tokio::test]
    async fn test_square_image_is_valid() {
        let file = MediaFile::new("square.png", "image/png", png(100, 100));
        let validation = MediaValidator::new().validate(&file).await;

        assert!(validation.valid);
        assert_eq!(validation.reason, None);
        assert_eq!(validation.dimensions, Some((100, 100)));
    }

    #[tokio::test]
    async fn test_wide_image_is_not_square() {
        let file = MediaFile::new("wide.png", "image/png", png(100, 50));
        let validation = MediaValidator::new().validate(&file).await;

        assert!(!validation.valid);
        assert_eq!(validation.reason.as_deref(), Some(NOT_SQUARE_REASON));
        assert_eq!(validation.dimensions, Some((100, 50)));
    }

    #[tokio::test]
    async fn test_validity_tracks_aspect_ratio() {
        let validator = MediaValidator::new();
        for (width, height) in [(1, 1), (1, 2), (7, 3), (64, 64), (128, 127)] {
            let file = MediaFile::new("probe.png", "image/png", png(width, height));
            let validation = validator.validate(&file).await;
            assert_eq!(validation.valid, width == height, "{}x{}", width, height);
        }
    }

    #[tokio::test]
    async fn test_undecodable_image_is_rejected_with_reason() {
        let file = MediaFile::new("broken.png", "image/png", b"definitely not a png".to_vec());
        let validation = MediaValidator::new().validate(&file).await;

        assert!(!validation.valid);
        assert!(validation.reason.unwrap().starts_with("Could not decode image"));
    }

    #[tokio::test]
    async fn test_truncated_image_is_rejected() {
        let mut bytes = png(32, 32);
        bytes.truncate(bytes.len() / 2);
        let file = MediaFile::new("cut.png", "image/png", bytes);

        assert!(!MediaValidator::new().validate(&file).await.valid);
    }

    #[tokio::test]
    async fn test_video_skips_dimension_check() {
        let file = MediaFile::new("clip.mp4", "video/mp4", b"\x00\x00\x00\x18ftypmp42".to_vec());
        let validation = MediaValidator::new().validate(&file).await;

        assert!(validation.valid);
        assert_eq!(validation.dimensions, None);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected() {
        let file = MediaFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let validation = MediaValidator::new().validate(&file).await;

        assert!(!validation.valid);
        assert_eq!(validation.reason.as_deref(), Some(UNSUPPORTED_REASON));
    }
}

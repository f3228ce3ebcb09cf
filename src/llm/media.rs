use std::fs;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, warn};

use crate::error::ConfigurationError;

pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data)
        .filter(|kind| kind.mime_type().starts_with("image/"))
        .map(|kind| kind.mime_type().to_string())
}

/// A base64-encoded image ready to be embedded in a vision request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub base64: String,
    pub mime_type: String,
}

impl ImagePayload {
    /// Wraps already-encoded data. The caller vouches for JPEG content.
    #[cfg(test)]
    pub fn from_base64(base64: impl Into<String>) -> Self {
        ImagePayload {
            base64: base64.into(),
            mime_type: DEFAULT_IMAGE_MIME.to_string(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mime_type = detect_mime_type(bytes).unwrap_or_else(|| {
            warn!("Could not detect image type; declaring it as {DEFAULT_IMAGE_MIME}");
            DEFAULT_IMAGE_MIME.to_string()
        });
        ImagePayload {
            base64: general_purpose::STANDARD.encode(bytes),
            mime_type,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| ConfigurationError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let payload = ImagePayload::from_bytes(&bytes);
        debug!(
            "Loaded image {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            payload.mime_type
        );
        Ok(payload)
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn png_bytes_are_declared_as_png() {
        let payload = ImagePayload::from_bytes(PNG_HEADER);
        assert_eq!(payload.mime_type, "image/png");
        assert!(payload.data_url().starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn unknown_bytes_fall_back_to_jpeg() {
        let payload = ImagePayload::from_bytes(b"not an image");
        assert_eq!(payload.mime_type, DEFAULT_IMAGE_MIME);
    }

    #[test]
    fn pre_encoded_data_is_declared_as_jpeg() {
        let payload = ImagePayload::from_base64("QUJD");
        assert_eq!(payload.data_url(), "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn missing_image_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImagePayload::load(dir.path().join("selfie.png")).unwrap_err();
        assert!(matches!(
            &err,
            ConfigurationError::Unreadable { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        ));
        assert!(err.to_string().contains("selfie.png"));
    }
}

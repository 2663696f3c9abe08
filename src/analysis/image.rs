//! Selected X-ray image held in memory

use base64::Engine;
use bytes::Bytes;
use std::path::Path;

use crate::types::{Result, XyraError};

/// An image chosen for analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl ImageFile {
    /// Build from raw parts; fails unless `mime` is `image/*`
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self> {
        let file = Self {
            name: name.into(),
            mime: mime.into().trim().to_ascii_lowercase(),
            bytes: bytes.into(),
        };
        file.validate()?;
        Ok(file)
    }

    /// Read a file, guessing the MIME type from its extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Self::new(name, guess_mime(path), bytes)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mime.starts_with("image/") {
            return Err(XyraError::Validation(
                "Please upload a valid image file (PNG, JPG, etc.)".to_string(),
            ));
        }
        Ok(())
    }

    /// Size in megabytes with two decimals, as printed in reports
    pub fn size_mb(&self) -> String {
        format!("{:.2}", self.bytes.len() as f64 / 1024.0 / 1024.0)
    }

    /// `data:` URL preview
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// MIME type from a file extension; unknown extensions are not images
pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "dcm" => "application/dicom",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_image() {
        let err = ImageFile::new("notes.txt", "text/plain", b"hi".to_vec()).unwrap_err();
        assert!(matches!(err, XyraError::Validation(_)));
        assert!(ImageFile::new("scan.png", "IMAGE/PNG", vec![1u8]).is_ok());
    }

    #[test]
    fn test_size_mb() {
        let file = ImageFile::new("a.png", "image/png", vec![0u8; 1_572_864]).unwrap();
        assert_eq!(file.size_mb(), "1.50");
    }

    #[test]
    fn test_data_url() {
        let file = ImageFile::new("a.png", "image/png", b"abc".to_vec()).unwrap();
        assert_eq!(file.data_url(), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("scan.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("scan")), "application/octet-stream");
    }
}

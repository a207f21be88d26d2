//! Uploaded documents and their declared type.
//!
//! The declared MIME type is taken at face value: it is derived from the file
//! extension (or given explicitly) and decides which decoder runs. Bytes are
//! never sniffed, so a PNG declared as `image/jpeg` fails to decode instead of
//! silently succeeding.

use crate::error::ClaimsError;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// The three document kinds the decoder handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    /// Classify a declared MIME type.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=binary`. Anything other than PDF, JPEG or PNG is
    /// [`ClaimsError::UnsupportedFormat`].
    pub fn from_mime(mime_type: &str) -> Result<Self, ClaimsError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Ok(DocumentKind::Pdf),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok(DocumentKind::Jpeg),
            "image/png" => Ok(DocumentKind::Png),
            _ => Err(ClaimsError::UnsupportedFormat {
                mime_type: mime_type.to_string(),
            }),
        }
    }

    /// Canonical MIME type.
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Png => "image/png",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Guess a MIME type from a file extension.
///
/// Unknown extensions map to `application/octet-stream`, which the decoder
/// then rejects as unsupported.
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" | "jpe" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// One file supplied by the user: bytes plus declared type.
///
/// Immutable once built; the shell owns it for the duration of one action.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk.
    ///
    /// The MIME type comes from `mime_override` if given, otherwise from the
    /// file extension. Reading never fails on type; unsupported types are
    /// reported by the decoder.
    pub async fn from_path(
        path: impl AsRef<Path>,
        mime_override: Option<&str>,
    ) -> Result<Self, ClaimsError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClaimsError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        let mime_type = mime_override
            .map(str::to_string)
            .unwrap_or_else(|| mime_from_extension(path).to_string());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("Read {} ({} bytes, {})", name, bytes.len(), mime_type);
        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Size in kilobytes (1024 bytes).
    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }

    /// `name (12.3 KB, image/png)`.
    pub fn summary(&self) -> String {
        format!("{} ({:.1} KB, {})", self.name, self.size_kb(), self.mime_type)
    }
}

impl fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_matching_is_lenient() {
        assert_eq!(
            DocumentKind::from_mime("application/pdf").unwrap(),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_mime("IMAGE/PNG").unwrap(),
            DocumentKind::Png
        );
        assert_eq!(
            DocumentKind::from_mime("image/jpg").unwrap(),
            DocumentKind::Jpeg
        );
        assert_eq!(
            DocumentKind::from_mime("application/pdf; charset=binary").unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn unsupported_mime_is_rejected() {
        for mime in ["application/zip", "image/gif", "text/plain", ""] {
            let err = DocumentKind::from_mime(mime).unwrap_err();
            assert!(
                matches!(err, ClaimsError::UnsupportedFormat { ref mime_type } if mime_type == mime),
                "{mime}"
            );
        }
    }

    #[test]
    fn extension_table() {
        assert_eq!(mime_from_extension(Path::new("a/claim.PDF")), "application/pdf");
        assert_eq!(mime_from_extension(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(mime_from_extension(Path::new("scan.png")), "image/png");
        assert_eq!(mime_from_extension(Path::new("bundle.zip")), "application/zip");
        assert_eq!(
            mime_from_extension(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn summary_shows_size_in_kb() {
        let doc = UploadedDocument::new("claim.png", "image/png", vec![0u8; 2048 + 102]);
        assert_eq!(doc.summary(), "claim.png (2.1 KB, image/png)");
    }

    #[tokio::test]
    async fn from_path_uses_extension_or_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claim.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let doc = UploadedDocument::from_path(&path, None).await.unwrap();
        assert_eq!(doc.name(), "claim.pdf");
        assert_eq!(doc.mime_type(), "application/pdf");
        assert_eq!(doc.size(), 8);

        let doc = UploadedDocument::from_path(&path, Some("image/png"))
            .await
            .unwrap();
        assert_eq!(doc.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = UploadedDocument::from_path("/no/such/claim.pdf", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimsError::FileRead { .. }));
    }
}

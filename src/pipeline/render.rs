//! Document decoding: declared type + bytes → ordered page images.
//!
//! PDFs are rasterised page by page through pdfium; JPEG and PNG are decoded
//! with the declared format. Both paths run inside `spawn_blocking`: pdfium
//! keeps thread-local state and image decoding is CPU-bound, so neither may
//! stall the Tokio worker threads.
//!
//! `max_rendered_pixels` caps the longest edge regardless of physical page
//! size, keeping memory bounded for oversized scans.

use crate::config::ExtractionConfig;
use crate::error::ClaimsError;
use crate::pipeline::document::DocumentKind;
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One decoded page, 1-based.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page_num: usize,
    pub image: DynamicImage,
}

/// Decode a document into its ordered page images.
///
/// The MIME type is checked before any decoding work starts. The result is
/// never empty: a zero-page PDF is a [`ClaimsError::Decode`] error.
pub async fn decode(
    bytes: &[u8],
    mime_type: &str,
    config: &ExtractionConfig,
) -> Result<Vec<PageImage>, ClaimsError> {
    let kind = DocumentKind::from_mime(mime_type)?;
    let bytes = bytes.to_vec();

    let pages = match kind {
        DocumentKind::Pdf => {
            let dpi = config.dpi;
            let max_pixels = config.max_rendered_pixels;
            let password = config.password.clone();
            let lib_path = config.pdfium_lib_path.clone();
            tokio::task::spawn_blocking(move || {
                render_pdf_blocking(
                    &bytes,
                    dpi,
                    max_pixels,
                    password.as_deref(),
                    lib_path.as_deref(),
                )
            })
            .await
            .map_err(|e| ClaimsError::Internal(format!("Render task panicked: {}", e)))??
        }
        DocumentKind::Jpeg | DocumentKind::Png => {
            let image = tokio::task::spawn_blocking(move || decode_image_blocking(&bytes, kind))
                .await
                .map_err(|e| ClaimsError::Internal(format!("Decode task panicked: {}", e)))??;
            vec![PageImage {
                page_num: 1,
                image,
            }]
        }
    };

    info!("Decoded {} page(s) from {}", pages.len(), kind);
    Ok(pages)
}

fn decode_image_blocking(bytes: &[u8], kind: DocumentKind) -> Result<DynamicImage, ClaimsError> {
    let format = match kind {
        DocumentKind::Png => ImageFormat::Png,
        _ => ImageFormat::Jpeg,
    };
    let image = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        ClaimsError::Decode {
            file: None,
            mime_type: kind.mime_type().to_string(),
            detail: e.to_string(),
        }
    })?;
    debug!("Decoded image → {}x{} px", image.width(), image.height());
    Ok(image)
}

/// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the working
/// directory, then the system library search path.
///
/// A path may name the library file itself or the directory containing it.
pub fn bind_pdfium(explicit: Option<&Path>) -> Result<Pdfium, ClaimsError> {
    let configured = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

    let bindings = match configured {
        Some(path) => {
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ClaimsError::PdfEngineUnavailable(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn pdf_decode_error(detail: impl Into<String>) -> ClaimsError {
    ClaimsError::Decode {
        file: None,
        mime_type: DocumentKind::Pdf.mime_type().to_string(),
        detail: detail.into(),
    }
}

/// Blocking implementation of PDF rasterisation.
fn render_pdf_blocking(
    bytes: &[u8],
    dpi: u32,
    max_pixels: u32,
    password: Option<&str>,
    lib_path: Option<&Path>,
) -> Result<Vec<PageImage>, ClaimsError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, password)
        .map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.to_ascii_lowercase().contains("password") {
                if password.is_some() {
                    pdf_decode_error("incorrect password")
                } else {
                    pdf_decode_error("document is password-protected")
                }
            } else {
                pdf_decode_error(err_str)
            }
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(pdf_decode_error("document has no pages"));
    }
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(total_pages);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| pdf_decode_error(format!("page {}: {:?}", idx + 1, e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        results.push(PageImage {
            page_num: idx + 1,
            image,
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 10, 10])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    #[tokio::test]
    async fn png_decodes_to_single_page() {
        let pages = decode(&encoded(ImageFormat::Png), "image/png", &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_num, 1);
        assert_eq!(pages[0].image.width(), 8);
        assert_eq!(pages[0].image.height(), 6);
    }

    #[tokio::test]
    async fn jpeg_decodes_with_alias() {
        let pages = decode(&encoded(ImageFormat::Jpeg), "image/jpg", &ExtractionConfig::default())
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn declared_type_is_not_sniffed() {
        let err = decode(&encoded(ImageFormat::Png), "image/jpeg", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimsError::Decode { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn garbage_image_is_decode_error() {
        let err = decode(b"definitely not a png", "image/png", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimsError::Decode { .. }));
    }

    #[tokio::test]
    async fn unsupported_type_fails_first() {
        let err = decode(b"PK\x03\x04", "application/zip", &ExtractionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClaimsError::UnsupportedFormat { .. }));
    }
}

//! Image encoding: `DynamicImage` → base64 PNG for the request body.
//!
//! PNG is lossless; JPEG artefacts on small print and hand-written entries
//! confuse vision models more than the extra bytes cost.

use crate::error::ClaimsError;
use crate::pipeline::render::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// A base64-encoded image ready to be embedded in a model request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded).
    pub data: String,
}

/// Encode one decoded page as a base64 PNG.
pub fn encode_page(page: &PageImage) -> Result<InlineImage, ClaimsError> {
    let mut buf = Vec::new();
    page.image
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| {
            ClaimsError::Internal(format!("PNG encoding of page {} failed: {}", page.page_num, e))
        })?;

    let data = STANDARD.encode(&buf);
    debug!("Encoded page {} → {} bytes base64", page.page_num, data.len());

    Ok(InlineImage {
        mime_type: "image/png".to_string(),
        data,
    })
}

/// Encode every page, keeping order.
pub fn encode_pages(pages: &[PageImage]) -> Result<Vec<InlineImage>, ClaimsError> {
    pages.iter().map(encode_page).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn page(n: usize, shade: u8) -> PageImage {
        PageImage {
            page_num: n,
            image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([shade, 0, 0, 255]))),
        }
    }

    #[test]
    fn encode_small_image() {
        let data = encode_page(&page(1, 255)).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&decoded[..4], b"\x89PNG");
    }

    #[test]
    fn encode_pages_keeps_order() {
        let images = encode_pages(&[page(1, 10), page(2, 200)]).unwrap();
        assert_eq!(images.len(), 2);
        assert_ne!(images[0], images[1]);
        assert_eq!(images[0], encode_page(&page(1, 10)).unwrap());
    }
}

//! Image encoding: `DynamicImage` → capped-width RGB JPEG → base64.
//!
//! Both backends accept images as base64 strings embedded in the JSON
//! request body (LM Studio inside a `data:` URI, Ollama as a bare string).
//! JPEG is used because X-rays are continuous-tone greyscale photographs —
//! unlike rendered text, they lose nothing that matters at JPEG quality
//! levels, and the payload shrinks several-fold compared to PNG.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage};
use std::io::Cursor;
use tracing::debug;

/// A base64 JPEG ready for the inference request body.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64 of the JPEG bytes (standard alphabet, padded).
    pub base64: String,
    /// Always `"image/jpeg"`; kept explicit for the data-URI builder.
    pub mime_type: &'static str,
    /// Width after the resize cap was applied.
    pub width: u32,
    /// Height after the resize cap was applied.
    pub height: u32,
}

impl EncodedImage {
    /// Render as a `data:` URI for OpenAI-style `image_url` parts.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Encode an image for submission: RGB-convert, cap the width, JPEG, base64.
///
/// Images wider than `max_width` are downscaled preserving aspect ratio;
/// narrower images pass through at their native size. The RGB conversion is
/// unconditional — JPEG has no alpha channel, and greyscale X-rays arrive
/// in every channel layout imaginable.
pub fn encode_image(
    img: &DynamicImage,
    max_width: u32,
) -> Result<EncodedImage, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let resized = if rgb.width() > max_width {
        let (w, h) = (rgb.width(), rgb.height());
        let new_h = ((h as u64 * max_width as u64) / w as u64).max(1) as u32;
        debug!("Resizing {}x{} → {}x{}", w, h, max_width, new_h);
        rgb.resize_exact(max_width, new_h, FilterType::Lanczos3)
    } else {
        rgb
    };

    let mut buf = Vec::new();
    resized.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(EncodedImage {
        base64: b64,
        mime_type: "image/jpeg",
        width: resized.width(),
        height: resized.height(),
    })
}

//! Lossy JPEG encoding of rendered page images.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};

use super::ColorModel;

/// A page image encoded for embedding.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub color: ColorModel,
}

/// Encode `image` as JPEG at the given quality (1-100).
///
/// Grayscale sources stay single-channel; everything else is flattened to
/// 8-bit RGB first (JPEG has no alpha).
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<EncodedImage, String> {
    let (normalized, color) = match image.color() {
        ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => (
            DynamicImage::ImageLuma8(image.to_luma8()),
            ColorModel::Gray,
        ),
        _ => (DynamicImage::ImageRgb8(image.to_rgb8()), ColorModel::Rgb),
    };

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    normalized
        .write_with_encoder(encoder)
        .map_err(|e| e.to_string())?;

    Ok(EncodedImage {
        width: normalized.width(),
        height: normalized.height(),
        data: buffer.into_inner(),
        color,
    })
}

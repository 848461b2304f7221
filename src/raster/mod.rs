//! Page rasterization via Poppler and JPEG re-encoding.

pub mod codec;
pub mod poppler;

pub use codec::{encode_jpeg, EncodedImage};

use std::path::Path;

use crate::error::RasterError;
use crate::temp;

/// Payload format of an embedded page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// JPEG bytes, embedded with a `/DCTDecode` filter.
    Jpeg,
}

/// Color model of an embedded page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    /// Single 8-bit channel, `/DeviceGray`.
    Gray,
    /// Three 8-bit channels, `/DeviceRGB`.
    Rgb,
}

/// One rasterized page, ready for embedding. Immutable once produced.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Zero-based page position; output page order follows this exactly.
    pub index: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Compressed image payload.
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    pub color: ColorModel,
}

/// Renders PDF pages to compressed page images through `pdftoppm`.
pub struct RasterSource {
    dpi: u32,
    jpeg_quality: u8,
}

impl RasterSource {
    pub fn new(dpi: u32, jpeg_quality: u8) -> Self {
        Self { dpi, jpeg_quality }
    }

    /// Rasterize every page of `input` in order.
    ///
    /// Pages are rendered as PNG into a scoped temp directory, then decoded
    /// and re-encoded as JPEG at the configured quality. The temp directory
    /// is released on every exit path.
    pub fn render(&self, input: &Path) -> Result<Vec<PageImage>, RasterError> {
        let work_dir = tempfile::Builder::new()
            .prefix("pdf-flatten-raster-")
            .tempdir()?;

        let result = self.render_into(input, work_dir.path());
        temp::release_dir(work_dir);
        result
    }

    fn render_into(&self, input: &Path, work_dir: &Path) -> Result<Vec<PageImage>, RasterError> {
        let page_files = poppler::render_pages(input, self.dpi, work_dir)?;
        if page_files.is_empty() {
            return Err(RasterError::NoPages(input.to_path_buf()));
        }
        log::info!("Rendered {} pages at {} dpi", page_files.len(), self.dpi);

        let mut images = Vec::with_capacity(page_files.len());
        for (index, path) in page_files.iter().enumerate() {
            let decoded = image::open(path).map_err(|e| RasterError::PageDecode {
                page: index + 1,
                message: e.to_string(),
            })?;

            let encoded = encode_jpeg(&decoded, self.jpeg_quality).map_err(|message| {
                RasterError::PageEncode {
                    page: index + 1,
                    message,
                }
            })?;

            log::debug!(
                "Page {}: {}x{} px, {} bytes as JPEG",
                index + 1,
                encoded.width,
                encoded.height,
                encoded.data.len()
            );

            images.push(PageImage {
                index,
                width: encoded.width,
                height: encoded.height,
                data: encoded.data,
                encoding: ImageEncoding::Jpeg,
                color: encoded.color,
            });
        }

        Ok(images)
    }
}

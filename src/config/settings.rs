use crate::cli::Args;
use crate::document::builder::DEFAULT_MAX_PAGES;
use crate::document::GcLevel;

/// Rendering resolution bounds. Below 72 dpi text becomes unreadable;
/// above 600 file size balloons with no flattening benefit.
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;
pub const DEFAULT_DPI: u32 = 200;

pub const DEFAULT_JPEG_QUALITY: u8 = 50;

/// Options for one flatten run.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Rasterization resolution, dots per inch.
    pub dpi: u32,
    /// JPEG quality (1-100) for the embedded page images.
    pub jpeg_quality: u8,
    /// Resource guard on the number of pages assembled.
    pub max_pages: usize,
    /// Compaction aggressiveness.
    pub gc: GcLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dpi: DEFAULT_DPI,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_pages: DEFAULT_MAX_PAGES,
            gc: GcLevel::Full,
        }
    }
}

impl Settings {
    /// Build settings from parsed CLI arguments. Ranges are already
    /// enforced by the argument parser.
    pub fn from_args(args: &Args) -> Self {
        Settings {
            dpi: args.dpi,
            jpeg_quality: args.quality,
            ..Settings::default()
        }
    }
}

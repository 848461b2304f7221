pub mod cli;
pub mod config;
pub mod dates;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod raster;
pub mod temp;

pub use cli::Args;
pub use config::Settings;
pub use dates::TimestampPair;
pub use document::{Compactor, DocumentBuilder, GcLevel};
pub use error::{BuildError, CompactError, DateError, FlattenError, MetadataError, RasterError};
pub use pipeline::{FlattenSummary, Flattener};
pub use raster::{PageImage, RasterSource};

use std::path::Path;

/// High-level API: flatten `input` into `output`.
///
/// Rasterizes every page through Poppler, reassembles the images into a
/// fresh image-only document, compacts it, and rewrites the document and
/// filesystem timestamps. Optional `YYYY-MM-DD` dates override the calendar
/// day of the recorded creation/modification instants; time-of-day always
/// comes from the original document.
///
/// # Example
///
/// ```no_run
/// use pdf_flatten::{flatten_file, Settings};
/// use std::path::Path;
///
/// let summary = flatten_file(
///     Path::new("scan.pdf"),
///     Path::new("flat-scan.pdf"),
///     Settings::default(),
///     Some("2021-06-15"),
///     None,
/// ).unwrap();
/// println!("{} pages flattened", summary.pages);
/// ```
pub fn flatten_file(
    input: &Path,
    output: &Path,
    settings: Settings,
    creation_date: Option<&str>,
    modification_date: Option<&str>,
) -> Result<FlattenSummary, FlattenError> {
    Flattener::new(settings).flatten(input, output, creation_date, modification_date)
}

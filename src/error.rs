use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Poppler not found: install poppler-utils or set POPPLER_PATH to its bin directory")]
    PopplerNotFound,

    #[error("pdftoppm failed: {0}")]
    CommandFailed(String),

    #[error("Rendering produced no pages for {}", .0.display())]
    NoPages(PathBuf),

    #[error("Failed to decode rendered page {page}: {message}")]
    PageDecode { page: usize, message: String },

    #[error("Failed to encode page {page} as JPEG: {message}")]
    PageEncode { page: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No page images to assemble")]
    NoPages,

    #[error("Page {page} has an empty image payload")]
    EmptyImage { page: usize },

    #[error("Page {page} has zero width or height")]
    ZeroDimension { page: usize },

    #[error("Page count {count} exceeds the maximum of {max}")]
    TooManyPages { count: usize, max: usize },
}

#[derive(Error, Debug)]
pub enum CompactError {
    #[error("Document trailer has no Root entry")]
    MissingRoot,

    #[error("Document root is not a catalog dictionary")]
    InvalidRoot,

    #[error("Malformed object graph: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to load PDF for metadata rewrite: {0}")]
    Load(String),

    #[error("PDF has no cross-reference anchor (startxref not found)")]
    MissingStartXref,

    #[error("Document is encrypted; its security handler would scramble rewritten date strings")]
    Encrypted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum DateError {
    #[error("Invalid date '{0}': use YYYY-MM-DD")]
    InvalidDate(String),
}

/// Pipeline-level error: everything that aborts a flatten run.
///
/// Filesystem-timestamp and temp-cleanup failures are deliberately absent;
/// those are non-fatal and only logged.
#[derive(Error, Debug)]
pub enum FlattenError {
    #[error("Input PDF file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Rasterization failed: {0}")]
    Render(#[from] RasterError),

    #[error("Document assembly failed: {0}")]
    Build(#[from] BuildError),

    #[error("Compaction failed: {0}")]
    Compact(#[from] CompactError),

    #[error(transparent)]
    InvalidDate(#[from] DateError),

    #[error("Metadata rewrite failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Failed to save assembled document: {0}")]
    Save(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

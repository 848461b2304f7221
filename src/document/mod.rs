//! The PDF object-graph core: assembly, compaction, and metadata rewriting.

pub mod builder;
pub mod compactor;
pub mod metadata;

pub use builder::DocumentBuilder;
pub use compactor::{Compactor, GcLevel};
pub use metadata::rewrite_dates;

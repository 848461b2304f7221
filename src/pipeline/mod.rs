//! The flatten pipeline: rasterize, assemble, compact, redate, finalize.

pub mod fs_times;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use lopdf::{Document, Object};

use crate::config::Settings;
use crate::dates::{self, parse_pdf_date, parse_user_date, TimestampPair};
use crate::document::{Compactor, DocumentBuilder};
use crate::document::metadata::rewrite_dates;
use crate::error::FlattenError;
use crate::raster::RasterSource;
use crate::temp;

/// Pipeline stage, in order. Every run either reaches `Finalized` or stops
/// at the first failing transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Start,
    Rasterized,
    Assembled,
    Compacted,
    MetadataSet,
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Rasterized => "rasterized",
            Stage::Assembled => "assembled",
            Stage::Compacted => "compacted",
            Stage::MetadataSet => "metadata-set",
            Stage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct FlattenSummary {
    pub pages: usize,
    pub output: PathBuf,
    pub timestamps: TimestampPair,
}

/// Sequences the components over scoped temporary storage.
pub struct Flattener {
    settings: Settings,
}

impl Flattener {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Flatten `input` into `output`, optionally redating with
    /// `YYYY-MM-DD` calendar dates.
    ///
    /// The finished document is staged next to `output` and moved into
    /// place only after the metadata revision is written, so a failure at
    /// any stage leaves no partial output behind.
    pub fn flatten(
        &self,
        input: &Path,
        output: &Path,
        creation_date: Option<&str>,
        modification_date: Option<&str>,
    ) -> Result<FlattenSummary, FlattenError> {
        // Reject bad dates before any work or filesystem writes happen.
        let user_creation = creation_date.map(parse_user_date).transpose()?;
        let user_modification = modification_date.map(parse_user_date).transpose()?;

        if !input.is_file() {
            return Err(FlattenError::InputNotFound(input.to_path_buf()));
        }
        log::debug!("stage {}: {}", Stage::Start, input.display());

        let (original_creation, original_modification) = original_timestamps(input);

        let source = RasterSource::new(self.settings.dpi, self.settings.jpeg_quality);
        let images = source.render(input)?;
        log::debug!("stage {}: {} pages", Stage::Rasterized, images.len());

        let pages = images.len();
        let doc = DocumentBuilder::new(self.settings.max_pages).build(&images)?;
        drop(images);
        log::debug!("stage {}", Stage::Assembled);

        let mut doc = Compactor::new(self.settings.gc).compact(doc)?;
        log::debug!("stage {}", Stage::Compacted);

        let timestamps = dates::resolve(
            user_creation,
            user_modification,
            original_creation,
            original_modification,
        );

        finalize_document(&mut doc, output, &timestamps)?;
        log::debug!("stage {}", Stage::MetadataSet);

        fs_times::apply(output, &timestamps);
        log::debug!("stage {}: {}", Stage::Finalized, output.display());

        Ok(FlattenSummary {
            pages,
            output: output.to_path_buf(),
            timestamps,
        })
    }
}

/// Stage the document next to `output`, append the metadata revision to
/// the staged copy, and move it into place. Every error exit releases the
/// staging file first, so a failed run leaves nothing on disk.
fn finalize_document(
    doc: &mut Document,
    output: &Path,
    timestamps: &TimestampPair,
) -> Result<(), FlattenError> {
    let staging_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".flatten-")
        .suffix(".pdf")
        .tempfile_in(staging_dir)?;

    let written = doc
        .save_to(&mut staged)
        .map_err(|e| FlattenError::Save(e.to_string()))
        .and_then(|_| {
            rewrite_dates(
                staged.path(),
                Some(timestamps.creation),
                Some(timestamps.modification),
            )
            .map_err(FlattenError::from)
        });
    if let Err(err) = written {
        temp::release_file(staged);
        return Err(err);
    }

    persist(staged, output)
}

/// Move the staged file into place, atomically where the filesystem
/// allows. A cross-device rename falls back to copy-then-release; a failed
/// copy still releases the staging file.
fn persist(staged: tempfile::NamedTempFile, output: &Path) -> Result<(), FlattenError> {
    match staged.persist(output) {
        Ok(_) => Ok(()),
        Err(err) => {
            log::debug!(
                "Rename into {} failed ({}), copying instead",
                output.display(),
                err.error
            );
            let staged = err.file;
            let copied = fs::copy(staged.path(), output);
            temp::release_file(staged);
            copied?;
            Ok(())
        }
    }
}

/// The input document's recorded creation/modification instants.
///
/// `/Info` dates win; a missing or unreadable field falls back to the
/// filesystem's created/modified time, and ultimately to now.
fn original_timestamps(input: &Path) -> (NaiveDateTime, NaiveDateTime) {
    let (info_creation, info_modification) = match Document::load(input) {
        Ok(doc) => (
            info_date(&doc, b"CreationDate"),
            info_date(&doc, b"ModDate"),
        ),
        Err(err) => {
            log::debug!("Could not read metadata from input: {}", err);
            (None, None)
        }
    };

    let creation = info_creation.unwrap_or_else(|| fs_instant(input, true));
    let modification = info_modification.unwrap_or_else(|| fs_instant(input, false));
    (creation, modification)
}

fn info_date(doc: &Document, key: &[u8]) -> Option<NaiveDateTime> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_dictionary(info_id).ok()?;
    match info.get(key).ok()? {
        Object::String(bytes, _) => parse_pdf_date(&String::from_utf8_lossy(bytes)),
        _ => None,
    }
}

fn fs_instant(path: &Path, creation: bool) -> NaiveDateTime {
    let time = fs::metadata(path)
        .and_then(|meta| {
            if creation {
                // Not every platform/filesystem records a birth time.
                meta.created().or_else(|_| meta.modified())
            } else {
                meta.modified()
            }
        })
        .unwrap_or_else(|_| SystemTime::now());
    DateTime::<Local>::from(time).naive_local()
}

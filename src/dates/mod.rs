//! Date arithmetic for document and filesystem timestamps.
//!
//! User input supplies calendar dates only; the time-of-day component always
//! comes from the original document so a redated file keeps plausible clock
//! times. The single hard invariant lives here: a resolved modification
//! instant never precedes the resolved creation instant.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::DateError;

/// Resolved (creation, modification) instants with modification >= creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampPair {
    pub creation: NaiveDateTime,
    pub modification: NaiveDateTime,
}

/// Parse a user-supplied `YYYY-MM-DD` calendar date.
pub fn parse_user_date(s: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DateError::InvalidDate(s.to_string()))
}

/// Parse a PDF date string (`D:YYYYMMDDHHMMSS` plus optional timezone
/// suffix) into a naive instant.
///
/// Only the fixed-position core at characters 2..16 is read; timezone
/// suffixes in any of their forms (`Z`, `+HH'MM'`, `-HH'MM'`) are ignored,
/// as are truncated strings shorter than the full core.
pub fn parse_pdf_date(s: &str) -> Option<NaiveDateTime> {
    let core = s.get(2..16)?;
    if !s.starts_with("D:") {
        return None;
    }
    NaiveDateTime::parse_from_str(core, "%Y%m%d%H%M%S").ok()
}

/// Format an instant in the PDF date grammar with an explicit UTC offset.
pub fn format_pdf_date(dt: NaiveDateTime) -> String {
    dt.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

/// Combine optional user calendar dates with the original document instants.
///
/// A supplied user date replaces the calendar day but keeps the original
/// instant's time-of-day; an absent user date leaves the original instant
/// untouched. If the result would place modification before creation, the
/// modification is clamped up to the creation instant.
pub fn resolve(
    user_creation: Option<NaiveDate>,
    user_modification: Option<NaiveDate>,
    original_creation: NaiveDateTime,
    original_modification: NaiveDateTime,
) -> TimestampPair {
    let creation = match user_creation {
        Some(date) => date.and_time(original_creation.time()),
        None => original_creation,
    };
    let mut modification = match user_modification {
        Some(date) => date.and_time(original_modification.time()),
        None => original_modification,
    };

    if modification < creation {
        modification = creation;
    }

    TimestampPair {
        creation,
        modification,
    }
}

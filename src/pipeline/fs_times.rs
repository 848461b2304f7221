//! Applying resolved timestamps to the output file itself.
//!
//! Access/modification times are portable; a true creation time is only
//! settable where the OS exposes it (macOS, via `touch -t`). Every failure
//! here is non-fatal: the flattened document is already in place, so we
//! warn and move on.

use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone};
use filetime::FileTime;

use crate::dates::TimestampPair;

/// Best-effort application of the resolved timestamps to `path`.
pub fn apply(path: &Path, times: &TimestampPair) {
    let mtime = to_file_time(times.modification);
    if let Err(err) = filetime::set_file_times(path, mtime, mtime) {
        log::warn!(
            "Failed to set file times on {}: {}",
            path.display(),
            err
        );
        return;
    }

    #[cfg(target_os = "macos")]
    set_creation_time(path, times, mtime);
}

/// Interpret the naive instant in local time, matching how the original
/// document's clock times were read.
fn to_file_time(instant: NaiveDateTime) -> FileTime {
    let unix = Local
        .from_local_datetime(&instant)
        .earliest()
        .map(|local| local.timestamp())
        .unwrap_or_else(|| instant.and_utc().timestamp());
    FileTime::from_unix_time(unix, 0)
}

/// macOS records a birth time that `touch -t` can move backwards. `touch`
/// also rewrites mtime, so it is re-applied afterwards.
#[cfg(target_os = "macos")]
fn set_creation_time(path: &Path, times: &TimestampPair, mtime: FileTime) {
    use std::process::Command;

    let stamp = times.creation.format("%Y%m%d%H%M.%S").to_string();
    match Command::new("touch").arg("-t").arg(&stamp).arg(path).status() {
        Ok(status) if status.success() => {
            if let Err(err) = filetime::set_file_times(path, mtime, mtime) {
                log::warn!(
                    "Failed to restore modification time on {}: {}",
                    path.display(),
                    err
                );
            }
        }
        Ok(status) => log::warn!(
            "touch -t {} exited with {} for {}",
            stamp,
            status,
            path.display()
        ),
        Err(err) => log::warn!(
            "Failed to run touch for creation time on {}: {}",
            path.display(),
            err
        ),
    }
}

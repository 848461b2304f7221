//! Scoped temporary resources with logged, retried release.
//!
//! Cleanup failure is never fatal. On platforms that keep handles open
//! (Windows antivirus scans, straggling child processes) the first delete
//! can fail transiently, so release is retried once after a short pause
//! before giving up with a warning.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tempfile::{NamedTempFile, TempDir};

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Delete a temporary directory, retrying once on failure.
pub fn release_dir(dir: TempDir) {
    let path = dir.path().to_path_buf();
    if let Err(err) = dir.close() {
        log::warn!("Failed to remove temp dir {}: {}", path.display(), err);
        retry_remove(&path, true);
    }
}

/// Delete a temporary file, retrying once on failure.
pub fn release_file(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(err) = file.close() {
        log::warn!("Failed to remove temp file {}: {}", path.display(), err);
        retry_remove(&path, false);
    }
}

fn retry_remove(path: &Path, is_dir: bool) {
    thread::sleep(RETRY_DELAY);
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => log::debug!("Removed {} on retry", path.display()),
        Err(err) if !path.exists() => {
            log::debug!("{} already gone after failed close: {}", path.display(), err)
        }
        Err(err) => log::warn!(
            "Leaving temp artifact {} behind after retry: {}",
            path.display(),
            err
        ),
    }
}

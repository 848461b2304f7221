//! Locating and invoking Poppler's `pdftoppm`.
//!
//! Lookup order: the `POPPLER_PATH` environment variable (a directory
//! containing the binary), then `PATH`, then a handful of conventional
//! Windows install locations.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::RasterError;

pub const POPPLER_PATH_VAR: &str = "POPPLER_PATH";

#[cfg(windows)]
const BINARY: &str = "pdftoppm.exe";
#[cfg(not(windows))]
const BINARY: &str = "pdftoppm";

#[cfg(windows)]
const WINDOWS_INSTALL_DIRS: &[&str] = &[
    r"C:\poppler\Library\bin",
    r"C:\poppler\bin",
    r"C:\Program Files\poppler\bin",
];

/// Find the `pdftoppm` binary.
pub fn find_pdftoppm() -> Result<PathBuf, RasterError> {
    if let Some(dir) = env::var_os(POPPLER_PATH_VAR) {
        let candidate = Path::new(&dir).join(BINARY);
        log::debug!("Checking {}: {}", POPPLER_PATH_VAR, candidate.display());
        if candidate.is_file() {
            return Ok(candidate);
        }
        log::warn!(
            "{} is set but {} was not found there",
            POPPLER_PATH_VAR,
            candidate.display()
        );
    }

    if let Some(found) = search_path(BINARY) {
        log::debug!("Found {} on PATH: {}", BINARY, found.display());
        return Ok(found);
    }

    #[cfg(windows)]
    for dir in WINDOWS_INSTALL_DIRS {
        let candidate = Path::new(dir).join(BINARY);
        if candidate.is_file() {
            log::debug!("Found Poppler install: {}", candidate.display());
            return Ok(candidate);
        }
    }

    Err(RasterError::PopplerNotFound)
}

fn search_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

/// Render every page of `input` as `page-N.png` files under `out_dir`,
/// returned in page order.
pub fn render_pages(input: &Path, dpi: u32, out_dir: &Path) -> Result<Vec<PathBuf>, RasterError> {
    let pdftoppm = find_pdftoppm()?;
    let prefix = out_dir.join("page");

    let output = Command::new(&pdftoppm)
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-png")
        .arg(input)
        .arg(&prefix)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RasterError::CommandFailed(format!(
            "{} exited with {}: {}",
            pdftoppm.display(),
            output.status,
            stderr.trim()
        )));
    }

    collect_pages(out_dir)
}

/// Gather the rendered `page-N.png` files and sort them by page number.
///
/// `pdftoppm` zero-pads page numbers to a uniform width per run, but the
/// numeric sort keeps ordering correct regardless.
fn collect_pages(out_dir: &Path) -> Result<Vec<PathBuf>, RasterError> {
    let mut pages: Vec<(u32, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(out_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        if let Some(number) = page_number(&path) {
            pages.push((number, path));
        }
    }

    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.rsplit('-').next()?;
    digits.parse().ok()
}

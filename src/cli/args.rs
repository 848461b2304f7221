use clap::Parser;
use std::path::PathBuf;

use crate::config::settings::{DEFAULT_DPI, DEFAULT_JPEG_QUALITY, MAX_DPI, MIN_DPI};

#[derive(Parser, Debug)]
#[command(name = "flatten")]
#[command(
    author,
    version,
    about = "Flatten a PDF to page images, then rebuild, compress, and redate it"
)]
pub struct Args {
    /// Input PDF file path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output PDF file path (defaults to flat-<input-basename>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rasterization resolution in dots per inch
    #[arg(
        short = 'd',
        long,
        default_value_t = DEFAULT_DPI,
        value_parser = clap::value_parser!(u32).range(MIN_DPI as i64..=MAX_DPI as i64)
    )]
    pub dpi: u32,

    /// JPEG quality for the embedded page images (1-100)
    #[arg(
        short = 'q',
        long,
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub quality: u8,

    /// Creation date in YYYY-MM-DD format
    #[arg(short = 'c', long)]
    pub creation_date: Option<String>,

    /// Modification date in YYYY-MM-DD format
    #[arg(short = 'm', long)]
    pub modification_date: Option<String>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Get the output path, defaulting to `flat-<input-basename>` in the
    /// current directory.
    pub fn output_path(&self) -> PathBuf {
        if let Some(ref output) = self.output {
            return output.clone();
        }
        let basename = self
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output.pdf".to_string());
        PathBuf::from(format!("flat-{}", basename))
    }
}

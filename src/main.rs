use anyhow::{Context, Result};
use clap::Parser;

use pdf_flatten::cli::Args;
use pdf_flatten::config::Settings;
use pdf_flatten::pipeline::Flattener;

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let settings = Settings::from_args(&args);
    let output_path = args.output_path();

    let summary = Flattener::new(settings)
        .flatten(
            &args.input,
            &output_path,
            args.creation_date.as_deref(),
            args.modification_date.as_deref(),
        )
        .with_context(|| format!("Failed to flatten {}", args.input.display()))?;

    log::info!(
        "Flattened {} pages, dated {} / {}",
        summary.pages,
        summary.timestamps.creation,
        summary.timestamps.modification
    );
    println!("File {} saved successfully.", summary.output.display());

    Ok(())
}

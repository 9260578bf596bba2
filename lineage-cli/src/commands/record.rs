use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use lineage_core::clock::SystemClock;
use lineage_core::learnings::Learnings;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Path to the codebase (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Learnings JSON produced by the analysis run
    #[arg(long, short)]
    pub file: PathBuf,
}

pub fn run(args: &RecordArgs) -> anyhow::Result<()> {
    let pipeline = super::open_pipeline(&args.path)?;

    if !args.file.is_file() {
        anyhow::bail!("Learnings file not found: {}", args.file.display());
    }
    let learnings = Learnings::load(&args.file)
        .with_context(|| format!("Cannot read learnings: {}", args.file.display()))?;

    let generation = pipeline
        .record(&SystemClock, learnings)
        .context("Cannot record learnings")?;

    println!(
        "Recorded generation {generation} for {}",
        pipeline.root().display()
    );
    Ok(())
}

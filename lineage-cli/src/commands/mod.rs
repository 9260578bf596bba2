pub mod check;
pub mod init;
pub mod record;
pub mod regenerate;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;

use lineage_core::config::LineageConfig;
use lineage_core::pipeline::{CONFIG_FILE, GenerationPipeline, STATE_DIR};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize Lineage for a codebase and record the baseline scan
    Init(init::InitArgs),
    /// Scan codebases and report whether their analysis is obsolete
    Check(check::CheckArgs),
    /// Show persisted metrics, generations and prompt artifacts
    Status(status::StatusArgs),
    /// Record a learnings file as the next generation
    Record(record::RecordArgs),
    /// Write a regeneration prompt now, regardless of the verdict
    Regenerate(regenerate::RegenerateArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(args),
        Command::Check(args) => check::run(&args),
        Command::Status(args) => status::run(&args),
        Command::Record(args) => record::run(&args),
        Command::Regenerate(args) => regenerate::run(&args),
    }
}

pub fn canonical(path: &Path) -> anyhow::Result<PathBuf> {
    std::fs::canonicalize(path).with_context(|| format!("Cannot resolve path: {}", path.display()))
}

/// Open the pipeline of an initialized codebase.
pub fn open_pipeline(path: &Path) -> anyhow::Result<GenerationPipeline> {
    let root = canonical(path)?;
    let config_path = root.join(STATE_DIR).join(CONFIG_FILE);

    if !config_path.exists() {
        anyhow::bail!(
            "Lineage is not initialized in {}. Run `lineage init` first.",
            root.display()
        );
    }

    let config = LineageConfig::load(&config_path)
        .with_context(|| format!("Cannot load config: {}", config_path.display()))?;
    GenerationPipeline::new(&root, config)
        .with_context(|| format!("Invalid config: {}", config_path.display()))
}

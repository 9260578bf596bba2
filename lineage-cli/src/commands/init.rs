use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use lineage_core::clock::SystemClock;
use lineage_core::config::LineageConfig;
use lineage_core::pipeline::{CONFIG_FILE, GenerationPipeline, STATE_DIR, init_state};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to the codebase (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,

    /// Percentage of changed files that makes the analysis obsolete
    #[arg(long)]
    pub changed_threshold: Option<f64>,

    /// Minimum percentage of files that must be analyzed
    #[arg(long)]
    pub coverage_min: Option<f64>,

    /// Do not treat newly detected languages as a reason to regenerate
    #[arg(long)]
    pub ignore_new_languages: bool,

    /// Only report staleness; never write prompts during `check`
    #[arg(long)]
    pub no_auto_regenerate: bool,
}

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    let root = super::canonical(&args.path)?;
    let config_path = root.join(STATE_DIR).join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        println!(
            "Lineage is already initialized in {} (use --force to rewrite the config)",
            root.display()
        );
        return Ok(());
    }
    if config_path.exists() {
        std::fs::remove_file(&config_path)
            .with_context(|| format!("Cannot replace config: {}", config_path.display()))?;
    }

    let config = build_config(&args);
    config.validate().context("Invalid config options")?;

    let config_path = init_state(&root, &config).context("Cannot initialize state directory")?;
    let pipeline = GenerationPipeline::new(&root, config)?;
    let outcome = pipeline
        .run(&SystemClock)
        .context("Baseline scan failed")?;

    println!("Initialized Lineage in {}", root.display());
    println!();
    println!("  Config:      {}", config_path.display());
    println!("  Files:       {}", outcome.metrics.files_total);
    println!(
        "  Analyzed:    {} ({:.1}%)",
        outcome.metrics.files_analyzed,
        outcome.metrics.coverage_percent()
    );
    println!("  Fingerprint: {}", outcome.codebase.fingerprint);
    if !outcome.verdict.reasons.is_empty() {
        println!();
        println!("  Baseline is already stale: {}", outcome.verdict.summary());
    }

    Ok(())
}

fn build_config(args: &InitArgs) -> LineageConfig {
    let mut config = LineageConfig::default();
    if let Some(pct) = args.changed_threshold {
        config.thresholds.files_changed_percent = pct;
    }
    if let Some(pct) = args.coverage_min {
        config.thresholds.coverage_min_percent = pct;
    }
    if args.ignore_new_languages {
        config.thresholds.new_languages_detected = false;
    }
    if args.no_auto_regenerate {
        config.output.auto_regenerate = false;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InitArgs {
        InitArgs {
            path: PathBuf::from("."),
            force: false,
            changed_threshold: None,
            coverage_min: None,
            ignore_new_languages: false,
            no_auto_regenerate: false,
        }
    }

    #[test]
    fn defaults_without_overrides() {
        assert_eq!(build_config(&args()), LineageConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let config = build_config(&InitArgs {
            changed_threshold: Some(10.0),
            coverage_min: Some(50.0),
            ignore_new_languages: true,
            no_auto_regenerate: true,
            ..args()
        });
        assert!((config.thresholds.files_changed_percent - 10.0).abs() < f64::EPSILON);
        assert!((config.thresholds.coverage_min_percent - 50.0).abs() < f64::EPSILON);
        assert!(!config.thresholds.new_languages_detected);
        assert!(!config.output.auto_regenerate);
    }

    #[test]
    fn out_of_range_override_fails_validation() {
        let config = build_config(&InitArgs {
            coverage_min: Some(120.0),
            ..args()
        });
        assert!(config.validate().is_err());
    }
}

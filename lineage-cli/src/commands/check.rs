use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use lineage_core::clock::SystemClock;
use lineage_core::pipeline::RunOutcome;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Codebases to check (default: current directory)
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Print one JSON report per codebase instead of text
    #[arg(long)]
    pub json: bool,
}

/// Per-codebase result of `lineage check`.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub path: PathBuf,
    pub codebase: String,
    pub fingerprint: String,
    pub is_obsolete: bool,
    pub should_regenerate: bool,
    pub reasons: Vec<String>,
    pub changed_percent: f64,
    pub coverage_percent: f64,
    pub files_total: u64,
    pub files_changed: u64,
    pub new_languages: Vec<String>,
    pub latest_generation: u32,
    pub prompt_markdown: Option<PathBuf>,
    pub duration_ms: u128,
}

impl CheckReport {
    fn from_outcome(path: &Path, outcome: RunOutcome) -> Self {
        Self {
            path: path.to_path_buf(),
            codebase: outcome.codebase.name,
            fingerprint: outcome.codebase.fingerprint,
            is_obsolete: outcome.verdict.is_obsolete,
            should_regenerate: outcome.verdict.should_regenerate,
            reasons: outcome.verdict.reasons,
            changed_percent: outcome.verdict.changed_percent,
            coverage_percent: outcome.verdict.coverage_percent,
            files_total: outcome.metrics.files_total,
            files_changed: outcome.metrics.files_changed,
            new_languages: outcome.metrics.new_languages.into_iter().collect(),
            latest_generation: outcome.latest_generation,
            prompt_markdown: outcome.prompt.map(|p| p.markdown),
            duration_ms: outcome.duration.as_millis(),
        }
    }
}

pub fn run(args: &CheckArgs) -> anyhow::Result<()> {
    // One run per state directory: duplicate roots would race on it.
    let roots = unique_roots(&args.paths);
    debug!(codebases = roots.len(), requested = args.paths.len(), "Checking codebases");
    let results: Vec<anyhow::Result<CheckReport>> = roots
        .into_par_iter()
        .map(|root| root.and_then(|root| check_one(&root)))
        .collect();

    let mut first_error = None;
    for result in results {
        match result {
            Ok(report) if args.json => println!("{}", serde_json::to_string(&report)?),
            Ok(report) => print_report(&report),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Canonicalize `paths`, dropping repeats of a root already seen.
/// Unresolvable paths stay in place as errors.
fn unique_roots(paths: &[PathBuf]) -> Vec<anyhow::Result<PathBuf>> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .map(|path| super::canonical(path))
        .filter(|root| match root {
            Ok(root) => seen.insert(root.clone()),
            Err(_) => true,
        })
        .collect()
}

fn check_one(path: &Path) -> anyhow::Result<CheckReport> {
    let pipeline = super::open_pipeline(path)?;
    let outcome = pipeline
        .run(&SystemClock)
        .with_context(|| format!("Check failed for {}", pipeline.root().display()))?;
    info!(
        root = %pipeline.root().display(),
        obsolete = outcome.verdict.is_obsolete,
        duration = ?outcome.duration,
        "Codebase checked"
    );
    Ok(CheckReport::from_outcome(pipeline.root(), outcome))
}

fn print_report(report: &CheckReport) {
    let status = if report.is_obsolete { "OBSOLETE" } else { "current" };
    println!("{} [{status}]", report.path.display());
    println!(
        "  Files:       {} ({} changed, {:.1}%)",
        report.files_total, report.files_changed, report.changed_percent
    );
    println!("  Coverage:    {:.1}%", report.coverage_percent);
    println!("  Generation:  {}", report.latest_generation);
    if !report.new_languages.is_empty() {
        println!("  New:         {}", report.new_languages.join(", "));
    }
    for reason in &report.reasons {
        println!("  - {reason}");
    }
    match &report.prompt_markdown {
        Some(md) => println!("  Prompt:      {}", md.display()),
        None if report.should_regenerate => {
            println!("  Prompt:      not written (auto_regenerate is off)");
        }
        None => {}
    }
    println!();
}

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the codebase (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

pub fn run(args: &StatusArgs) -> anyhow::Result<()> {
    let pipeline = super::open_pipeline(&args.path)?;
    let status = pipeline.status().context("Failed to read lineage state")?;
    let metrics = &status.metrics;

    println!("Lineage status for {}", pipeline.root().display());
    println!();
    println!("  State:  {}", status.state_dir.display());
    match &metrics.updated_at {
        Some(at) => println!("  Updated: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Updated: never"),
    }
    println!();

    println!("  Files:       {}", metrics.files_total);
    println!(
        "    analyzed   {:>6} ({:.1}%)",
        metrics.files_analyzed,
        metrics.coverage_percent()
    );
    println!(
        "    documented {:>6} ({:.1}%)",
        metrics.files_documented,
        metrics.documentation_percent()
    );
    println!();

    println!("  Last run:");
    println!("    changed    {:>6}", metrics.files_changed);
    println!("    added      {:>6}", metrics.files_added);
    println!("    deleted    {:>6}", metrics.files_deleted);
    if !metrics.new_languages.is_empty() {
        let langs: Vec<&str> = metrics.new_languages.iter().map(String::as_str).collect();
        println!("    languages  {}", langs.join(", "));
    }
    for warning in metrics.consistency_warnings() {
        println!("    warning: {warning}");
    }
    println!();

    match status.latest_generation {
        Some(n) => println!("  Generation:  {n}"),
        None => println!("  Generation:  none recorded"),
    }
    match &status.fingerprint {
        Some(fp) => println!("  Fingerprint: {fp}"),
        None => println!("  Fingerprint: (no scan)"),
    }
    match &status.prompt {
        Some(artifacts) => println!("  Prompt:      {}", artifacts.markdown.display()),
        None => println!("  Prompt:      not generated"),
    }

    Ok(())
}

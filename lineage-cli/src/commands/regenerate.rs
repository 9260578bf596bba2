use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use similar::{ChangeTag, TextDiff};

use lineage_core::clock::SystemClock;

#[derive(Args, Debug)]
pub struct RegenerateArgs {
    /// Path to the codebase (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Reason written into the prompt instead of the detector's summary
    #[arg(long)]
    pub reason: Option<String>,

    /// Show what changed in the Markdown prompt since it was last written
    #[arg(long)]
    pub diff: bool,
}

pub fn run(args: &RegenerateArgs) -> anyhow::Result<()> {
    let pipeline = super::open_pipeline(&args.path)?;

    let stem = &pipeline.config().output.prompt_stem;
    let markdown_path = pipeline.state_dir().join(format!("{stem}.md"));
    let before = if args.diff {
        std::fs::read_to_string(&markdown_path).unwrap_or_default()
    } else {
        String::new()
    };

    let outcome = pipeline
        .regenerate(&SystemClock, args.reason.as_deref())
        .context("Regeneration failed")?;
    let Some(artifacts) = outcome.prompt else {
        anyhow::bail!("Regeneration produced no prompt");
    };

    println!(
        "Wrote regeneration prompt for generation {}",
        outcome.latest_generation + 1
    );
    println!("  JSON:     {}", artifacts.json.display());
    println!("  Markdown: {}", artifacts.markdown.display());

    if args.diff {
        let after = std::fs::read_to_string(&artifacts.markdown)
            .with_context(|| format!("Cannot read {}", artifacts.markdown.display()))?;
        println!();
        print!("{}", unified_diff(&before, &after));
    }

    Ok(())
}

/// Line diff of two prompt renderings; only changed lines are shown.
fn unified_diff(before: &str, after: &str) -> String {
    let diff = TextDiff::from_lines(before, after);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => '-',
            ChangeTag::Insert => '+',
            ChangeTag::Equal => continue,
        };
        let _ = write!(out, "{sign}{change}");
        if change.missing_newline() {
            out.push('\n');
        }
    }
    if out.is_empty() {
        out.push_str("(no changes)\n");
    }
    out
}

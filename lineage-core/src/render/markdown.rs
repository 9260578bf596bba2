// Markdown renderer: the human-readable view of a regeneration prompt.
//
// Walks each section of the prompt and emits a heading plus a bullet list.
// A section whose lists are all empty produces no output at all, heading
// included.

use std::fmt::Write;

use tracing::{debug, instrument};

use crate::learnings::Learnings;
use crate::regen::{ChangesDetected, EnhancedRequirements, RegenerationPrompt, RegenerationTask};
use crate::scan::ScanSummary;

use super::traits::Renderer;

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    #[instrument(skip_all, name = "markdown_render")]
    fn render(&self, prompt: &RegenerationPrompt) -> crate::error::Result<String> {
        let out = render_markdown(prompt);
        debug!(bytes = out.len(), "Markdown prompt rendered");
        Ok(out)
    }
}

/// Render the full document.
pub fn render_markdown(prompt: &RegenerationPrompt) -> String {
    let mut out = String::with_capacity(4096);

    let _ = writeln!(
        out,
        "# Regeneration Prompt: {} (generation {})",
        prompt.context.codebase, prompt.metadata.target_generation
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "> {}", prompt.purpose);
    let _ = writeln!(out);

    render_metadata(&mut out, prompt);

    let _ = writeln!(out, "## Instruction");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", prompt.prompt.instruction);
    let _ = writeln!(out);

    render_context(&mut out, prompt);
    render_changes(&mut out, &prompt.context.changes_detected);
    render_learnings(&mut out, &prompt.learnings);
    render_requirements(&mut out, &prompt.enhanced_requirements);
    render_tasks(&mut out, &prompt.prompt.tasks);

    out
}

fn render_metadata(out: &mut String, prompt: &RegenerationPrompt) {
    let meta = &prompt.metadata;
    let _ = writeln!(out, "## Metadata");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Schema version:** {}", prompt.version);
    let _ = writeln!(out, "- **Generated by:** {}", meta.generated_by);
    let _ = writeln!(out, "- **Target generation:** {}", meta.target_generation);
    if let Some(previous) = meta.previous_run {
        let _ = writeln!(out, "- **Previous run:** {}", previous.to_rfc3339());
    }
    let _ = writeln!(out, "- **Generated at:** {}", meta.current_date.to_rfc3339());
    let _ = writeln!(out, "- **Obsolescence reason:** {}", meta.obsolescence_reason);
    if !meta.previous_fingerprint.is_empty() {
        let _ = writeln!(out, "- **Previous fingerprint:** `{}`", meta.previous_fingerprint);
    }
    let _ = writeln!(out, "- **Current fingerprint:** `{}`", meta.current_fingerprint);
    let _ = writeln!(out);
}

fn render_context(out: &mut String, prompt: &RegenerationPrompt) {
    let ctx = &prompt.context;
    let _ = writeln!(out, "## Context");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Codebase:** {}", ctx.codebase);
    let _ = writeln!(out, "- **Path:** `{}`", ctx.codebase_path.display());
    let _ = writeln!(out, "- **Output location:** `{}`", ctx.output_location.display());
    if let Some(scan) = &ctx.previous_scan {
        let _ = writeln!(out, "- **Previous scan:** {}", scan_line(scan));
    }
    if let Some(scan) = &ctx.current_scan {
        let _ = writeln!(out, "- **Current scan:** {}", scan_line(scan));
    }
    let _ = writeln!(out);
}

fn scan_line(scan: &ScanSummary) -> String {
    let mut line = format!(
        "{} files, {} analyzed ({:.1}%), {} documented",
        scan.files_total, scan.files_analyzed, scan.coverage_percent, scan.files_documented
    );
    if !scan.languages.is_empty() {
        let langs: Vec<String> = scan
            .languages
            .iter()
            .map(|(lang, count)| format!("{lang} {count}"))
            .collect();
        let _ = write!(line, "; {}", langs.join(", "));
    }
    line
}

fn render_changes(out: &mut String, changes: &ChangesDetected) {
    if changes.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Changes Detected");
    let _ = writeln!(out);
    bullet_section(out, "Structural Changes", &changes.structural_changes);
    bullet_section(out, "New Languages", &changes.new_languages);
    bullet_section(out, "New Frameworks", &changes.new_frameworks);
    bullet_section(out, "Dependency Changes", &changes.dependency_changes);
    bullet_section(out, "Architecture Changes", &changes.architecture_changes);
}

fn render_learnings(out: &mut String, learnings: &Learnings) {
    let worked: Vec<String> = learnings
        .what_worked_well
        .iter()
        .map(|w| {
            format!(
                "**[{}]** {} (confidence {:.2}, impact {})",
                w.category, w.description, w.confidence, w.impact
            )
        })
        .collect();
    let failed: Vec<String> = learnings
        .what_failed
        .iter()
        .map(|f| {
            let mut line = format!("**[{}]** {} (impact {})", f.category, f.description, f.impact);
            if let Some(fix) = &f.suggested_fix {
                let _ = write!(line, ". Suggested fix: {fix}");
            }
            line
        })
        .collect();
    let edge_cases: Vec<String> = learnings
        .edge_cases
        .iter()
        .map(|e| {
            format!(
                "**[{}]** when {}: currently {}, should {} (priority {})",
                e.category, e.trigger, e.current_behavior, e.desired_behavior, e.priority
            )
        })
        .collect();
    let patterns: Vec<String> = learnings
        .patterns
        .iter()
        .map(|p| {
            let mut line = format!("**{}** ({}x): {}", p.name, p.frequency, p.description);
            if !p.recommendation.is_empty() {
                let _ = write!(line, ". Recommendation: {}", p.recommendation);
            }
            line
        })
        .collect();
    let improvements: Vec<String> = learnings
        .improvements
        .iter()
        .map(|i| {
            let mut line = format!(
                "**[{}]** {} (priority {}, effort {})",
                i.category, i.description, i.priority, i.effort
            );
            if let Some(hint) = &i.implementation_hint {
                let _ = write!(line, ". Hint: {hint}");
            }
            line
        })
        .collect();

    if worked.is_empty()
        && failed.is_empty()
        && edge_cases.is_empty()
        && patterns.is_empty()
        && improvements.is_empty()
    {
        return;
    }

    let _ = writeln!(
        out,
        "## Learnings from Generation {}",
        learnings.metadata.generation
    );
    let _ = writeln!(out);
    bullet_section(out, "What Worked Well", &worked);
    bullet_section(out, "What Failed", &failed);
    bullet_section(out, "Edge Cases", &edge_cases);
    bullet_section(out, "Patterns", &patterns);
    bullet_section(out, "Improvements", &improvements);
}

fn render_requirements(out: &mut String, req: &EnhancedRequirements) {
    if req.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Enhanced Requirements");
    let _ = writeln!(out);
    bullet_section(out, "Report Types", &req.report_types);
    bullet_section(out, "Detection Logic", &req.detection_logic);
    bullet_section(out, "Performance", &req.performance);
    bullet_section(out, "Usability", &req.usability);
    bullet_section(out, "Code Quality", &req.code_quality);
}

fn render_tasks(out: &mut String, tasks: &[RegenerationTask]) {
    if tasks.is_empty() {
        return;
    }
    let _ = writeln!(out, "## Tasks");
    let _ = writeln!(out);
    for task in tasks {
        let _ = writeln!(out, "### {}: {}", task.id, task.name);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", task.description);
        let _ = writeln!(out);
        if !task.improvements_over_previous.is_empty() {
            let _ = writeln!(out, "**Improvements over previous generation:**");
            let _ = writeln!(out);
            for item in &task.improvements_over_previous {
                let _ = writeln!(out, "- {item}");
            }
            let _ = writeln!(out);
        }
        match (&task.output_format, &task.output_location) {
            (Some(format), Some(location)) => {
                let _ = writeln!(out, "**Output:** {format} in `{location}`");
                let _ = writeln!(out);
            }
            (Some(format), None) => {
                let _ = writeln!(out, "**Output:** {format}");
                let _ = writeln!(out);
            }
            (None, Some(location)) => {
                let _ = writeln!(out, "**Output:** `{location}`");
                let _ = writeln!(out);
            }
            (None, None) => {}
        }
    }
}

/// `### heading` followed by one bullet per item; nothing if `items` is empty.
fn bullet_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "### {heading}");
    let _ = writeln!(out);
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
    let _ = writeln!(out);
}

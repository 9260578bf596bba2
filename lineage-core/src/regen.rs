// Regeneration prompt synthesizer: turns the previous generation's learnings
// and an obsolescence verdict into the next generation's instructions.
//
// The prompt embeds the learnings by value so it stays self-contained after
// the learnings file changes. Rendering and writing live in `render`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::learnings::{CodebaseChanges, Improvement, Learnings, NextGenRecommendations};
use crate::scan::ScanSummary;
use crate::types::CodebaseIdentity;

/// Schema version of the prompt document.
pub const PROMPT_VERSION: &str = "2.0";

pub const PROMPT_PURPOSE: &str = "Regenerate the analysis and documentation tooling for this codebase, \
carrying forward what the previous generation learned.";

/// Fixed task slots, in the order their ids are assigned.
struct TaskTemplate {
    keyword: &'static str,
    name: &'static str,
    description: &'static str,
    output_format: &'static str,
    output_location: &'static str,
}

const TASK_TEMPLATES: &[TaskTemplate] = &[
    TaskTemplate {
        keyword: "scanning",
        name: "Regenerate codebase scanner",
        description: "Rebuild the file discovery and language classification so it reflects the current layout.",
        output_format: "json",
        output_location: "scan/",
    },
    TaskTemplate {
        keyword: "documentation",
        name: "Regenerate documentation generator",
        description: "Rebuild the documentation passes and their coverage reporting.",
        output_format: "markdown",
        output_location: "docs/",
    },
    TaskTemplate {
        keyword: "tools",
        name: "Regenerate analysis tools",
        description: "Rebuild the supporting analysis tools and their command-line entry points.",
        output_format: "source",
        output_location: "tools/",
    },
];

// ── Prompt document ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationPrompt {
    pub version: String,
    pub purpose: String,
    pub metadata: PromptMetadata,
    pub context: PromptContext,
    pub learnings: Learnings,
    pub enhanced_requirements: EnhancedRequirements,
    pub prompt: PromptBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub generated_by: String,
    pub target_generation: u32,
    pub previous_run: Option<DateTime<Utc>>,
    pub current_date: DateTime<Utc>,
    pub obsolescence_reason: String,
    pub previous_fingerprint: String,
    pub current_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub codebase: String,
    pub codebase_path: PathBuf,
    pub output_location: PathBuf,
    pub previous_scan: Option<ScanSummary>,
    pub current_scan: Option<ScanSummary>,
    pub changes_detected: ChangesDetected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesDetected {
    pub structural_changes: Vec<String>,
    pub new_languages: Vec<String>,
    pub new_frameworks: Vec<String>,
    pub dependency_changes: Vec<String>,
    pub architecture_changes: Vec<String>,
}

impl ChangesDetected {
    pub fn is_empty(&self) -> bool {
        self.structural_changes.is_empty()
            && self.new_languages.is_empty()
            && self.new_frameworks.is_empty()
            && self.dependency_changes.is_empty()
            && self.architecture_changes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedRequirements {
    pub report_types: Vec<String>,
    pub detection_logic: Vec<String>,
    pub performance: Vec<String>,
    pub usability: Vec<String>,
    pub code_quality: Vec<String>,
}

impl From<&NextGenRecommendations> for EnhancedRequirements {
    fn from(r: &NextGenRecommendations) -> Self {
        Self {
            report_types: r.report_types.clone(),
            detection_logic: r.detection_logic.clone(),
            performance: r.performance.clone(),
            usability: r.usability.clone(),
            code_quality: r.code_quality.clone(),
        }
    }
}

impl EnhancedRequirements {
    pub fn is_empty(&self) -> bool {
        self.report_types.is_empty()
            && self.detection_logic.is_empty()
            && self.performance.is_empty()
            && self.usability.is_empty()
            && self.code_quality.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBody {
    pub instruction: String,
    pub tasks: Vec<RegenerationTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub improvements_over_previous: Vec<String>,
    pub output_format: Option<String>,
    pub output_location: Option<String>,
}

// ── Synthesis ───────────────────────────────────────────────────────

/// Everything the synthesizer needs for one prompt.
#[derive(Debug, Clone)]
pub struct SynthesisRequest<'a> {
    /// Identity of the tool producing the prompt, e.g. `lineage/0.1.0`.
    pub generated_by: &'a str,
    pub target_generation: u32,
    /// The codebase as observed now; its fingerprint is the "new" one.
    pub codebase: &'a CodebaseIdentity,
    pub previous_fingerprint: &'a str,
    /// Where the next generation should write its output.
    pub output_location: PathBuf,
    pub obsolescence_reason: &'a str,
    pub previous_scan: Option<ScanSummary>,
    pub current_scan: Option<ScanSummary>,
    pub learnings: &'a Learnings,
}

/// Builds [`RegenerationPrompt`]s, reading the current time from `C`.
#[derive(Debug, Clone)]
pub struct PromptSynthesizer<C> {
    clock: C,
}

impl<C: Clock> PromptSynthesizer<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    #[instrument(skip_all, name = "synthesize", fields(generation = request.target_generation))]
    pub fn synthesize(&self, request: &SynthesisRequest<'_>) -> RegenerationPrompt {
        let learnings = request.learnings;

        let metadata = PromptMetadata {
            generated_by: request.generated_by.to_string(),
            target_generation: request.target_generation,
            previous_run: learnings.metadata.run_timestamp,
            current_date: self.clock.now(),
            obsolescence_reason: request.obsolescence_reason.to_string(),
            previous_fingerprint: request.previous_fingerprint.to_string(),
            current_fingerprint: request.codebase.fingerprint.clone(),
        };

        let context = PromptContext {
            codebase: request.codebase.name.clone(),
            codebase_path: request.codebase.path.clone(),
            output_location: request.output_location.clone(),
            previous_scan: request.previous_scan.clone(),
            current_scan: request.current_scan.clone(),
            changes_detected: flatten_changes(&learnings.codebase_changes),
        };

        let instruction = format!(
            "Regenerate the analysis tooling for codebase '{}' as generation {}. \
             The previous generation is obsolete because: {}. \
             Apply every improvement listed under each task and keep what worked well.",
            request.codebase.name, request.target_generation, request.obsolescence_reason
        );

        let tasks = build_regeneration_tasks(&learnings.improvements);
        info!(
            codebase = %request.codebase.name,
            tasks = tasks.len(),
            improvements = learnings.improvements.len(),
            "Regeneration prompt synthesized"
        );

        RegenerationPrompt {
            version: PROMPT_VERSION.to_string(),
            purpose: PROMPT_PURPOSE.to_string(),
            metadata,
            context,
            learnings: learnings.clone(),
            enhanced_requirements: EnhancedRequirements::from(&learnings.next_gen_recommendations),
            prompt: PromptBody { instruction, tasks },
        }
    }
}

/// Summarize structural changes by count and copy the other change lists.
pub fn flatten_changes(changes: &CodebaseChanges) -> ChangesDetected {
    ChangesDetected {
        structural_changes: summarize_structural_changes(changes),
        new_languages: changes.languages_added.clone(),
        new_frameworks: changes.new_frameworks.clone(),
        dependency_changes: changes.dependency_changes.clone(),
        architecture_changes: changes.architecture_changes.clone(),
    }
}

/// One line per non-empty directory list, stating only its size.
pub fn summarize_structural_changes(changes: &CodebaseChanges) -> Vec<String> {
    let mut summary = Vec::new();
    if !changes.new_directories.is_empty() {
        summary.push(format!("Added {} new directories", changes.new_directories.len()));
    }
    if !changes.removed_directories.is_empty() {
        summary.push(format!("Removed {} directories", changes.removed_directories.len()));
    }
    if !changes.renamed_directories.is_empty() {
        summary.push(format!("Renamed {} directories", changes.renamed_directories.len()));
    }
    summary
}

/// One task per fixed category, `T1-REGEN` onward, each carrying the
/// descriptions of improvements whose category contains the task keyword
/// (case-insensitive).
pub fn build_regeneration_tasks(improvements: &[Improvement]) -> Vec<RegenerationTask> {
    TASK_TEMPLATES
        .iter()
        .enumerate()
        .map(|(i, template)| RegenerationTask {
            id: format!("T{}-REGEN", i + 1),
            name: template.name.to_string(),
            description: template.description.to_string(),
            improvements_over_previous: improvements
                .iter()
                .filter(|imp| category_matches(&imp.category, template.keyword))
                .map(|imp| imp.description.clone())
                .collect(),
            output_format: Some(template.output_format.to_string()),
            output_location: Some(template.output_location.to_string()),
        })
        .collect()
}

/// Substring match ignoring case: `"Advanced Scanning"` matches `"scanning"`.
pub fn category_matches(category: &str, keyword: &str) -> bool {
    category.to_lowercase().contains(&keyword.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::learnings::{DirectoryRename, LearningsMetadata};
    use chrono::TimeZone;

    fn improvement(category: &str, description: &str) -> Improvement {
        Improvement {
            category: category.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    fn identity() -> CodebaseIdentity {
        CodebaseIdentity {
            name: "inventory".into(),
            path: "/srv/inventory".into(),
            fingerprint: "new-fp".into(),
        }
    }

    fn synthesizer() -> PromptSynthesizer<FixedClock> {
        PromptSynthesizer::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap()))
    }

    #[test]
    fn three_tasks_in_fixed_order_with_matching_improvements() {
        let improvements = vec![
            improvement("scanning", "Follow workspace members"),
            improvement("documentation", "Document error variants"),
            improvement("tools", "Add a --json flag"),
        ];

        let tasks = build_regeneration_tasks(&improvements);

        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T1-REGEN", "T2-REGEN", "T3-REGEN"]);
        assert_eq!(tasks[0].improvements_over_previous, vec!["Follow workspace members"]);
        assert_eq!(tasks[1].improvements_over_previous, vec!["Document error variants"]);
        assert_eq!(tasks[2].improvements_over_previous, vec!["Add a --json flag"]);
    }

    #[test]
    fn category_match_is_case_insensitive_substring() {
        assert!(category_matches("Advanced Scanning", "scanning"));
        assert!(category_matches("DOCUMENTATION", "documentation"));
        assert!(!category_matches("docs", "documentation"));

        let tasks = build_regeneration_tasks(&[improvement("Advanced Scanning", "Parallel walk")]);
        assert_eq!(tasks[0].improvements_over_previous, vec!["Parallel walk"]);
        assert!(tasks[1].improvements_over_previous.is_empty());
    }

    #[test]
    fn tasks_exist_even_without_improvements() {
        let tasks = build_regeneration_tasks(&[]);
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.improvements_over_previous.is_empty()));
        assert_eq!(tasks[1].output_format.as_deref(), Some("markdown"));
    }

    #[test]
    fn structural_summary_counts_instead_of_listing() {
        let changes = CodebaseChanges {
            new_directories: vec!["a".into(), "b".into(), "c".into()],
            renamed_directories: vec![DirectoryRename {
                from: "x".into(),
                to: "y".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            summarize_structural_changes(&changes),
            vec!["Added 3 new directories", "Renamed 1 directories"]
        );
        assert!(summarize_structural_changes(&CodebaseChanges::default()).is_empty());
    }

    #[test]
    fn synthesize_copies_identity_and_recommendations() {
        let learnings = Learnings {
            metadata: LearningsMetadata {
                generation: 3,
                run_timestamp: Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
            improvements: vec![improvement("tools", "Ship a shell completion")],
            codebase_changes: CodebaseChanges {
                new_directories: vec!["svc".into()],
                languages_added: vec!["go".into()],
                new_frameworks: vec!["axum".into()],
                ..Default::default()
            },
            next_gen_recommendations: NextGenRecommendations {
                report_types: vec!["dependency report".into()],
                usability: vec!["shorter output".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let codebase = identity();
        let before = learnings.clone();

        let prompt = synthesizer().synthesize(&SynthesisRequest {
            generated_by: "lineage/test",
            target_generation: 4,
            codebase: &codebase,
            previous_fingerprint: "old-fp",
            output_location: "/srv/inventory/.lineage".into(),
            obsolescence_reason: "coverage below minimum",
            previous_scan: None,
            current_scan: None,
            learnings: &learnings,
        });

        assert_eq!(learnings, before, "input must not be mutated");
        assert_eq!(prompt.version, "2.0");
        assert_eq!(prompt.metadata.target_generation, 4);
        assert_eq!(prompt.metadata.previous_fingerprint, "old-fp");
        assert_eq!(prompt.metadata.current_fingerprint, "new-fp");
        assert_eq!(prompt.metadata.previous_run, learnings.metadata.run_timestamp);
        assert_eq!(prompt.context.codebase, "inventory");
        assert_eq!(
            prompt.context.changes_detected.structural_changes,
            vec!["Added 1 new directories"]
        );
        assert_eq!(prompt.context.changes_detected.new_languages, vec!["go"]);
        assert_eq!(prompt.context.changes_detected.new_frameworks, vec!["axum"]);
        assert_eq!(prompt.enhanced_requirements.report_types, vec!["dependency report"]);
        assert_eq!(prompt.enhanced_requirements.usability, vec!["shorter output"]);
        assert_eq!(prompt.learnings, learnings);
        assert_eq!(
            prompt.prompt.tasks[2].improvements_over_previous,
            vec!["Ship a shell completion"]
        );

        insta::assert_snapshot!(
            prompt.prompt.instruction,
            @"Regenerate the analysis tooling for codebase 'inventory' as generation 4. The previous generation is obsolete because: coverage below minimum. Apply every improvement listed under each task and keep what worked well."
        );
    }

    #[test]
    fn synthesis_is_deterministic_under_fixed_clock() {
        let learnings = Learnings::new_empty();
        let codebase = identity();
        let request = SynthesisRequest {
            generated_by: "lineage/test",
            target_generation: 1,
            codebase: &codebase,
            previous_fingerprint: "",
            output_location: "out".into(),
            obsolescence_reason: "first run",
            previous_scan: None,
            current_scan: None,
            learnings: &learnings,
        };
        assert_eq!(synthesizer().synthesize(&request), synthesizer().synthesize(&request));
    }
}

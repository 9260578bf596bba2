// Learnings record: the structured outcome report of one generation.
//
// One file per generation (`learnings-gen-<N>.json`). A recorded generation
// is never rewritten; `record_generation` refuses to overwrite.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store;
use crate::types::CodebaseIdentity;

/// Severity / priority scale shared by failures, edge cases and improvements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rough implementation effort for an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Small,
    #[default]
    Medium,
    Large,
}

impl Effort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Record sections ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningsMetadata {
    pub tool_name: String,
    pub tool_version: String,
    /// Starts at 1 for the first real run; 0 means "no prior generation".
    pub generation: u32,
    pub run_id: Option<Uuid>,
    pub run_timestamp: Option<DateTime<Utc>>,
    pub codebase: CodebaseIdentity,
}

/// Operational telemetry of the run itself, not of the codebase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionMetrics {
    pub duration_secs: f64,
    pub files_processed: u64,
    pub errors: u64,
    pub warnings: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatWorked {
    pub category: String,
    pub description: String,
    pub confidence: f64,
    pub frequency: u32,
    pub impact: Level,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatFailed {
    pub category: String,
    pub description: String,
    pub frequency: u32,
    pub impact: Level,
    pub examples: Vec<String>,
    pub suggested_fix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeCase {
    pub category: String,
    /// Condition that triggers the edge case.
    pub trigger: String,
    pub current_behavior: String,
    pub desired_behavior: String,
    pub priority: Level,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pattern {
    pub category: String,
    pub name: String,
    pub description: String,
    pub frequency: u32,
    pub locations: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Improvement {
    /// Free-form label; regeneration tasks select improvements by
    /// case-insensitive substring match on it.
    pub category: String,
    pub description: String,
    pub current_state: String,
    pub desired_state: String,
    pub priority: Level,
    pub effort: Effort,
    pub implementation_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryRename {
    pub from: String,
    pub to: String,
}

/// Structural diff of the codebase since the previous generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodebaseChanges {
    pub new_directories: Vec<String>,
    pub removed_directories: Vec<String>,
    pub renamed_directories: Vec<DirectoryRename>,
    pub languages_added: Vec<String>,
    pub languages_removed: Vec<String>,
    pub new_frameworks: Vec<String>,
    pub dependency_changes: Vec<String>,
    pub architecture_changes: Vec<String>,
}

impl CodebaseChanges {
    pub fn is_empty(&self) -> bool {
        self.new_directories.is_empty()
            && self.removed_directories.is_empty()
            && self.renamed_directories.is_empty()
            && self.languages_added.is_empty()
            && self.languages_removed.is_empty()
            && self.new_frameworks.is_empty()
            && self.dependency_changes.is_empty()
            && self.architecture_changes.is_empty()
    }
}

/// What this generation concluded, in hindsight, about its own staleness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsolescenceIndicators {
    pub is_obsolete: bool,
    /// 0.0 (fresh) to 1.0 (fully stale).
    pub score: f64,
    pub reasons: Vec<String>,
    pub confidence: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextGenRecommendations {
    pub report_types: Vec<String>,
    pub detection_logic: Vec<String>,
    pub performance: Vec<String>,
    pub usability: Vec<String>,
    pub code_quality: Vec<String>,
}

/// The full learnings record of one generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Learnings {
    pub metadata: LearningsMetadata,
    pub execution: ExecutionMetrics,
    pub what_worked_well: Vec<WhatWorked>,
    pub what_failed: Vec<WhatFailed>,
    pub edge_cases: Vec<EdgeCase>,
    pub patterns: Vec<Pattern>,
    pub improvements: Vec<Improvement>,
    pub codebase_changes: CodebaseChanges,
    pub obsolescence_indicators: ObsolescenceIndicators,
    pub next_gen_recommendations: NextGenRecommendations,
}

impl Learnings {
    /// A record with every list empty, standing for "generation 0".
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Load a learnings file. A missing file is not an error: it yields
    /// [`Learnings::new_empty`]. Malformed content is.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        Ok(store::read_json(path)?.unwrap_or_else(Self::new_empty))
    }

    /// Write to `path`, creating parent directories and replacing any file there.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        store::write_json(path, self)?;
        debug!(path = %path.display(), generation = self.metadata.generation, "Saved learnings");
        Ok(())
    }

    pub fn generation(&self) -> u32 {
        self.metadata.generation
    }
}

// ── Generation files ────────────────────────────────────────────────

const GENERATION_PREFIX: &str = "learnings-gen-";
const GENERATION_SUFFIX: &str = ".json";

/// Path of the learnings file for `generation` inside `state_dir`.
pub fn learnings_path(state_dir: &Path, generation: u32) -> PathBuf {
    state_dir.join(format!("{GENERATION_PREFIX}{generation}{GENERATION_SUFFIX}"))
}

/// Highest generation recorded in `state_dir`, with its path.
///
/// Files whose generation suffix does not parse as a number are skipped.
pub fn latest_generation(state_dir: &Path) -> crate::error::Result<Option<(u32, PathBuf)>> {
    let pattern = glob::Pattern::escape(&state_dir.to_string_lossy());
    let pattern = format!("{pattern}/{GENERATION_PREFIX}*{GENERATION_SUFFIX}");

    let entries = glob::glob(&pattern).map_err(|e| crate::error::ScanError::Pattern {
        pattern: pattern.clone(),
        message: e.to_string(),
    })?;

    let mut latest: Option<(u32, PathBuf)> = None;
    for path in entries.flatten() {
        let Some(generation) = parse_generation(&path) else {
            continue;
        };
        if latest.as_ref().is_none_or(|(best, _)| generation > *best) {
            latest = Some((generation, path));
        }
    }
    Ok(latest)
}

fn parse_generation(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix(GENERATION_PREFIX)?
        .strip_suffix(GENERATION_SUFFIX)?
        .parse()
        .ok()
}

/// Load the most recent generation's learnings, or an empty record.
///
/// A file that omits `metadata.generation` takes it from its file name.
pub fn load_latest(state_dir: &Path) -> crate::error::Result<Learnings> {
    let Some((generation, path)) = latest_generation(state_dir)? else {
        return Ok(Learnings::new_empty());
    };
    let mut learnings = Learnings::load(&path)?;
    if learnings.metadata.generation == 0 {
        learnings.metadata.generation = generation;
    }
    Ok(learnings)
}

/// The generation number after `generation`.
pub fn next_generation(generation: u32) -> Result<u32, StoreError> {
    generation
        .checked_add(1)
        .ok_or(StoreError::GenerationOverflow(generation))
}

/// Record `learnings` as a new generation in `state_dir`.
///
/// A generation of 0 is assigned the next free number. Returns the
/// generation number written.
pub fn record_generation(state_dir: &Path, learnings: &mut Learnings) -> crate::error::Result<u32> {
    if learnings.metadata.generation == 0 {
        let latest = latest_generation(state_dir)?.map_or(0, |(n, _)| n);
        learnings.metadata.generation = next_generation(latest)?;
    }
    if learnings.metadata.run_id.is_none() {
        learnings.metadata.run_id = Some(Uuid::new_v4());
    }

    let generation = learnings.metadata.generation;
    let path = learnings_path(state_dir, generation);
    if path.exists() {
        return Err(StoreError::GenerationExists(generation).into());
    }

    learnings.save(&path)?;
    info!(generation, path = %path.display(), "Recorded learnings");
    Ok(generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LineageError;
    use chrono::TimeZone;

    fn sample() -> Learnings {
        Learnings {
            metadata: LearningsMetadata {
                tool_name: "doc-analyzer".into(),
                tool_version: "1.4.0".into(),
                generation: 2,
                run_id: Some(Uuid::nil()),
                run_timestamp: Some(Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 6).unwrap()),
                codebase: CodebaseIdentity {
                    name: "billing".into(),
                    path: "/src/billing".into(),
                    fingerprint: "0011223344556677".into(),
                },
            },
            execution: ExecutionMetrics {
                duration_secs: 12.5,
                files_processed: 120,
                errors: 1,
                warnings: 4,
            },
            what_failed: vec![WhatFailed {
                category: "scanning".into(),
                description: "Symlinked vendor dirs were walked".into(),
                frequency: 3,
                impact: Level::High,
                examples: vec!["vendor/lib -> ../lib".into()],
                suggested_fix: Some("Skip symlinks".into()),
            }],
            improvements: vec![Improvement {
                category: "documentation".into(),
                description: "Cover module-level docs".into(),
                priority: Level::Critical,
                effort: Effort::Small,
                ..Default::default()
            }],
            codebase_changes: CodebaseChanges {
                new_directories: vec!["src/ledger".into()],
                renamed_directories: vec![DirectoryRename {
                    from: "src/old".into(),
                    to: "src/new".into(),
                }],
                ..Default::default()
            },
            obsolescence_indicators: ObsolescenceIndicators {
                is_obsolete: true,
                score: 0.7,
                reasons: vec!["coverage dropped".into()],
                confidence: 0.9,
                recommendation: "regenerate".into(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn new_empty_has_empty_collections() {
        let l = Learnings::new_empty();
        assert_eq!(l.generation(), 0);
        assert!(l.what_worked_well.is_empty());
        assert!(l.what_failed.is_empty());
        assert!(l.edge_cases.is_empty());
        assert!(l.patterns.is_empty());
        assert!(l.improvements.is_empty());
        assert!(l.codebase_changes.is_empty());
        assert!(l.obsolescence_indicators.reasons.is_empty());
    }

    #[test]
    fn load_missing_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let l = Learnings::load(&dir.path().join("learnings-gen-1.json")).unwrap();
        assert_eq!(l, Learnings::new_empty());
    }

    #[test]
    fn load_malformed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learnings-gen-1.json");
        std::fs::write(&path, "[1, 2,").unwrap();

        let err = Learnings::load(&path).unwrap_err();
        assert!(
            matches!(err, LineageError::Store(StoreError::Corrupt { .. })),
            "got {err:?}"
        );
    }

    #[test]
    fn partial_document_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(
            &path,
            r#"{"metadata": {"generation": 3}, "improvements": [{"category": "tools", "description": "x"}]}"#,
        )
        .unwrap();

        let l = Learnings::load(&path).unwrap();
        assert_eq!(l.generation(), 3);
        assert_eq!(l.improvements.len(), 1);
        assert_eq!(l.improvements[0].priority, Level::Medium);
        assert!(l.edge_cases.is_empty());
        assert!(l.next_gen_recommendations.report_types.is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/state/learnings-gen-2.json");
        let original = sample();

        original.save(&path).unwrap();
        let loaded = Learnings::load(&path).unwrap();
        assert_eq!(loaded, original);

        loaded.save(&path).unwrap();
        assert_eq!(Learnings::load(&path).unwrap(), original);
    }

    #[test]
    fn latest_generation_picks_highest_number() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_generation(dir.path()).unwrap().is_none());

        for n in [1, 2, 10] {
            let mut l = sample();
            l.metadata.generation = n;
            l.save(&learnings_path(dir.path(), n)).unwrap();
        }
        std::fs::write(dir.path().join("learnings-gen-latest.json"), "{}").unwrap();

        let (n, path) = latest_generation(dir.path()).unwrap().unwrap();
        assert_eq!(n, 10);
        assert!(path.ends_with("learnings-gen-10.json"));
        assert_eq!(load_latest(dir.path()).unwrap().generation(), 10);
    }

    #[test]
    fn record_after_last_generation_is_overflow() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(learnings_path(dir.path(), u32::MAX), "{}").unwrap();

        let mut next = Learnings::new_empty();
        let err = record_generation(dir.path(), &mut next).unwrap_err();

        assert!(
            matches!(err, LineageError::Store(StoreError::GenerationOverflow(u32::MAX))),
            "got {err:?}"
        );
        assert_eq!(latest_generation(dir.path()).unwrap().unwrap().0, u32::MAX);
        assert_eq!(next_generation(41).unwrap(), 42);
    }

    #[test]
    fn record_assigns_next_generation_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = sample();
        first.metadata.generation = 0;
        first.metadata.run_id = None;
        assert_eq!(record_generation(dir.path(), &mut first).unwrap(), 1);
        assert!(first.metadata.run_id.is_some());

        let mut second = sample();
        second.metadata.generation = 0;
        assert_eq!(record_generation(dir.path(), &mut second).unwrap(), 2);

        let mut again = sample();
        again.metadata.generation = 2;
        let err = record_generation(dir.path(), &mut again).unwrap_err();
        assert!(
            matches!(err, LineageError::Store(StoreError::GenerationExists(2))),
            "got {err:?}"
        );
    }

    #[test]
    fn levels_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Critical).unwrap(), "\"critical\"");
        assert_eq!(serde_json::to_string(&Effort::Large).unwrap(), "\"large\"");
        assert!(Level::High > Level::Low);
    }
}

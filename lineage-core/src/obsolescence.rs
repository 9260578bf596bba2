// Obsolescence detector: decides whether the current analysis generation
// still represents the codebase.
//
// Pure: reads metrics (and optionally the previous learnings), never writes.
// Every check runs; the verdict lists every reason that fired, in check order.

#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::learnings::Learnings;
use crate::metrics::Metrics;

/// Trigger levels for the obsolescence checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObsolescenceThresholds {
    /// Changed files as a share of the previous total, in percent, at or above
    /// which the analysis is stale.
    pub files_changed_percent: f64,
    /// Coverage, in percent, below which the analysis is stale.
    pub coverage_min_percent: f64,
    /// Any newly seen language is enough on its own.
    pub new_languages_detected: bool,
    /// If set, a previous generation that rated itself at least this stale
    /// (0.0–1.0) triggers regeneration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_assessed_score: Option<f64>,
}

impl Default for ObsolescenceThresholds {
    fn default() -> Self {
        Self {
            files_changed_percent: 30.0,
            coverage_min_percent: 85.0,
            new_languages_detected: true,
            self_assessed_score: None,
        }
    }
}

impl ObsolescenceThresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percent("files_changed_percent", self.files_changed_percent)?;
        check_percent("coverage_min_percent", self.coverage_min_percent)?;
        if let Some(score) = self.self_assessed_score {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(ConfigError::Invalid(format!(
                    "thresholds.self_assessed_score must be within 0.0..=1.0, got {score}"
                )));
            }
        }
        Ok(())
    }
}

fn check_percent(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "thresholds.{name} must be within 0..=100, got {value}"
        )))
    }
}

/// Outcome of one obsolescence check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsolescenceVerdict {
    pub is_obsolete: bool,
    pub should_regenerate: bool,
    /// One entry per triggered check, in evaluation order.
    pub reasons: Vec<String>,
    pub changed_percent: f64,
    pub coverage_percent: f64,
}

impl ObsolescenceVerdict {
    /// All reasons on one line, for prompts and log messages.
    pub fn summary(&self) -> String {
        if self.reasons.is_empty() {
            "analysis is current".to_string()
        } else {
            self.reasons.join("; ")
        }
    }
}

/// Applies [`ObsolescenceThresholds`] to metrics. Thresholds are validated once,
/// at construction.
#[derive(Debug, Clone)]
pub struct ObsolescenceDetector {
    thresholds: ObsolescenceThresholds,
}

impl ObsolescenceDetector {
    pub fn new(thresholds: ObsolescenceThresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &ObsolescenceThresholds {
        &self.thresholds
    }

    /// Run the structural, coverage and language checks.
    ///
    /// `previous_files_total` is the total recorded by the previous run; it is
    /// the denominator for the changed-files share.
    pub fn detect(&self, current: &Metrics, previous_files_total: u64) -> ObsolescenceVerdict {
        let t = &self.thresholds;
        let mut reasons = Vec::new();

        let changed_percent =
            current.files_changed as f64 / previous_files_total.max(1) as f64 * 100.0;
        if changed_percent >= t.files_changed_percent {
            reasons.push(format!(
                "structural change exceeds threshold: {changed_percent:.1}% of files changed (threshold {:.1}%)",
                t.files_changed_percent
            ));
        }

        let coverage_percent =
            current.files_analyzed as f64 / current.files_total.max(1) as f64 * 100.0;
        if coverage_percent < t.coverage_min_percent {
            reasons.push(format!(
                "coverage below minimum: {coverage_percent:.1}% analyzed (minimum {:.1}%)",
                t.coverage_min_percent
            ));
        }

        if t.new_languages_detected && !current.new_languages.is_empty() {
            let list: Vec<&str> = current.new_languages.iter().map(String::as_str).collect();
            reasons.push(format!("new language(s) detected: {}", list.join(", ")));
        }

        let is_obsolete = !reasons.is_empty();
        debug!(
            changed_percent,
            coverage_percent,
            reasons = reasons.len(),
            is_obsolete,
            "Obsolescence checks evaluated"
        );

        ObsolescenceVerdict {
            is_obsolete,
            should_regenerate: is_obsolete,
            reasons,
            changed_percent,
            coverage_percent,
        }
    }

    /// [`detect`](Self::detect), plus the previous generation's own staleness
    /// rating when `self_assessed_score` is configured.
    pub fn detect_with_learnings(
        &self,
        current: &Metrics,
        previous_files_total: u64,
        previous: &Learnings,
    ) -> ObsolescenceVerdict {
        let mut verdict = self.detect(current, previous_files_total);

        if let Some(min_score) = self.thresholds.self_assessed_score {
            let indicators = &previous.obsolescence_indicators;
            if previous.generation() > 0 && indicators.score >= min_score {
                verdict.reasons.push(format!(
                    "generation {} rated itself obsolete: score {:.2} (threshold {min_score:.2})",
                    previous.generation(),
                    indicators.score
                ));
                verdict.is_obsolete = true;
                verdict.should_regenerate = true;
            }
        }

        verdict
    }
}

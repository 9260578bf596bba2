// Metrics store: per-codebase coverage counts and per-run change deltas.
//
// One live `metrics.json` per codebase state directory. It is overwritten on
// every save; only learnings are versioned by generation.

#![allow(clippy::cast_precision_loss)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store;

/// File name of the metrics snapshot inside a state directory.
pub const METRICS_FILE: &str = "metrics.json";

/// Coverage counts and change deltas for one codebase.
///
/// `files_documented <= files_analyzed <= files_total` is expected but not
/// enforced; see [`Metrics::consistency_warnings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub files_total: u64,
    pub files_analyzed: u64,
    pub files_documented: u64,

    pub files_changed: u64,
    pub files_added: u64,
    pub files_deleted: u64,
    pub new_languages: BTreeSet<String>,

    /// When this snapshot was last saved.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Metrics {
    /// Share of files that were analyzed, in percent. `0.0` for an empty codebase.
    pub fn coverage_percent(&self) -> f64 {
        percent(self.files_analyzed, self.files_total)
    }

    /// Share of analyzed files that carry documentation, in percent.
    pub fn documentation_percent(&self) -> f64 {
        percent(self.files_documented, self.files_analyzed)
    }

    /// Describe every way the coverage triad breaks its expected ordering.
    ///
    /// The values are left untouched; callers decide whether to act.
    pub fn consistency_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.files_analyzed > self.files_total {
            warnings.push(format!(
                "files_analyzed ({}) exceeds files_total ({})",
                self.files_analyzed, self.files_total
            ));
        }
        if self.files_documented > self.files_analyzed {
            warnings.push(format!(
                "files_documented ({}) exceeds files_analyzed ({})",
                self.files_documented, self.files_analyzed
            ));
        }
        warnings
    }

    /// Load a metrics snapshot, or zero-valued metrics if the file is absent.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        Ok(store::read_json(path)?.unwrap_or_default())
    }

    /// Write this snapshot to `path`, replacing any previous one.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        store::write_json(path, self)?;
        Ok(())
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// The live metrics for one codebase, bound to its on-disk location.
#[derive(Debug)]
pub struct MetricsStore {
    path: PathBuf,
    metrics: Metrics,
}

impl MetricsStore {
    /// Open the metrics for the codebase whose state lives in `state_dir`.
    ///
    /// A missing file yields zero-valued metrics; an unreadable or corrupt
    /// one is an error.
    pub fn load(state_dir: &Path) -> crate::error::Result<Self> {
        let path = state_dir.join(METRICS_FILE);
        let metrics = Metrics::load(&path)?;
        debug!(
            path = %path.display(),
            files_total = metrics.files_total,
            "Loaded metrics"
        );
        Ok(Self { path, metrics })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Reset the per-run delta fields, keeping the coverage triad.
    pub fn begin_run(&mut self) {
        self.metrics.files_changed = 0;
        self.metrics.files_added = 0;
        self.metrics.files_deleted = 0;
        self.metrics.new_languages.clear();
    }

    /// Overwrite the coverage triad. Shrinking codebases are allowed.
    pub fn update_coverage(
        &mut self,
        files_total: u64,
        files_analyzed: u64,
        files_documented: u64,
    ) {
        self.metrics.files_total = files_total;
        self.metrics.files_analyzed = files_analyzed;
        self.metrics.files_documented = files_documented;

        for warning in self.metrics.consistency_warnings() {
            warn!(path = %self.path.display(), "{warning}");
        }
    }

    /// Overwrite the change counts and add `new_languages` to the running set.
    pub fn update_changes<I, S>(
        &mut self,
        files_changed: u64,
        files_added: u64,
        files_deleted: u64,
        new_languages: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics.files_changed = files_changed;
        self.metrics.files_added = files_added;
        self.metrics.files_deleted = files_deleted;
        self.metrics
            .new_languages
            .extend(new_languages.into_iter().map(Into::into));
    }

    /// Persist the current state, stamping `updated_at`.
    pub fn save_at(&mut self, now: DateTime<Utc>) -> crate::error::Result<()> {
        self.metrics.updated_at = Some(now);
        self.save()
    }

    /// Persist the current state as is.
    pub fn save(&self) -> crate::error::Result<()> {
        self.metrics.save(&self.path)?;
        debug!(path = %self.path.display(), "Saved metrics");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LineageError, StoreError};
    use chrono::TimeZone;

    #[test]
    fn coverage_zero_for_empty_codebase() {
        let m = Metrics::default();
        assert!(m.coverage_percent().abs() < f64::EPSILON);
        assert!(m.documentation_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn coverage_and_documentation_percent() {
        let m = Metrics {
            files_total: 8,
            files_analyzed: 4,
            files_documented: 1,
            ..Default::default()
        };
        assert!((m.coverage_percent() - 50.0).abs() < 1e-9);
        assert!((m.documentation_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn inconsistent_triad_is_reported_not_fixed() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetricsStore::load(dir.path()).unwrap();
        store.update_coverage(2, 5, 7);

        let m = store.metrics();
        assert_eq!((m.files_total, m.files_analyzed, m.files_documented), (2, 5, 7));
        assert_eq!(m.consistency_warnings().len(), 2);
    }

    #[test]
    fn load_missing_yields_zeroes() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetricsStore::load(&dir.path().join("never-created")).unwrap();
        assert_eq!(store.metrics(), &Metrics::default());
    }

    #[test]
    fn load_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METRICS_FILE), "files_total = 3").unwrap();

        let err = MetricsStore::load(dir.path()).unwrap_err();
        assert!(
            matches!(err, LineageError::Store(StoreError::Corrupt { .. })),
            "got {err:?}"
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("nested/.lineage");

        let mut store = MetricsStore::load(&state).unwrap();
        store.update_coverage(40, 36, 20);
        store.update_changes(5, 2, 1, ["go", "rust"]);
        store
            .save_at(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())
            .unwrap();

        let reloaded = MetricsStore::load(&state).unwrap();
        assert_eq!(reloaded.metrics(), store.metrics());

        // Saving the reloaded value again must not change it.
        reloaded.save().unwrap();
        let third = MetricsStore::load(&state).unwrap();
        assert_eq!(third.metrics(), store.metrics());
    }

    #[test]
    fn languages_accumulate_and_begin_run_clears_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MetricsStore::load(dir.path()).unwrap();
        store.update_coverage(10, 10, 10);
        store.update_changes(1, 1, 0, ["python"]);
        store.update_changes(3, 0, 2, ["go", "python"]);

        let langs: Vec<_> = store.metrics().new_languages.iter().cloned().collect();
        assert_eq!(langs, vec!["go".to_string(), "python".to_string()]);
        assert_eq!(store.metrics().files_changed, 3);

        store.begin_run();
        assert!(store.metrics().new_languages.is_empty());
        assert_eq!(store.metrics().files_deleted, 0);
        assert_eq!(store.metrics().files_total, 10, "coverage survives begin_run");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn coverage_is_finite_and_non_negative(
                total in 0u64..1_000_000,
                analyzed in 0u64..1_000_000
            ) {
                let m = Metrics {
                    files_total: total,
                    files_analyzed: analyzed,
                    ..Default::default()
                };
                let pct = m.coverage_percent();
                prop_assert!(pct.is_finite());
                prop_assert!(pct >= 0.0);
                if analyzed <= total {
                    prop_assert!(pct <= 100.0 + 1e-9);
                }
            }
        }
    }
}

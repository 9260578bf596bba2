// Generation pipeline: scan, measure, detect and synthesize for one codebase.
//
// All state for a codebase lives in its state directory (`.lineage/` under
// the root by default). Runs against the same state directory must not
// overlap; nothing here locks.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::config::LineageConfig;
use crate::learnings::{self, Learnings};
use crate::metrics::{Metrics, MetricsStore};
use crate::obsolescence::{ObsolescenceDetector, ObsolescenceVerdict};
use crate::regen::{PromptSynthesizer, SynthesisRequest};
use crate::render::{self, PromptArtifacts};
use crate::scan::{LanguageRegistry, SNAPSHOT_FILE, ScanDiff, ScanSnapshot, Scanner};
use crate::types::CodebaseIdentity;

/// Default state directory name under a codebase root.
pub const STATE_DIR: &str = ".lineage";

/// Config file name inside the state directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Result of one lifecycle run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub codebase: CodebaseIdentity,
    pub metrics: Metrics,
    pub diff: ScanDiff,
    pub verdict: ObsolescenceVerdict,
    /// Generation of the learnings the verdict was checked against (0 if none).
    pub latest_generation: u32,
    /// Set when this run wrote a regeneration prompt.
    pub prompt: Option<PromptArtifacts>,
    pub duration: Duration,
}

/// What is on disk for a codebase, without scanning it.
#[derive(Debug, Clone)]
pub struct StateStatus {
    pub state_dir: PathBuf,
    pub metrics: Metrics,
    pub latest_generation: Option<u32>,
    pub fingerprint: Option<String>,
    pub prompt: Option<PromptArtifacts>,
}

/// Fresh observation of the codebase, not yet persisted.
struct Observation {
    codebase: CodebaseIdentity,
    snapshot: ScanSnapshot,
    previous: Option<ScanSnapshot>,
    diff: ScanDiff,
    store: MetricsStore,
    previous_total: u64,
}

/// Runs the generation lifecycle for one codebase.
#[derive(Debug)]
pub struct GenerationPipeline {
    root: PathBuf,
    state_dir: PathBuf,
    config: LineageConfig,
    registry: LanguageRegistry,
    detector: ObsolescenceDetector,
}

impl GenerationPipeline {
    /// Build a pipeline for the codebase at `root`. Fails on invalid config.
    pub fn new(root: &Path, config: LineageConfig) -> crate::error::Result<Self> {
        config.validate()?;
        let registry = LanguageRegistry::with_overrides(&config.scan.languages);
        let detector = ObsolescenceDetector::new(config.thresholds.clone())?;
        Ok(Self {
            root: root.to_path_buf(),
            state_dir: root.join(STATE_DIR),
            config,
            registry,
            detector,
        })
    }

    /// Keep state somewhere other than `<root>/.lineage`.
    #[must_use]
    pub fn with_state_dir(mut self, state_dir: &Path) -> Self {
        self.state_dir = state_dir.to_path_buf();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn config(&self) -> &LineageConfig {
        &self.config
    }

    /// Observe the codebase, check it against the latest learnings, and write
    /// a regeneration prompt if it is stale and auto-regeneration is on.
    #[instrument(skip_all, name = "lineage_run", fields(root = %self.root.display()))]
    pub fn run<C: Clock>(&self, clock: &C) -> crate::error::Result<RunOutcome> {
        let start = Instant::now();
        let observation = self.observe()?;
        let learnings = learnings::load_latest(&self.state_dir)?;
        if learnings.metadata.codebase.same_state_as(&observation.codebase) {
            debug!(
                generation = learnings.generation(),
                "Codebase unchanged since the latest recorded generation"
            );
        }

        let verdict = self.detector.detect_with_learnings(
            observation.store.metrics(),
            observation.previous_total,
            &learnings,
        );

        let prompt = if verdict.should_regenerate && self.config.output.auto_regenerate {
            Some(self.write_prompt(clock, &observation, &learnings, &verdict.summary())?)
        } else {
            None
        };

        info!(
            codebase = %observation.codebase.name,
            obsolete = verdict.is_obsolete,
            reasons = verdict.reasons.len(),
            prompt_written = prompt.is_some(),
            "Lifecycle run complete"
        );

        self.finish(observation, clock, &learnings, verdict, prompt, start)
    }

    /// Observe the codebase and write a regeneration prompt regardless of the
    /// verdict. `reason` overrides the verdict's summary in the prompt.
    #[instrument(skip_all, name = "lineage_regenerate", fields(root = %self.root.display()))]
    pub fn regenerate<C: Clock>(
        &self,
        clock: &C,
        reason: Option<&str>,
    ) -> crate::error::Result<RunOutcome> {
        let start = Instant::now();
        let observation = self.observe()?;
        let learnings = learnings::load_latest(&self.state_dir)?;

        let verdict = self.detector.detect_with_learnings(
            observation.store.metrics(),
            observation.previous_total,
            &learnings,
        );
        let reason = reason.map_or_else(|| verdict.summary(), str::to_string);
        let prompt = self.write_prompt(clock, &observation, &learnings, &reason)?;

        self.finish(observation, clock, &learnings, verdict, Some(prompt), start)
    }

    /// Record learnings produced by an analysis run as the next generation.
    ///
    /// Missing identity and timestamp fields are filled from the last saved
    /// scan and `clock`.
    pub fn record<C: Clock>(
        &self,
        clock: &C,
        mut learnings: Learnings,
    ) -> crate::error::Result<u32> {
        let meta = &mut learnings.metadata;
        if meta.codebase.name.is_empty() {
            let fingerprint = ScanSnapshot::load(&self.state_dir.join(SNAPSHOT_FILE))?
                .map(|s| s.fingerprint())
                .unwrap_or_default();
            meta.codebase = CodebaseIdentity::for_path(&self.root, fingerprint);
        }
        if meta.run_timestamp.is_none() {
            meta.run_timestamp = Some(clock.now());
        }
        learnings::record_generation(&self.state_dir, &mut learnings)
    }

    /// Summarize persisted state without scanning.
    pub fn status(&self) -> crate::error::Result<StateStatus> {
        let store = MetricsStore::load(&self.state_dir)?;
        let latest_generation = learnings::latest_generation(&self.state_dir)?.map(|(n, _)| n);
        let fingerprint =
            ScanSnapshot::load(&self.state_dir.join(SNAPSHOT_FILE))?.map(|s| s.fingerprint());

        let stem = &self.config.output.prompt_stem;
        let artifacts = PromptArtifacts {
            json: self.state_dir.join(format!("{stem}.json")),
            markdown: self.state_dir.join(format!("{stem}.md")),
        };
        let prompt = (artifacts.json.exists() && artifacts.markdown.exists()).then_some(artifacts);

        Ok(StateStatus {
            state_dir: self.state_dir.clone(),
            metrics: store.metrics().clone(),
            latest_generation,
            fingerprint,
            prompt,
        })
    }

    fn observe(&self) -> crate::error::Result<Observation> {
        let scanner = Scanner::new(&self.registry, &self.config.scan)?
            .exclude_dir(&self.state_dir);
        let snapshot = scanner.scan(&self.root)?;
        let previous = ScanSnapshot::load(&self.state_dir.join(SNAPSHOT_FILE))?;

        // The first run sets the baseline; it has no deltas.
        let diff = previous
            .as_ref()
            .map(|prev| snapshot.diff(prev))
            .unwrap_or_default();

        let mut store = MetricsStore::load(&self.state_dir)?;
        let previous_total = store.metrics().files_total;

        let summary = snapshot.summary();
        store.begin_run();
        store.update_coverage(
            summary.files_total,
            summary.files_analyzed,
            summary.files_documented,
        );
        store.update_changes(
            diff.files_changed(),
            diff.added.len() as u64,
            diff.deleted.len() as u64,
            diff.new_languages.iter().cloned(),
        );

        let codebase = CodebaseIdentity::for_path(&self.root, snapshot.fingerprint());
        Ok(Observation {
            codebase,
            snapshot,
            previous,
            diff,
            store,
            previous_total,
        })
    }

    fn write_prompt<C: Clock>(
        &self,
        clock: &C,
        observation: &Observation,
        learnings: &Learnings,
        reason: &str,
    ) -> crate::error::Result<PromptArtifacts> {
        let previous_fingerprint = if learnings.metadata.codebase.fingerprint.is_empty() {
            observation
                .previous
                .as_ref()
                .map(ScanSnapshot::fingerprint)
                .unwrap_or_default()
        } else {
            learnings.metadata.codebase.fingerprint.clone()
        };

        let target_generation = learnings::next_generation(learnings.generation())?;
        let synthesizer = PromptSynthesizer::new(clock);
        let prompt = synthesizer.synthesize(&SynthesisRequest {
            generated_by: &self.config.output.tool_name,
            target_generation,
            codebase: &observation.codebase,
            previous_fingerprint: &previous_fingerprint,
            output_location: self.state_dir.clone(),
            obsolescence_reason: reason,
            previous_scan: observation.previous.as_ref().map(ScanSnapshot::summary),
            current_scan: Some(observation.snapshot.summary()),
            learnings,
        });

        render::write_artifacts(&prompt, &self.state_dir, &self.config.output.prompt_stem)
    }

    fn finish<C: Clock>(
        &self,
        mut observation: Observation,
        clock: &C,
        learnings: &Learnings,
        verdict: ObsolescenceVerdict,
        prompt: Option<PromptArtifacts>,
        start: Instant,
    ) -> crate::error::Result<RunOutcome> {
        observation.store.save_at(clock.now())?;
        observation
            .snapshot
            .save(&self.state_dir.join(SNAPSHOT_FILE))?;

        Ok(RunOutcome {
            codebase: observation.codebase,
            metrics: observation.store.metrics().clone(),
            diff: observation.diff,
            verdict,
            latest_generation: learnings.generation(),
            prompt,
            duration: start.elapsed(),
        })
    }
}

/// Create the state directory and a default config file if they are missing.
///
/// Returns the config path. An existing config is left untouched.
pub fn init_state(root: &Path, config: &LineageConfig) -> crate::error::Result<PathBuf> {
    let state_dir = root.join(STATE_DIR);
    let config_path = state_dir.join(CONFIG_FILE);
    if config_path.exists() {
        return Ok(config_path);
    }

    let content = config.to_toml()?;
    crate::store::write_atomic(&config_path, content.as_bytes()).map_err(|source| {
        crate::error::StoreError::Io {
            path: config_path.clone(),
            source,
        }
    })?;
    info!(path = %config_path.display(), "Initialized lineage state");
    Ok(config_path)
}

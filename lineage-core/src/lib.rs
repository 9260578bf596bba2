//! Lineage core library: generation metrics, learnings, obsolescence
//! detection, and regeneration-prompt synthesis.
//!
//! The main entry point is [`pipeline::GenerationPipeline`], which runs
//! Scan → Measure → Detect → Synthesize over a codebase and persists the
//! results under its `.lineage/` state directory.

pub mod clock;
pub mod config;
pub mod error;
pub mod learnings;
pub mod metrics;
pub mod obsolescence;
pub mod pipeline;
pub mod regen;
pub mod render;
pub mod scan;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::RenderError;
use crate::regen::RegenerationPrompt;
use crate::store::write_atomic;

/// Common interface for regeneration-prompt renderings.
pub trait Renderer: Send + Sync {
    /// Human-readable name for this renderer.
    fn name(&self) -> &'static str;

    /// File extension of the artifact, without the dot.
    fn extension(&self) -> &'static str;

    /// Generate the artifact content.
    fn render(&self, prompt: &RegenerationPrompt) -> crate::error::Result<String>;

    /// Output path for `stem` inside `out_dir`.
    fn output_path(&self, out_dir: &Path, stem: &str) -> PathBuf {
        out_dir.join(format!("{stem}.{}", self.extension()))
    }

    /// Write already-rendered content, creating `out_dir` if needed.
    fn write_rendered(
        &self,
        content: &str,
        out_dir: &Path,
        stem: &str,
    ) -> crate::error::Result<PathBuf> {
        let output = self.output_path(out_dir, stem);
        write_atomic(&output, content.as_bytes()).map_err(|source| RenderError::Io {
            path: output.clone(),
            source,
        })?;
        debug!(renderer = self.name(), path = %output.display(), "Artifact written");
        Ok(output)
    }

    /// Render and write in one step.
    fn write(
        &self,
        prompt: &RegenerationPrompt,
        out_dir: &Path,
        stem: &str,
    ) -> crate::error::Result<PathBuf> {
        let content = self.render(prompt)?;
        self.write_rendered(&content, out_dir, stem)
    }
}

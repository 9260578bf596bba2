//! Renderings of a [`RegenerationPrompt`](crate::regen::RegenerationPrompt):
//! a lossless JSON document and a Markdown view for humans.

pub mod json;
pub mod markdown;
pub mod traits;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::regen::RegenerationPrompt;

pub use json::JsonRenderer;
pub use markdown::MarkdownRenderer;
pub use traits::Renderer;

/// Paths of the two artifacts written for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArtifacts {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Render `prompt` both ways and write `<stem>.json` and `<stem>.md` into
/// `out_dir`.
///
/// Both renderings are produced before either file is written, so a
/// rendering failure leaves the directory untouched.
pub fn write_artifacts(
    prompt: &RegenerationPrompt,
    out_dir: &Path,
    stem: &str,
) -> crate::error::Result<PromptArtifacts> {
    let json_renderer = JsonRenderer;
    let md_renderer = MarkdownRenderer;

    let json = json_renderer.render(prompt)?;
    let markdown = md_renderer.render(prompt)?;

    let artifacts = PromptArtifacts {
        json: json_renderer.write_rendered(&json, out_dir, stem)?,
        markdown: md_renderer.write_rendered(&markdown, out_dir, stem)?,
    };

    info!(
        generation = prompt.metadata.target_generation,
        json = %artifacts.json.display(),
        markdown = %artifacts.markdown.display(),
        "Regeneration prompt written"
    );
    Ok(artifacts)
}

// JSON renderer: the machine-readable, lossless form of a prompt.

use tracing::{debug, instrument};

use crate::error::RenderError;
use crate::regen::RegenerationPrompt;

use super::traits::Renderer;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

impl JsonRenderer {
    /// Parse a previously rendered prompt back.
    pub fn parse(content: &str) -> crate::error::Result<RegenerationPrompt> {
        Ok(serde_json::from_str(content).map_err(RenderError::Serialization)?)
    }
}

impl Renderer for JsonRenderer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    #[instrument(skip_all, name = "json_render")]
    fn render(&self, prompt: &RegenerationPrompt) -> crate::error::Result<String> {
        let mut out = serde_json::to_string_pretty(prompt).map_err(RenderError::Serialization)?;
        out.push('\n');
        debug!(bytes = out.len(), "JSON prompt rendered");
        Ok(out)
    }
}

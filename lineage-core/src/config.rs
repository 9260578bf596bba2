use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::obsolescence::ObsolescenceThresholds;

/// Top-level Lineage configuration, matching `.lineage/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineageConfig {
    #[serde(default)]
    pub lineage: LineageSection,
    #[serde(default)]
    pub thresholds: ObsolescenceThresholds,
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub output: OutputSection,
}

impl LineageConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.display().to_string())
            } else {
                ConfigError::Parse(format!("{}: {e}", path.display()))
            }
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thresholds.validate()?;
        if self.output.prompt_stem.trim().is_empty() {
            return Err(ConfigError::Invalid("output.prompt_stem must not be empty".into()));
        }
        if self.output.prompt_stem.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "output.prompt_stem must be a file name, got {:?}",
                self.output.prompt_stem
            )));
        }
        if self.scan.include_patterns.is_empty() {
            return Err(ConfigError::Invalid("scan.include_patterns must not be empty".into()));
        }
        for (ext, lang) in &self.scan.languages {
            if ext.is_empty() || ext.starts_with('.') || lang.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "scan.languages entry {ext:?} = {lang:?}: use a bare extension and a non-empty language"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageSection {
    pub version: String,
}

impl Default for LineageSection {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Extra or overriding extension → language entries, e.g. `svelte = "svelte"`.
    pub languages: BTreeMap<String, String>,
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            include_patterns: vec!["**/*".into()],
            exclude_patterns: vec![
                "**/.git/**".into(),
                "**/.lineage/**".into(),
                "**/node_modules/**".into(),
                "**/vendor/**".into(),
                "**/target/**".into(),
                "**/dist/**".into(),
            ],
            languages: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// File stem of the two regeneration-prompt artifacts.
    pub prompt_stem: String,
    /// Write a regeneration prompt as soon as a run finds the analysis stale.
    pub auto_regenerate: bool,
    /// Identity recorded as the prompt's author.
    pub tool_name: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            prompt_stem: "phase1-regeneration-prompt".into(),
            auto_regenerate: true,
            tool_name: format!("lineage/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

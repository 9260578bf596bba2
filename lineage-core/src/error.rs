use std::path::PathBuf;

/// Top-level Lineage error type.
///
/// All fallible operations in `lineage-core` return [`Result<T, LineageError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum LineageError {
    /// Error reading or writing persisted state (metrics, learnings, snapshots).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error writing regeneration-prompt artifacts.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Error while walking the codebase.
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

/// Errors from the file-backed state store.
///
/// A missing file is never an error here: callers resolve it to a default
/// value before this type is involved.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The file exists but could not be read, or could not be written.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but its content does not parse.
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// In-memory state could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A learnings file for this generation is already on disk.
    #[error("Learnings for generation {0} already recorded")]
    GenerationExists(u32),

    /// The highest recorded generation has no successor in range.
    #[error("Generation {0} is the last representable generation")]
    GenerationOverflow(u32),
}

/// Errors in Lineage configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors during artifact rendering.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Structured serialization of the prompt failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O error writing rendered output.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while scanning a codebase.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// An include or exclude glob pattern is malformed.
    #[error("Invalid pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    /// The scan root is missing or a file could not be read.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, LineageError>`.
pub type Result<T> = std::result::Result<T, LineageError>;

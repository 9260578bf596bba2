// Integration test utilities and fixture codebases for Lineage.

use std::path::Path;

use chrono::{TimeZone, Utc};

use lineage_core::clock::FixedClock;
use lineage_core::config::LineageConfig;
use lineage_core::pipeline::{GenerationPipeline, RunOutcome};

/// A test fixture with a temporary codebase.
#[derive(Debug)]
pub struct TestCodebase {
    pub dir: tempfile::TempDir,
}

impl TestCodebase {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A small Rust crate: three source files, one of them documented.
    pub fn minimal_rust() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();

        write_file(
            root,
            "src/main.rs",
            "fn main() {\n    greet();\n}\n\nfn greet() {\n    println!(\"hello\");\n}\n",
        );
        write_file(
            root,
            "src/lib.rs",
            "//! Arithmetic helpers.\n\npub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n",
        );
        write_file(
            root,
            "src/helpers.rs",
            "pub fn format_name(name: &str) -> String {\n    format!(\"Hello, {name}!\")\n}\n",
        );

        Self { dir }
    }

    /// `minimal_rust` with the manifest, readme and ignore files a real
    /// crate ships.
    pub fn rust_crate() -> Self {
        let codebase = Self::minimal_rust();
        codebase.write(
            "Cargo.toml",
            "[package]\nname = \"minimal\"\nversion = \"0.1.0\"\nedition = \"2024\"\n",
        );
        codebase.write("README.md", "# minimal\n\nA tiny crate.\n");
        codebase.write(".gitignore", "/target\n");
        codebase.write("LICENSE", "MIT License\n");
        codebase
    }

    /// Rust, Python and TypeScript services side by side.
    pub fn multi_lang() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();

        write_file(
            root,
            "rust-service/src/main.rs",
            "/// Entry point.\nfn main() {\n    println!(\"rust service\");\n}\n",
        );
        write_file(
            root,
            "python-service/app.py",
            "\"\"\"Service entry point.\"\"\"\n\ndef handler(event):\n    return {\"ok\": True}\n",
        );
        write_file(
            root,
            "python-service/util.py",
            "def slugify(s):\n    return s.lower().replace(\" \", \"-\")\n",
        );
        write_file(
            root,
            "web/src/index.ts",
            "/** Render the landing page. */\nexport function render(): string {\n  return \"<h1>hi</h1>\";\n}\n",
        );

        Self { dir }
    }

    /// Every file carries doc comments.
    pub fn documented() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let root = dir.path();

        write_file(
            root,
            "src/lib.rs",
            "//! Processing pipeline.\n\n/// Runs all stages.\npub fn process(input: &str) -> String {\n    input.to_uppercase()\n}\n",
        );
        write_file(
            root,
            "src/stages.rs",
            "/// Validates input data.\npub fn validate(input: &str) -> bool {\n    !input.is_empty()\n}\n",
        );

        Self { dir }
    }

    /// Write (or overwrite) a file relative to the codebase root.
    pub fn write(&self, rel: &str, content: &str) {
        write_file(self.path(), rel, content);
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.path().join(rel)).expect("remove file");
    }

    /// Move a whole directory, keeping file contents.
    pub fn rename_dir(&self, from: &str, to: &str) {
        let target = self.path().join(to);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::rename(self.path().join(from), target).expect("rename dir");
    }

    pub fn state_dir(&self) -> std::path::PathBuf {
        self.path().join(lineage_core::pipeline::STATE_DIR)
    }
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
    std::fs::write(path, content).expect("write file");
}

/// The instant every fixture run is stamped with.
pub fn test_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap())
}

/// Build a pipeline with the default config.
pub fn pipeline(root: &Path) -> GenerationPipeline {
    pipeline_with_config(root, LineageConfig::default())
}

pub fn pipeline_with_config(root: &Path, config: LineageConfig) -> GenerationPipeline {
    GenerationPipeline::new(root, config).expect("valid config")
}

/// Run one lifecycle pass with the fixed test clock.
pub fn run_pipeline(root: &Path) -> RunOutcome {
    pipeline(root).run(&test_clock()).expect("lifecycle run")
}

/// Parse a JSON artifact written by a run.
pub fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

// Codebase scanner: file tree walking, language classification, fingerprinting
// and snapshot diffing.
//
// The scanner feeds the metrics store: it produces the coverage triad and the
// per-run change deltas. Language lookup goes through an immutable
// `LanguageRegistry` built once and passed by reference.

#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::ScanSection;
use crate::error::ScanError;
use crate::learnings::{CodebaseChanges, DirectoryRename};
use crate::store;
use crate::types::{content_hash, hex_fingerprint};

/// File name of the persisted previous scan inside a state directory.
pub const SNAPSHOT_FILE: &str = "scan.json";

// ── Language registry ───────────────────────────────────────────────

/// Extension → language table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegistry {
    by_extension: HashMap<String, String>,
}

const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("pyi", "python"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("cjs", "javascript"),
    ("go", "go"),
    ("java", "java"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cxx", "cpp"),
    ("cc", "cpp"),
    ("hpp", "cpp"),
    ("rb", "ruby"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("zig", "zig"),
    ("cs", "csharp"),
    ("php", "php"),
    ("sh", "shell"),
];

impl LanguageRegistry {
    pub fn builtin() -> Self {
        Self {
            by_extension: BUILTIN_LANGUAGES
                .iter()
                .map(|(ext, lang)| ((*ext).to_string(), (*lang).to_string()))
                .collect(),
        }
    }

    /// Built-in table with `overrides` layered on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut registry = Self::builtin();
        for (ext, lang) in overrides {
            registry
                .by_extension
                .insert(ext.to_ascii_lowercase(), lang.clone());
        }
        registry
    }

    pub fn detect(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Comment markers that indicate a file carries API documentation.
fn doc_markers(language: &str) -> &'static [&'static str] {
    match language {
        "rust" => &["///", "//!"],
        "python" => &["\"\"\"", "'''"],
        "ruby" | "shell" => &["# "],
        "go" => &["// "],
        "swift" => &["///", "/**"],
        _ => &["/**"],
    }
}

/// Extensions of non-source files a project normally carries: docs,
/// manifests, lockfiles, data and assets.
const AUXILIARY_EXTENSIONS: &[&str] = &[
    "md", "markdown", "rst", "adoc", "txt", "toml", "yaml", "yml", "json", "jsonc", "lock",
    "ini", "cfg", "conf", "xml", "csv", "html", "css", "scss", "sql", "proto", "svg", "png",
    "jpg", "jpeg", "gif", "ico",
];

/// Extensionless or dot-prefixed names of the same kind.
const AUXILIARY_NAMES: &[&str] = &[
    "license",
    "licence",
    "copying",
    "notice",
    "readme",
    "changelog",
    "authors",
    "contributors",
    "makefile",
    "dockerfile",
    "justfile",
    "procfile",
    "gemfile",
    "rakefile",
    ".gitignore",
    ".gitattributes",
    ".gitmodules",
    ".editorconfig",
    ".dockerignore",
    ".npmignore",
    ".env",
];

/// Whether `path` is a known non-source file. These count as analyzed for
/// coverage but never contribute a language.
pub fn is_auxiliary(path: &Path) -> bool {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| AUXILIARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
    if by_extension {
        return true;
    }
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_ascii_lowercase();
    // `LICENSE-MIT`, `README.old`
    let base = if name.starts_with('.') {
        name.as_str()
    } else {
        name.split(['-', '.']).next().unwrap_or_default()
    };
    AUXILIARY_NAMES.contains(&base)
}

// ── Snapshot ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub hash: u64,
    pub language: Option<String>,
    pub documented: bool,
}

/// Every tracked file of a codebase at one point in time, keyed by
/// `/`-separated path relative to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    pub files: BTreeMap<String, FileEntry>,
}

/// Counts derived from a snapshot, embedded in regeneration prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub files_total: u64,
    pub files_analyzed: u64,
    pub files_documented: u64,
    pub coverage_percent: f64,
    pub languages: BTreeMap<String, u64>,
}

impl ScanSnapshot {
    /// Digest of the tracked file set and contents.
    pub fn fingerprint(&self) -> String {
        let mut buf = String::new();
        for (path, entry) in &self.files {
            let _ = writeln!(buf, "{path}\0{:016x}", entry.hash);
        }
        hex_fingerprint(content_hash(buf.as_bytes()))
    }

    pub fn summary(&self) -> ScanSummary {
        let mut languages: BTreeMap<String, u64> = BTreeMap::new();
        let mut documented = 0u64;
        let mut analyzed = 0u64;
        for (path, entry) in &self.files {
            if let Some(lang) = &entry.language {
                *languages.entry(lang.clone()).or_default() += 1;
                analyzed += 1;
                if entry.documented {
                    documented += 1;
                }
            } else if is_auxiliary(Path::new(path)) {
                analyzed += 1;
            }
        }
        let total = self.files.len() as u64;
        ScanSummary {
            files_total: total,
            files_analyzed: analyzed,
            files_documented: documented,
            coverage_percent: if total == 0 {
                0.0
            } else {
                analyzed as f64 / total as f64 * 100.0
            },
            languages,
        }
    }

    pub fn languages(&self) -> BTreeSet<String> {
        self.files
            .values()
            .filter_map(|e| e.language.clone())
            .collect()
    }

    /// Every directory that contains a tracked file, at any depth.
    pub fn directories(&self) -> BTreeSet<String> {
        let mut dirs = BTreeSet::new();
        for path in self.files.keys() {
            let mut rest = path.as_str();
            while let Some((parent, _)) = rest.rsplit_once('/') {
                dirs.insert(parent.to_string());
                rest = parent;
            }
        }
        dirs
    }

    /// Compare against the previous snapshot of the same codebase.
    pub fn diff(&self, previous: &ScanSnapshot) -> ScanDiff {
        let mut diff = ScanDiff::default();

        for (path, entry) in &self.files {
            match previous.files.get(path) {
                None => diff.added.push(path.clone()),
                Some(old) if old.hash != entry.hash => diff.modified.push(path.clone()),
                Some(_) => {}
            }
        }
        diff.deleted = previous
            .files
            .keys()
            .filter(|p| !self.files.contains_key(*p))
            .cloned()
            .collect();

        let (now_langs, old_langs) = (self.languages(), previous.languages());
        diff.new_languages = now_langs.difference(&old_langs).cloned().collect();
        diff.removed_languages = old_langs.difference(&now_langs).cloned().collect();

        let (now_dirs, old_dirs) = (self.directories(), previous.directories());
        let mut new_dirs: Vec<String> = now_dirs.difference(&old_dirs).cloned().collect();
        let mut removed_dirs: Vec<String> = old_dirs.difference(&now_dirs).cloned().collect();
        diff.renamed_directories = pair_renames(self, previous, &mut new_dirs, &mut removed_dirs);
        diff.new_directories = new_dirs;
        diff.removed_directories = removed_dirs;

        diff
    }

    /// Load a snapshot; `Ok(None)` if none was saved yet.
    pub fn load(path: &Path) -> crate::error::Result<Option<Self>> {
        Ok(store::read_json(path)?)
    }

    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        store::write_json(path, self)?;
        Ok(())
    }

    /// Files directly or transitively under `dir`, keyed by their path inside it.
    fn contents_of(&self, dir: &str) -> BTreeMap<&str, u64> {
        let prefix = format!("{dir}/");
        self.files
            .iter()
            .filter_map(|(path, e)| path.strip_prefix(&prefix).map(|rel| (rel, e.hash)))
            .collect()
    }
}

/// Match removed directories to new ones holding identical contents, removing
/// matched pairs from both lists.
fn pair_renames(
    current: &ScanSnapshot,
    previous: &ScanSnapshot,
    new_dirs: &mut Vec<String>,
    removed_dirs: &mut Vec<String>,
) -> Vec<DirectoryRename> {
    let mut renames = Vec::new();
    let mut i = 0;
    while i < removed_dirs.len() {
        let old_contents = previous.contents_of(&removed_dirs[i]);
        let matched = if old_contents.is_empty() {
            None
        } else {
            new_dirs
                .iter()
                .position(|d| current.contents_of(d) == old_contents)
        };
        if let Some(j) = matched {
            renames.push(DirectoryRename {
                from: removed_dirs.remove(i),
                to: new_dirs.remove(j),
            });
        } else {
            i += 1;
        }
    }
    renames
}

/// Changes between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiff {
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub new_languages: Vec<String>,
    pub removed_languages: Vec<String>,
    pub new_directories: Vec<String>,
    pub removed_directories: Vec<String>,
    pub renamed_directories: Vec<DirectoryRename>,
}

impl ScanDiff {
    /// Files touched in any way: modified, added or deleted.
    pub fn files_changed(&self) -> u64 {
        (self.modified.len() + self.added.len() + self.deleted.len()) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.files_changed() == 0
            && self.new_directories.is_empty()
            && self.removed_directories.is_empty()
            && self.renamed_directories.is_empty()
    }

    /// The structural part of this diff in learnings form.
    pub fn to_codebase_changes(&self) -> CodebaseChanges {
        CodebaseChanges {
            new_directories: self.new_directories.clone(),
            removed_directories: self.removed_directories.clone(),
            renamed_directories: self.renamed_directories.clone(),
            languages_added: self.new_languages.clone(),
            languages_removed: self.removed_languages.clone(),
            ..Default::default()
        }
    }
}

// ── Scanner ─────────────────────────────────────────────────────────

/// Walks a codebase and classifies its files.
#[derive(Debug)]
pub struct Scanner<'a> {
    registry: &'a LanguageRegistry,
    include_patterns: Vec<String>,
    exclude: Vec<glob::Pattern>,
    excluded_dirs: Vec<PathBuf>,
}

impl<'a> Scanner<'a> {
    pub fn new(registry: &'a LanguageRegistry, config: &ScanSection) -> Result<Self, ScanError> {
        let exclude = config
            .exclude_patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| ScanError::Pattern {
                    pattern: p.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            registry,
            include_patterns: config.include_patterns.clone(),
            exclude,
            excluded_dirs: Vec::new(),
        })
    }

    /// Skip everything under `dir` regardless of the configured patterns.
    #[must_use]
    pub fn exclude_dir(mut self, dir: &Path) -> Self {
        self.excluded_dirs.push(dir.to_path_buf());
        self
    }

    #[instrument(skip_all, name = "scan", fields(root = %root.display()))]
    pub fn scan(&self, root: &Path) -> Result<ScanSnapshot, ScanError> {
        let start = Instant::now();
        if !root.is_dir() {
            return Err(ScanError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let mut snapshot = ScanSnapshot::default();
        let mut unreadable = 0usize;

        for path in self.walk(root)? {
            let Some(relative) = relative_key(root, &path) else {
                continue;
            };
            let content = match std::fs::read(&path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %relative, error = %e, "Skipping unreadable file");
                    unreadable += 1;
                    continue;
                }
            };

            let language = self.registry.detect(&path).map(str::to_string);
            let documented = language.as_deref().is_some_and(|lang| {
                let text = String::from_utf8_lossy(&content);
                doc_markers(lang).iter().any(|m| text.contains(m))
            });

            snapshot.files.insert(
                relative,
                FileEntry {
                    hash: content_hash(&content),
                    language,
                    documented,
                },
            );
        }

        info!(
            files = snapshot.files.len(),
            unreadable,
            duration = ?start.elapsed(),
            "Scan complete"
        );
        Ok(snapshot)
    }

    fn walk(&self, root: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
        let mut matched = Vec::new();

        for pattern in &self.include_patterns {
            let full = format!("{escaped_root}/{pattern}");
            let paths = glob::glob(&full).map_err(|e| ScanError::Pattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            for entry in paths.flatten() {
                if entry.is_file() && !self.is_excluded(root, &entry) {
                    matched.push(entry);
                }
            }
        }

        matched.sort();
        matched.dedup();
        debug!(files = matched.len(), "Walk matched files");
        Ok(matched)
    }

    fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        if self.excluded_dirs.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.exclude.iter().any(|p| p.matches_path(relative))
    }
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

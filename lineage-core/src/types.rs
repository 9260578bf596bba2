use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Which codebase a generation belongs to, and the state it was observed in.
///
/// `name` and `path` are stable for a codebase; `fingerprint` changes whenever
/// the tracked file set or any tracked file's content changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseIdentity {
    pub name: String,
    pub path: PathBuf,
    pub fingerprint: String,
}

impl CodebaseIdentity {
    /// Build an identity for `path`, naming it after its final component.
    pub fn for_path(path: &Path, fingerprint: impl Into<String>) -> Self {
        let name = path
            .file_name()
            .map_or_else(|| "root".to_string(), |n| n.to_string_lossy().to_string());
        Self {
            name,
            path: path.to_path_buf(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Whether `other` describes the same codebase in the same state.
    pub fn same_state_as(&self, other: &Self) -> bool {
        self.name == other.name && self.fingerprint == other.fingerprint
    }
}

/// Compute a content hash for a byte slice using a fast non-cryptographic hash.
///
/// Uses FNV-1a; collisions are acceptable since this is for change detection only.
pub fn content_hash(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in data {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Render a hash as the fixed-width hex string used for fingerprints.
pub fn hex_fingerprint(hash: u64) -> String {
    format!("{hash:016x}")
}

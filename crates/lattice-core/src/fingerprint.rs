//! Content fingerprints for skip/dedup decisions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 content digest identifying a pipeline's input set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest a branch ref plus (path, content-hash) pairs. Pairs are
    /// sorted by path so the result is independent of discovery order.
    pub fn digest<'a>(
        git_ref: Option<&str>,
        files: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    ) -> Self {
        let mut entries: Vec<(&str, &[u8])> = files.into_iter().collect();
        entries.sort_by_key(|(path, _)| *path);

        let mut hasher = Sha256::new();
        if let Some(r) = git_ref {
            hasher.update(b"ref:");
            hasher.update(r.as_bytes());
            hasher.update([0]);
        }
        for (path, content) in entries {
            hasher.update(path.as_bytes());
            hasher.update([0]);
            hasher.update(Sha256::digest(content));
        }
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

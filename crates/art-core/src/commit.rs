//! Commit objects.
//!
//! A commit master names the paginated part files holding its change set;
//! the union of those parts is everything the commit did. Masters live
//! next to their parts inside the branch history directory.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::error::{ArtError, ArtResult};
use crate::fsutil::atomic_write;
use crate::store;

/// A commit master: `<hash>.json` inside a branch directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// SHA-1 over the serialized change set, timestamp, and message.
    pub hash: String,
    pub message: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Hash of the preceding commit on the branch, if any.
    pub parent: Option<String>,
    /// Part filenames holding this commit's change set, in write order.
    pub parts: Vec<String>,
}

impl Commit {
    /// Load a commit master from a branch directory.
    pub fn load(branch_dir: &Path, hash: &str) -> ArtResult<Self> {
        let path = branch_dir.join(format!("{hash}.json"));
        if !path.exists() {
            return Err(ArtError::NotFound(format!("commit {hash}")));
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Persist this master into a branch directory.
    ///
    /// The caller writes the part files first; a master never advertises
    /// parts that are not yet on disk.
    pub fn save(&self, branch_dir: &Path) -> ArtResult<()> {
        let path = branch_dir.join(format!("{}.json", self.hash));
        atomic_write(&path, serde_json::to_string_pretty(self)?.as_bytes())
    }

    /// Load and merge this commit's change set from its part files.
    pub fn changes(&self, branch_dir: &Path) -> ArtResult<BTreeMap<String, Change>> {
        store::load_change_parts(branch_dir, &self.parts)
    }
}

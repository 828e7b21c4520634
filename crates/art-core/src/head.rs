//! Head state — the repository's single mutable pointer.
//!
//! Stored as `.art/art.json`. Its presence is what makes a directory an
//! art repository.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArtError, ArtResult};
use crate::fsutil::atomic_write;

/// The checked-out branch and its tip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveBranch {
    pub branch: String,
    /// Hash of the last commit on the branch, or `None` before the first.
    pub parent: Option<String>,
}

/// Persistent repository head state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadState {
    pub active: ActiveBranch,
    /// Remote slug or URL; empty until configured. Consumed by the sync
    /// front-end, never read by the engine.
    #[serde(default)]
    pub remote: String,
    /// Opaque user configuration.
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

impl HeadState {
    /// Fresh head for a newly initialized repository.
    pub fn new(branch: &str) -> Self {
        HeadState {
            active: ActiveBranch {
                branch: branch.to_string(),
                parent: None,
            },
            remote: String::new(),
            configuration: BTreeMap::new(),
        }
    }

    /// Load the head state; a missing file means there is no repository.
    pub fn load(path: &Path) -> ArtResult<Self> {
        if !path.exists() {
            return Err(ArtError::NotARepo);
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Persist the head state.
    pub fn save(&self, path: &Path) -> ArtResult<()> {
        atomic_write(path, serde_json::to_string_pretty(self)?.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_head() {
        let head = HeadState::new("main");
        assert_eq!(head.active.branch, "main");
        assert!(head.active.parent.is_none());
        assert!(head.remote.is_empty());
        assert!(head.configuration.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("art.json");

        let mut head = HeadState::new("main");
        head.active.parent = Some("abc123".to_string());
        head.remote = "user/repo".to_string();
        head.configuration
            .insert("handle".to_string(), "user".to_string());
        head.save(&path).unwrap();

        let loaded = HeadState::load(&path).unwrap();
        assert_eq!(loaded.active.parent.as_deref(), Some("abc123"));
        assert_eq!(loaded.remote, "user/repo");
        assert_eq!(loaded.configuration.get("handle").unwrap(), "user");
    }

    #[test]
    fn test_load_missing_is_not_a_repo() {
        let dir = tempdir().unwrap();
        let result = HeadState::load(&dir.path().join("art.json"));
        assert!(matches!(result, Err(ArtError::NotARepo)));
    }
}

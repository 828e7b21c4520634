//! Repository — the main entry point for art operations.
//!
//! A Repository ties together the head state, the root snapshot, branch
//! histories, the stage, and the stash under one interface. Every state
//! the engine reports is reconstructed the same way: the root snapshot
//! with the branch's commit change sets replayed on top.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, TimeZone, Utc};
use serde::Serialize;
use walkdir::WalkDir;

use crate::change::Change;
use crate::commit::Commit;
use crate::delta;
use crate::error::{ArtError, ArtResult};
use crate::fsutil;
use crate::hash::commit_hash;
use crate::head::{ActiveBranch, HeadState};
use crate::ignore::IgnoreRules;
use crate::lock::RepoLock;
use crate::merge::{self, MergeAction};
use crate::state::{self, Blob, FileState};
use crate::store::{self, BranchManifest};

/// The metadata directory name.
const ART_DIR: &str = ".art";

/// The head state filename inside the metadata directory.
const HEAD_FILE: &str = "art.json";

/// Branch created by `init`.
const DEFAULT_BRANCH: &str = "main";

/// Filenames operating systems drop into directories; never branches.
const OS_METADATA_NAMES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// An art repository.
pub struct Repository {
    /// Root of the working directory (where `.art/` lives).
    root: PathBuf,
    /// Path to the `.art/` directory.
    art_dir: PathBuf,
    /// Ignore rules, parsed once per handle.
    ignore: IgnoreRules,
}

/// Working-tree classification returned by [`Repository::status`].
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub active_branch: String,
    /// Hash of the last commit on the active branch, if any.
    pub last_commit: Option<String>,
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
    pub ignored: Vec<String>,
}

/// The changed region of a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileDiff {
    pub file: String,
    pub deleted: String,
    pub added: String,
}

/// Output of [`Repository::diff`].
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub file_diffs: Vec<FileDiff>,
    /// Paths currently in the stage (including staged deletions).
    pub staged: Vec<String>,
}

/// One entry in the stash stack, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct StashEntry {
    /// Positional id, e.g. `stash@{0}`.
    pub id: String,
    pub date: String,
    pub dir_name: String,
}

impl Repository {
    /// Default lock timeout for mutable operations.
    const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Initialize a new art repository in the given directory.
    ///
    /// Captures the current working tree as the immutable root snapshot
    /// and seeds empty local and remote histories for the default branch.
    pub fn init(root: &Path) -> ArtResult<Self> {
        let art_dir = root.join(ART_DIR);
        if art_dir.exists() {
            return Err(ArtError::AlreadyExists);
        }

        let ignore = IgnoreRules::load(root);

        fs::create_dir_all(art_dir.join("cache"))?;

        let mut entries = Vec::new();
        for (rel, abs) in walk_files(root) {
            if ignore.should_ignore(&rel) {
                continue;
            }
            let bytes = fs::read(&abs)?;
            entries.push(Blob::from_bytes(&bytes).to_root_entry(rel));
        }
        store::save_root(&art_dir.join("root"), entries)?;

        let manifest = BranchManifest::default();
        store::save_branch_manifest(
            &art_dir.join("history").join("local").join(DEFAULT_BRANCH),
            &manifest,
        )?;
        store::save_branch_manifest(
            &art_dir.join("history").join("remote").join(DEFAULT_BRANCH),
            &manifest,
        )?;

        HeadState::new(DEFAULT_BRANCH).save(&art_dir.join(HEAD_FILE))?;

        Self::open(root)
    }

    /// Open an existing art repository rooted at the given directory.
    pub fn open(root: &Path) -> ArtResult<Self> {
        let art_dir = root.join(ART_DIR);
        if !art_dir.join(HEAD_FILE).exists() {
            return Err(ArtError::NotARepo);
        }
        let ignore = IgnoreRules::load(root);
        Ok(Self {
            root: root.to_path_buf(),
            art_dir,
            ignore,
        })
    }

    /// The working-directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The current head state.
    pub fn head(&self) -> ArtResult<HeadState> {
        HeadState::load(&self.head_path())
    }

    // -------------------------------------------------------------------
    // State reconstruction
    // -------------------------------------------------------------------

    /// Reconstruct the file state of `branch` at `target`.
    ///
    /// Starts from the root snapshot and replays the branch's commit
    /// change sets in manifest order, stopping after `target`. A `None`
    /// target is the root snapshot itself.
    pub fn state_at(&self, branch: &str, target: Option<&str>) -> ArtResult<FileState> {
        let entries = store::load_root(&self.art_dir.join("root"))?;
        let mut current = state::state_from_root(entries)?;

        let Some(target) = target else {
            return Ok(current);
        };

        let dir = self.local_branch_dir(branch);
        let manifest = store::load_branch_manifest(&dir)?;
        let mut found = false;
        for hash in &manifest.commits {
            let commit = Commit::load(&dir, hash)?;
            let changes = commit.changes(&dir)?;
            state::apply_change_set(&mut current, &changes)?;
            if hash == target {
                found = true;
                break;
            }
        }
        if !found {
            return Err(ArtError::NotFound(format!(
                "commit {target} on branch '{branch}'"
            )));
        }
        Ok(current)
    }

    /// The file state at the tip of the active branch.
    pub fn active_state(&self) -> ArtResult<FileState> {
        let head = self.head()?;
        self.state_at(&head.active.branch, head.active.parent.as_deref())
    }

    // -------------------------------------------------------------------
    // Workflow: add / commit / status / diff / log
    // -------------------------------------------------------------------

    /// Stage the changes under `target` (a file or directory).
    ///
    /// Directory walks skip ignored paths unless the file is already
    /// tracked in the active state; an explicitly named file is always
    /// considered. Existing stage entries for the same paths are
    /// overwritten, others are left alone.
    pub fn add(&self, target: &str) -> ArtResult<String> {
        let _lock = self.lock()?;
        let abs = self.root.join(target);
        if !abs.exists() {
            return Err(ArtError::NotFound(format!("path '{target}'")));
        }

        let active = self.active_state()?;
        let selected: Vec<(String, PathBuf)> = if abs.is_dir() {
            walk_files(&abs)
                .into_iter()
                .filter_map(|(_, path)| {
                    let rel = rel_path(&self.root, &path)?;
                    Some((rel, path))
                })
                .filter(|(rel, _)| !self.ignore.should_ignore(rel) || active.contains_key(rel))
                .collect()
        } else {
            let rel = rel_path(&self.root, &abs).ok_or_else(|| {
                ArtError::InvalidArgument(format!("path '{target}' is outside the repository"))
            })?;
            vec![(rel, abs)]
        };

        let changes = self.worktree_changes(&selected, &active)?;
        let count = changes.len();

        let mut staged = store::load_changes(&self.stage_dir())?;
        staged.extend(changes);
        store::save_changes(&self.stage_dir(), &staged)?;

        Ok(format!("Added {count} file(s) to stage."))
    }

    /// Finalize the stage into a commit on the active branch.
    pub fn commit(&self, message: &str) -> ArtResult<String> {
        let _lock = self.lock()?;
        if message.trim().is_empty() {
            return Err(ArtError::InvalidArgument(
                "commit message must not be empty".to_string(),
            ));
        }

        let staged = store::load_changes(&self.stage_dir())?;
        if staged.is_empty() {
            return Err(ArtError::NothingToCommit);
        }

        let mut head = self.head()?;
        let branch = head.active.branch.clone();
        let dir = self.local_branch_dir(&branch);

        let timestamp = Utc::now().timestamp_millis() as u64;
        let changes_json = serde_json::to_string(&staged)?;
        let hash = commit_hash(&changes_json, timestamp, message);

        // Parts first, then the master, then the manifest: readers only
        // follow references that already resolve.
        let parts = store::write_commit_parts(&dir, &hash, &staged)?;
        let commit = Commit {
            hash: hash.clone(),
            message: message.to_string(),
            timestamp,
            parent: head.active.parent.clone(),
            parts,
        };
        commit.save(&dir)?;

        let mut manifest = store::load_branch_manifest(&dir)?;
        manifest.commits.push(hash.clone());
        store::save_branch_manifest(&dir, &manifest)?;

        head.active.parent = Some(hash.clone());
        head.save(&self.head_path())?;

        self.destroy_stage()?;

        Ok(format!("[{branch} {}] {message}", &hash[..7]))
    }

    /// Classify every working-tree file against the stage and active state.
    pub fn status(&self) -> ArtResult<Status> {
        let head = self.head()?;
        let active = self.active_state()?;
        let staged_map = store::load_changes(&self.stage_dir())?;

        let mut status = Status {
            active_branch: head.active.branch,
            last_commit: head.active.parent,
            staged: Vec::new(),
            modified: Vec::new(),
            untracked: Vec::new(),
            ignored: Vec::new(),
        };

        for (rel, abs) in walk_files(&self.root) {
            if staged_map.contains_key(&rel) {
                status.staged.push(rel);
            } else if let Some(blob) = active.get(&rel) {
                let bytes = fs::read(&abs)?;
                if !blob.matches(&bytes) {
                    status.modified.push(rel);
                }
            } else if self.ignore.should_ignore(&rel) {
                status.ignored.push(rel);
            } else {
                status.untracked.push(rel);
            }
        }

        Ok(status)
    }

    /// Content-level differences between the working tree and active state.
    pub fn diff(&self) -> ArtResult<DiffReport> {
        let active = self.active_state()?;
        let staged_map = store::load_changes(&self.stage_dir())?;

        let mut file_diffs = Vec::new();
        for (rel, abs) in walk_files(&self.root) {
            if self.ignore.should_ignore(&rel) && !active.contains_key(&rel) {
                continue;
            }
            let bytes = fs::read(&abs)?;
            if delta::is_binary(&bytes) {
                if !active.contains_key(&rel) {
                    file_diffs.push(FileDiff {
                        file: rel,
                        deleted: String::new(),
                        added: "<Binary Data>".to_string(),
                    });
                }
                continue;
            }

            let previous = match active.get(&rel) {
                Some(Blob::Text(s)) => s.as_str(),
                _ => "",
            };
            let current = String::from_utf8_lossy(&bytes);
            if let Some((deleted, added)) = delta::diff_regions(previous, &current) {
                file_diffs.push(FileDiff {
                    file: rel,
                    deleted,
                    added,
                });
            }
        }

        Ok(DiffReport {
            file_diffs,
            staged: staged_map.keys().cloned().collect(),
        })
    }

    /// Render the active branch's history, newest first.
    pub fn log(&self) -> ArtResult<String> {
        let head = self.head()?;
        let branch = &head.active.branch;
        let dir = self.local_branch_dir(branch);
        let manifest = store::load_branch_manifest(&dir)?;

        if manifest.commits.is_empty() {
            return Ok(format!("No commits yet on branch '{branch}'."));
        }

        let mut entries = Vec::new();
        for hash in manifest.commits.iter().rev() {
            let commit = Commit::load(&dir, hash)?;
            entries.push(format!(
                "commit {}\nDate:   {}\n\n    {}\n",
                commit.hash,
                format_local_ms(commit.timestamp),
                commit.message
            ));
        }
        Ok(entries.join("\n"))
    }

    // -------------------------------------------------------------------
    // Branching
    // -------------------------------------------------------------------

    /// List local branches, filtering out OS metadata names.
    pub fn branches(&self) -> ArtResult<Vec<String>> {
        let dir = self.art_dir.join("history").join("local");
        let mut names = Vec::new();
        if !dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if OS_METADATA_NAMES.contains(&name.as_str()) {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Create a new branch seeded from the active branch's history.
    pub fn create_branch(&self, name: &str) -> ArtResult<String> {
        let _lock = self.lock()?;
        self.create_branch_inner(name)?;
        Ok(format!("Created branch '{name}'."))
    }

    /// Delete a branch's local and remote histories.
    pub fn delete_branch(&self, name: &str) -> ArtResult<String> {
        let _lock = self.lock()?;
        let head = self.head()?;
        if head.active.branch == name {
            return Err(ArtError::Conflict(format!(
                "cannot delete the active branch '{name}'"
            )));
        }
        let local = self.local_branch_dir(name);
        if !local.exists() {
            return Err(ArtError::NotFound(format!("branch '{name}'")));
        }
        fs::remove_dir_all(&local)?;
        let remote = self.remote_branch_dir(name);
        if remote.exists() {
            fs::remove_dir_all(&remote)?;
        }
        Ok(format!("Deleted branch '{name}'."))
    }

    /// Switch the working tree to `branch`, creating it if missing.
    ///
    /// Refuses to clobber local changes unless `force` is set.
    pub fn checkout(&self, branch: &str, force: bool) -> ArtResult<String> {
        let _lock = self.lock()?;
        self.checkout_inner(branch, force)
    }

    /// Three-way merge of `target_branch` into the active branch.
    ///
    /// The result is written to the working tree and staged, never
    /// auto-committed. The common ancestor is the most recent commit the
    /// two branch manifests share, scanning the active list newest to
    /// oldest — histories are assumed linear.
    pub fn merge(&self, target_branch: &str) -> ArtResult<String> {
        let _lock = self.lock()?;
        let head = self.head()?;

        let target_dir = self.local_branch_dir(target_branch);
        if !target_dir.exists() {
            return Err(ArtError::NotFound(format!("branch '{target_branch}'")));
        }

        let active_dir = self.local_branch_dir(&head.active.branch);
        let active_manifest = store::load_branch_manifest(&active_dir)?;
        let target_manifest = store::load_branch_manifest(&target_dir)?;

        let ancestor = active_manifest
            .commits
            .iter()
            .rev()
            .find(|h| target_manifest.commits.contains(*h))
            .cloned();

        let base = self.state_at(&head.active.branch, ancestor.as_deref())?;
        let ours = self.state_at(&head.active.branch, head.active.parent.as_deref())?;
        let theirs = self.state_at(
            target_branch,
            target_manifest.commits.last().map(String::as_str),
        )?;

        let actions = merge::plan(&base, &ours, &theirs, target_branch);
        if actions.is_empty() {
            return Ok("Already up to date.".to_string());
        }

        let mut staged = store::load_changes(&self.stage_dir())?;
        let mut conflicts = 0usize;

        for action in actions {
            match action {
                MergeAction::Write { path, blob } => {
                    self.write_worktree_file(&path, blob.bytes())?;
                    staged.insert(path, blob.to_create());
                }
                MergeAction::Remove { path } => {
                    self.remove_worktree_file(&path)?;
                    staged.insert(path, Change::Delete);
                }
                MergeAction::Conflict { path, content } => {
                    conflicts += 1;
                    self.write_worktree_file(&path, content.as_bytes())?;
                    staged.insert(
                        path,
                        Change::Create {
                            content,
                            binary: false,
                        },
                    );
                }
            }
        }

        store::save_changes(&self.stage_dir(), &staged)?;

        if conflicts > 0 {
            Ok(format!(
                "Merged '{target_branch}' with {conflicts} conflict(s); resolve and commit the result."
            ))
        } else {
            Ok(format!(
                "Merged '{target_branch}' into '{}'; changes staged for commit.",
                head.active.branch
            ))
        }
    }

    // -------------------------------------------------------------------
    // Caches: stash / reset / rm
    // -------------------------------------------------------------------

    /// Save the working-tree delta to the stash and revert the tree.
    pub fn stash(&self) -> ArtResult<String> {
        let _lock = self.lock()?;
        let head = self.head()?;
        let active = self.active_state()?;

        let files: Vec<(String, PathBuf)> = walk_files(&self.root)
            .into_iter()
            .filter(|(rel, _)| !self.ignore.should_ignore(rel) || active.contains_key(rel))
            .collect();
        let changes = self.worktree_changes(&files, &active)?;
        if changes.is_empty() {
            return Ok("No local changes to save.".to_string());
        }

        let timestamp = Utc::now().timestamp_millis() as u64;
        let dir_name = format!("stash_{timestamp}");
        store::save_changes(&self.art_dir.join("cache").join(&dir_name), &changes)?;

        self.destroy_stage()?;
        self.checkout_inner(&head.active.branch, true)?;

        Ok(format!("Saved working tree to {dir_name}."))
    }

    /// Enumerate stash entries, newest first.
    pub fn stash_list(&self) -> ArtResult<Vec<StashEntry>> {
        let cache = self.art_dir.join("cache");
        let mut stamps: Vec<(u64, String)> = Vec::new();
        if cache.exists() {
            for entry in fs::read_dir(&cache)? {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(ms) = name
                    .strip_prefix("stash_")
                    .and_then(|s| s.parse::<u64>().ok())
                {
                    stamps.push((ms, name));
                }
            }
        }
        stamps.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(stamps
            .into_iter()
            .enumerate()
            .map(|(k, (ms, dir_name))| StashEntry {
                id: format!("stash@{{{k}}}"),
                date: format_local_ms(ms),
                dir_name,
            })
            .collect())
    }

    /// Re-apply the newest stash entry to the working tree and drop it.
    pub fn stash_pop(&self) -> ArtResult<String> {
        let _lock = self.lock()?;
        let newest = self
            .stash_list()?
            .into_iter()
            .next()
            .ok_or_else(|| ArtError::NotFound("stash entry".to_string()))?;

        let dir = self.art_dir.join("cache").join(&newest.dir_name);
        let changes = store::load_changes(&dir)?;

        for (path, change) in &changes {
            match change {
                Change::Create { content, binary } => {
                    let bytes = Change::decode_create(content, *binary)?;
                    self.write_worktree_file(path, &bytes)?;
                }
                Change::Delete => {
                    self.remove_worktree_file(path)?;
                }
                Change::Ops(ops) => {
                    let abs = self.root.join(path);
                    let previous = if abs.exists() {
                        String::from_utf8_lossy(&fs::read(&abs)?).into_owned()
                    } else {
                        String::new()
                    };
                    let next = delta::apply_ops(&previous, ops)?;
                    self.write_worktree_file(path, next.as_bytes())?;
                }
            }
        }

        fs::remove_dir_all(&dir)?;
        Ok(format!("Applied {} and dropped it.", newest.id))
    }

    /// Clear the stage, or move the branch head back to `hash`.
    ///
    /// Commits past the truncation point are left on disk; only the
    /// manifest and head pointer move.
    pub fn reset(&self, hash: Option<&str>) -> ArtResult<String> {
        let _lock = self.lock()?;

        let Some(hash) = hash else {
            self.destroy_stage()?;
            return Ok("Cleared the stage.".to_string());
        };

        let mut head = self.head()?;
        let branch = head.active.branch.clone();
        let dir = self.local_branch_dir(&branch);

        let mut manifest = store::load_branch_manifest(&dir)?;
        let position = manifest
            .commits
            .iter()
            .position(|c| c == hash)
            .ok_or_else(|| ArtError::NotFound(format!("commit {hash} on branch '{branch}'")))?;
        manifest.commits.truncate(position + 1);
        store::save_branch_manifest(&dir, &manifest)?;

        head.active.parent = Some(hash.to_string());
        head.save(&self.head_path())?;

        self.checkout_inner(&branch, true)?;

        Ok(format!("Reset branch '{branch}' to {}.", &hash[..7]))
    }

    /// Stage a deletion and remove the working-tree file if present.
    pub fn rm(&self, path: &str) -> ArtResult<String> {
        let _lock = self.lock()?;
        let mut staged = store::load_changes(&self.stage_dir())?;
        staged.insert(path.to_string(), Change::Delete);
        store::save_changes(&self.stage_dir(), &staged)?;
        self.remove_worktree_file(path)?;
        Ok(format!("Staged deletion of '{path}'."))
    }

    // -------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------

    /// Read one configuration value.
    pub fn config_get(&self, key: &str) -> ArtResult<Option<String>> {
        Ok(self.head()?.configuration.get(key).cloned())
    }

    /// Write one configuration value.
    pub fn config_set(&self, key: &str, value: &str) -> ArtResult<()> {
        let _lock = self.lock()?;
        let mut head = self.head()?;
        head.configuration
            .insert(key.to_string(), value.to_string());
        head.save(&self.head_path())
    }

    /// All configuration entries.
    pub fn config_list(&self) -> ArtResult<BTreeMap<String, String>> {
        Ok(self.head()?.configuration)
    }

    /// The configured remote slug or URL (empty when unset).
    pub fn remote_url(&self) -> ArtResult<String> {
        Ok(self.head()?.remote)
    }

    /// Record the remote slug or URL for the sync front-end.
    pub fn set_remote(&self, url: &str) -> ArtResult<()> {
        let _lock = self.lock()?;
        let mut head = self.head()?;
        head.remote = url.to_string();
        head.save(&self.head_path())
    }

    // -------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------

    fn lock(&self) -> ArtResult<RepoLock> {
        RepoLock::acquire(&self.art_dir, Self::LOCK_TIMEOUT)
    }

    fn head_path(&self) -> PathBuf {
        self.art_dir.join(HEAD_FILE)
    }

    fn stage_dir(&self) -> PathBuf {
        self.art_dir.join("stage")
    }

    fn local_branch_dir(&self, branch: &str) -> PathBuf {
        self.art_dir.join("history").join("local").join(branch)
    }

    fn remote_branch_dir(&self, branch: &str) -> PathBuf {
        self.art_dir.join("history").join("remote").join(branch)
    }

    fn destroy_stage(&self) -> ArtResult<()> {
        let dir = self.stage_dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    fn write_worktree_file(&self, rel: &str, bytes: &[u8]) -> ArtResult<()> {
        let abs = self.root.join(rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&abs, bytes)?;
        Ok(())
    }

    fn remove_worktree_file(&self, rel: &str) -> ArtResult<()> {
        let abs = self.root.join(rel);
        if abs.exists() {
            fs::remove_file(&abs)?;
        }
        if let Some(parent) = abs.parent() {
            fsutil::prune_empty_dirs(parent, &self.root);
        }
        Ok(())
    }

    /// Per-file deltas of the given working-tree files against `active`.
    ///
    /// New files become creates, edited text becomes an op script, and
    /// modifications to tracked binaries produce no entry at all. A file
    /// whose kind flipped between text and binary is restaged whole.
    fn worktree_changes(
        &self,
        files: &[(String, PathBuf)],
        active: &FileState,
    ) -> ArtResult<BTreeMap<String, Change>> {
        let mut changes = BTreeMap::new();
        for (rel, abs) in files {
            let bytes = fs::read(abs)?;
            let entry = match active.get(rel) {
                None => Some(Change::create_from_bytes(&bytes)),
                Some(Blob::Text(previous)) => {
                    if delta::is_binary(&bytes) {
                        Some(Change::create_from_bytes(&bytes))
                    } else {
                        let current = String::from_utf8_lossy(&bytes);
                        delta::compute_ops(previous, &current).map(Change::Ops)
                    }
                }
                Some(Blob::Binary(_)) => {
                    if delta::is_binary(&bytes) {
                        None
                    } else {
                        Some(Change::create_from_bytes(&bytes))
                    }
                }
            };
            if let Some(change) = entry {
                changes.insert(rel.clone(), change);
            }
        }
        Ok(changes)
    }

    /// True when a tracked file differs from or is missing in the tree.
    fn is_dirty(&self, current: &FileState) -> ArtResult<bool> {
        for (path, blob) in current {
            let abs = self.root.join(path);
            if !abs.exists() {
                return Ok(true);
            }
            let bytes = fs::read(&abs)?;
            if !blob.matches(&bytes) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn create_branch_inner(&self, name: &str) -> ArtResult<()> {
        validate_branch_name(name)?;
        let new_local = self.local_branch_dir(name);
        if new_local.exists() {
            return Err(ArtError::Conflict(format!("branch '{name}' already exists")));
        }

        let head = self.head()?;
        let src_local = self.local_branch_dir(&head.active.branch);
        let src_remote = self.remote_branch_dir(&head.active.branch);
        let manifest = store::load_branch_manifest(&src_local)?;

        fs::create_dir_all(&new_local)?;
        for hash in &manifest.commits {
            // The local history is authoritative; the remote mirror only
            // backfills masters the local side never materialized.
            let source = if src_local.join(format!("{hash}.json")).exists() {
                &src_local
            } else {
                &src_remote
            };
            let commit = Commit::load(source, hash)?;
            fs::copy(
                source.join(format!("{hash}.json")),
                new_local.join(format!("{hash}.json")),
            )?;
            for part in &commit.parts {
                let from = source.join(part);
                if from.exists() {
                    fs::copy(&from, new_local.join(part))?;
                }
            }
        }
        store::save_branch_manifest(&new_local, &manifest)?;
        store::save_branch_manifest(&self.remote_branch_dir(name), &manifest)?;
        Ok(())
    }

    fn checkout_inner(&self, branch: &str, force: bool) -> ArtResult<String> {
        if !self.local_branch_dir(branch).exists() {
            self.create_branch_inner(branch)?;
        }

        let current = self.active_state()?;
        if !force && self.is_dirty(&current)? {
            return Err(ArtError::Conflict(
                "local changes would be overwritten by checkout".to_string(),
            ));
        }

        let target_dir = self.local_branch_dir(branch);
        let manifest = store::load_branch_manifest(&target_dir)?;
        let target_parent = manifest.commits.last().cloned();
        let target = self.state_at(branch, target_parent.as_deref())?;

        for path in current.keys() {
            if !target.contains_key(path) {
                self.remove_worktree_file(path)?;
            }
        }
        for (path, blob) in &target {
            self.write_worktree_file(path, blob.bytes())?;
        }

        let mut head = self.head()?;
        head.active = ActiveBranch {
            branch: branch.to_string(),
            parent: target_parent,
        };
        head.save(&self.head_path())?;

        self.destroy_stage()?;

        Ok(format!("Switched to branch '{branch}'."))
    }
}

/// All regular files under `root`, as sorted `(relative, absolute)` pairs.
/// Never descends into the metadata directory.
fn walk_files(root: &Path) -> Vec<(String, PathBuf)> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != std::ffi::OsStr::new(ART_DIR))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(rel) = rel_path(root, entry.path()) {
            files.push((rel, entry.path().to_path_buf()));
        }
    }
    files.sort();
    files
}

/// The slash-separated path of `path` relative to `root`.
fn rel_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in rel.components() {
        let std::path::Component::Normal(part) = component else {
            continue;
        };
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(&part.to_string_lossy());
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Branch names are plain path components: no separators, no control
/// characters, and not made of dots alone.
fn validate_branch_name(name: &str) -> ArtResult<()> {
    if name.is_empty() {
        return Err(ArtError::InvalidArgument(
            "branch name must not be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ArtError::InvalidArgument(format!(
            "branch name '{name}' must not contain path separators"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(ArtError::InvalidArgument(
            "branch name must not contain control characters".to_string(),
        ));
    }
    if name.chars().all(|c| c == '.') {
        return Err(ArtError::InvalidArgument(format!(
            "'{name}' is not a valid branch name"
        )));
    }
    Ok(())
}

/// Render a millisecond timestamp in the local timezone.
fn format_local_ms(ms: u64) -> String {
    Local
        .timestamp_millis_opt(ms as i64)
        .single()
        .map(|dt| dt.format("%a %b %e %H:%M:%S %Y %z").to_string())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn init_repo() -> (TempDir, Repository) {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    fn text_of(state: &FileState, rel: &str) -> String {
        match state.get(rel) {
            Some(Blob::Text(s)) => s.clone(),
            other => panic!("expected text blob for {rel}, got {other:?}"),
        }
    }

    #[test]
    fn test_init_creates_structure() {
        let (dir, _repo) = init_repo();
        assert!(dir.path().join(".art/art.json").exists());
        assert!(dir.path().join(".art/root/manifest.json").exists());
        assert!(dir.path().join(".art/history/local/main/manifest.json").exists());
        assert!(dir.path().join(".art/history/remote/main/manifest.json").exists());
        assert!(dir.path().join(".art/cache").exists());
    }

    #[test]
    fn test_init_twice_fails() {
        let (dir, _repo) = init_repo();
        assert!(matches!(
            Repository::init(dir.path()),
            Err(ArtError::AlreadyExists)
        ));
    }

    #[test]
    fn test_open_missing_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Repository::open(dir.path()),
            Err(ArtError::NotARepo)
        ));
    }

    #[test]
    fn test_init_snapshots_existing_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("pre.txt"), "existing").unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let state = repo.state_at("main", None).unwrap();
        assert_eq!(text_of(&state, "pre.txt"), "existing");

        // Snapshotted files are clean, not untracked.
        let status = repo.status().unwrap();
        assert!(status.untracked.is_empty());
        assert!(status.modified.is_empty());
    }

    // --- Scenario: create, commit, diff clean ---

    #[test]
    fn test_create_commit_diff_clean() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");

        let added = repo.add("a.txt").unwrap();
        assert_eq!(added, "Added 1 file(s) to stage.");

        let committed = repo.commit("first").unwrap();
        assert!(committed.starts_with("[main "));
        assert!(committed.ends_with("first"));

        let diff = repo.diff().unwrap();
        assert!(diff.file_diffs.is_empty());
        assert!(diff.staged.is_empty());

        let status = repo.status().unwrap();
        assert!(status.modified.is_empty());
        assert_eq!(status.last_commit, repo.head().unwrap().active.parent);
    }

    // --- Scenario: modify, stage, commit, replay ---

    #[test]
    fn test_modify_stage_commit_replay() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        write(&dir, "a.txt", "Hello\n");
        repo.add("a.txt").unwrap();

        let staged = store::load_changes(&repo.stage_dir()).unwrap();
        assert_eq!(
            serde_json::to_value(staged.get("a.txt").unwrap()).unwrap(),
            json!([
                {"type": "delete", "position": 0, "length": 1},
                {"type": "insert", "position": 0, "content": "H"},
            ])
        );

        repo.commit("cap").unwrap();

        let head = repo.head().unwrap();
        let state = repo
            .state_at("main", head.active.parent.as_deref())
            .unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(text_of(&state, "a.txt"), "Hello\n");
    }

    // --- Scenario: branch and diverge ---

    fn diverged_repo() -> (TempDir, Repository) {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();
        write(&dir, "a.txt", "Hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("cap").unwrap();

        repo.create_branch("feature").unwrap();
        repo.checkout("feature", false).unwrap();
        write(&dir, "a.txt", "Hello World\n");
        repo.add("a.txt").unwrap();
        repo.commit("extend").unwrap();
        (dir, repo)
    }

    #[test]
    fn test_branch_and_diverge() {
        let (dir, repo) = diverged_repo();

        repo.checkout("main", false).unwrap();
        assert_eq!(read(&dir, "a.txt"), "Hello\n");
        assert_eq!(repo.log().unwrap().matches("commit ").count(), 2);

        repo.checkout("feature", false).unwrap();
        assert_eq!(read(&dir, "a.txt"), "Hello World\n");
        assert_eq!(repo.log().unwrap().matches("commit ").count(), 3);
    }

    // --- Scenario: three-way merge without conflict ---

    #[test]
    fn test_merge_fast_forward_file() {
        let (dir, repo) = diverged_repo();

        repo.checkout("main", false).unwrap();
        write(&dir, "b.txt", "B");
        repo.add("b.txt").unwrap();
        repo.commit("addB").unwrap();

        repo.checkout("feature", false).unwrap();
        repo.merge("main").unwrap();

        assert_eq!(read(&dir, "a.txt"), "Hello World\n");
        assert_eq!(read(&dir, "b.txt"), "B");

        let staged = store::load_changes(&repo.stage_dir()).unwrap();
        assert_eq!(
            staged.get("b.txt"),
            Some(&Change::Create {
                content: "B".to_string(),
                binary: false
            })
        );
        assert!(!read(&dir, "a.txt").contains("<<<<<<<"));
    }

    // --- Scenario: three-way merge with conflict ---

    #[test]
    fn test_merge_conflict_markers() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();
        write(&dir, "a.txt", "Hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("cap").unwrap();

        repo.create_branch("x").unwrap();

        write(&dir, "a.txt", "Hola\n");
        repo.add("a.txt").unwrap();
        repo.commit("spanish").unwrap();

        repo.checkout("x", false).unwrap();
        write(&dir, "a.txt", "HELLO\n");
        repo.add("a.txt").unwrap();
        repo.commit("shout").unwrap();

        let head_before = repo.head().unwrap().active.parent;
        repo.merge("main").unwrap();

        assert_eq!(
            read(&dir, "a.txt"),
            "<<<<<<< active\nHELLO\n\n=======\nHola\n\n>>>>>>> main\n"
        );

        let staged = store::load_changes(&repo.stage_dir()).unwrap();
        match staged.get("a.txt") {
            Some(Change::Create { content, binary }) => {
                assert!(!binary);
                assert_eq!(content, &read(&dir, "a.txt"));
            }
            other => panic!("expected staged create, got {other:?}"),
        }

        assert_eq!(repo.head().unwrap().active.parent, head_before);
    }

    #[test]
    fn test_merge_unknown_branch() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.merge("ghost"),
            Err(ArtError::NotFound(_))
        ));
    }

    // --- Scenario: stash and pop ---

    #[test]
    fn test_stash_and_pop() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        write(&dir, "a.txt", "hey\n");
        repo.stash().unwrap();

        assert_eq!(read(&dir, "a.txt"), "hello\n");
        let entries = repo.stash_list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "stash@{0}");

        repo.stash_pop().unwrap();
        assert_eq!(read(&dir, "a.txt"), "hey\n");
        assert!(repo.stash_list().unwrap().is_empty());
    }

    #[test]
    fn test_stash_clean_tree_is_noop() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        let message = repo.stash().unwrap();
        assert_eq!(message, "No local changes to save.");
        assert!(repo.stash_list().unwrap().is_empty());
    }

    #[test]
    fn test_stash_pop_empty_fails() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.stash_pop(),
            Err(ArtError::NotFound(_))
        ));
    }

    // --- Checkout ---

    #[test]
    fn test_checkout_dirty_tree_protection() {
        let (dir, repo) = diverged_repo();

        write(&dir, "a.txt", "dirty edit\n");
        let result = repo.checkout("main", false);
        assert!(matches!(result, Err(ArtError::Conflict(_))));

        // Forced checkout completes the transition.
        repo.checkout("main", true).unwrap();
        assert_eq!(read(&dir, "a.txt"), "Hello\n");
    }

    #[test]
    fn test_checkout_missing_tracked_file_is_dirty() {
        let (dir, repo) = diverged_repo();
        fs::remove_file(dir.path().join("a.txt")).unwrap();
        assert!(matches!(
            repo.checkout("main", false),
            Err(ArtError::Conflict(_))
        ));
    }

    #[test]
    fn test_forced_checkout_idempotent() {
        let (dir, repo) = diverged_repo();

        repo.checkout("main", true).unwrap();
        let first = read(&dir, "a.txt");
        let head_first = repo.head().unwrap().active.parent;

        repo.checkout("main", true).unwrap();
        assert_eq!(read(&dir, "a.txt"), first);
        assert_eq!(repo.head().unwrap().active.parent, head_first);
    }

    #[test]
    fn test_checkout_implicitly_creates_branch() {
        let (_dir, repo) = diverged_repo();
        repo.checkout("fresh", false).unwrap();
        assert!(repo.branches().unwrap().contains(&"fresh".to_string()));
        assert_eq!(repo.head().unwrap().active.branch, "fresh");
    }

    #[test]
    fn test_checkout_removes_files_absent_from_target() {
        let (dir, repo) = diverged_repo();

        // Commit a file only on feature.
        write(&dir, "only-feature.txt", "f\n");
        repo.add("only-feature.txt").unwrap();
        repo.commit("feature only").unwrap();

        repo.checkout("main", false).unwrap();
        assert!(!dir.path().join("only-feature.txt").exists());

        repo.checkout("feature", false).unwrap();
        assert_eq!(read(&dir, "only-feature.txt"), "f\n");
    }

    // --- Branch management ---

    #[test]
    fn test_branch_listing() {
        let (_dir, repo) = diverged_repo();
        assert_eq!(repo.branches().unwrap(), vec!["feature", "main"]);
    }

    #[test]
    fn test_branch_create_duplicate_fails() {
        let (_dir, repo) = diverged_repo();
        assert!(matches!(
            repo.create_branch("feature"),
            Err(ArtError::Conflict(_))
        ));
    }

    #[test]
    fn test_branch_copies_history() {
        let (_dir, repo) = diverged_repo();
        repo.create_branch("copy").unwrap();

        // The copy replays to the same state as its source.
        let feature_tip = repo.head().unwrap().active.parent;
        let copied = repo.state_at("copy", feature_tip.as_deref()).unwrap();
        assert_eq!(text_of(&copied, "a.txt"), "Hello World\n");
    }

    #[test]
    fn test_branch_delete() {
        let (dir, repo) = diverged_repo();
        repo.checkout("main", false).unwrap();
        repo.delete_branch("feature").unwrap();
        assert!(!dir.path().join(".art/history/local/feature").exists());
        assert!(!dir.path().join(".art/history/remote/feature").exists());
        assert!(matches!(
            repo.delete_branch("feature"),
            Err(ArtError::NotFound(_))
        ));
    }

    #[test]
    fn test_branch_delete_active_fails() {
        let (_dir, repo) = diverged_repo();
        assert!(matches!(
            repo.delete_branch("feature"),
            Err(ArtError::Conflict(_))
        ));
    }

    #[test]
    fn test_branch_name_validation() {
        let (_dir, repo) = init_repo();
        for bad in ["a/b", "a\\b", "..", ".", "has\ttab", ""] {
            assert!(
                matches!(repo.create_branch(bad), Err(ArtError::InvalidArgument(_))),
                "expected rejection for {bad:?}"
            );
        }
    }

    // --- Commit / add edge cases ---

    #[test]
    fn test_commit_empty_message_fails() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "x");
        repo.add("a.txt").unwrap();
        assert!(matches!(
            repo.commit("  "),
            Err(ArtError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_commit_empty_stage_fails() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.commit("msg"),
            Err(ArtError::NothingToCommit)
        ));
    }

    #[test]
    fn test_add_missing_path_fails() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.add("ghost.txt"),
            Err(ArtError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_unchanged_file_stages_nothing() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "same\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        let message = repo.add("a.txt").unwrap();
        assert_eq!(message, "Added 0 file(s) to stage.");
        assert!(matches!(repo.commit("noop"), Err(ArtError::NothingToCommit)));
    }

    #[test]
    fn test_add_directory_recursive() {
        let (dir, repo) = init_repo();
        write(&dir, "src/one.txt", "1");
        write(&dir, "src/nested/two.txt", "2");

        let message = repo.add("src").unwrap();
        assert_eq!(message, "Added 2 file(s) to stage.");
        repo.commit("tree").unwrap();

        let state = repo.active_state().unwrap();
        assert_eq!(text_of(&state, "src/one.txt"), "1");
        assert_eq!(text_of(&state, "src/nested/two.txt"), "2");
    }

    #[test]
    fn test_add_whole_tree_skips_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".artignore"), "*.log\n").unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        write(&dir, "keep.txt", "k");
        write(&dir, "noise.log", "n");

        let message = repo.add(".").unwrap();
        // .artignore itself was captured by the root snapshot already.
        assert_eq!(message, "Added 1 file(s) to stage.");

        let staged = store::load_changes(&repo.stage_dir()).unwrap();
        assert!(staged.contains_key("keep.txt"));
        assert!(!staged.contains_key("noise.log"));
    }

    #[test]
    fn test_binary_modifications_are_not_tracked() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("blob.bin"), b"\x00\x01\x02").unwrap();
        repo.add("blob.bin").unwrap();
        repo.commit("binary").unwrap();

        fs::write(dir.path().join("blob.bin"), b"\x00\xff\xfe").unwrap();
        let message = repo.add("blob.bin").unwrap();
        assert_eq!(message, "Added 0 file(s) to stage.");

        // Replay still returns the original bytes.
        repo.checkout("main", true).unwrap();
        assert_eq!(
            fs::read(dir.path().join("blob.bin")).unwrap(),
            b"\x00\x01\x02"
        );
    }

    #[test]
    fn test_empty_file_round_trip() {
        let (dir, repo) = init_repo();
        write(&dir, "empty.txt", "");
        repo.add("empty.txt").unwrap();
        repo.commit("empty").unwrap();

        let state = repo.active_state().unwrap();
        assert_eq!(text_of(&state, "empty.txt"), "");

        repo.rm("empty.txt").unwrap();
        repo.commit("drop empty").unwrap();
        assert!(!repo.active_state().unwrap().contains_key("empty.txt"));
    }

    // --- Status / diff ---

    #[test]
    fn test_status_classification() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".artignore"), "*.log\n").unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        write(&dir, "tracked.txt", "v1");
        repo.add("tracked.txt").unwrap();
        repo.commit("track").unwrap();

        write(&dir, "tracked.txt", "v2");
        write(&dir, "staged.txt", "s");
        repo.add("staged.txt").unwrap();
        write(&dir, "loose.txt", "l");
        write(&dir, "noise.log", "n");

        let status = repo.status().unwrap();
        assert_eq!(status.active_branch, "main");
        assert_eq!(status.staged, vec!["staged.txt"]);
        assert_eq!(status.modified, vec!["tracked.txt"]);
        assert_eq!(status.untracked, vec!["loose.txt"]);
        assert_eq!(status.ignored, vec!["noise.log"]);
    }

    #[test]
    fn test_tracked_ignored_file_not_listed_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("build.log"), "tracked before ignore").unwrap();
        Repository::init(dir.path()).unwrap();

        // The rule arrives after the file is already in the root snapshot.
        fs::write(dir.path().join(".artignore"), "*.log\n").unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        let status = repo.status().unwrap();
        assert!(status.ignored.is_empty());

        fs::write(dir.path().join("build.log"), "changed").unwrap();
        let status = repo.status().unwrap();
        assert_eq!(status.modified, vec!["build.log"]);
        assert!(status.ignored.is_empty());
    }

    #[test]
    fn test_diff_reports_changed_region() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        write(&dir, "a.txt", "Hello\n");
        let diff = repo.diff().unwrap();
        assert_eq!(diff.file_diffs.len(), 1);
        assert_eq!(diff.file_diffs[0].file, "a.txt");
        assert_eq!(diff.file_diffs[0].deleted, "h");
        assert_eq!(diff.file_diffs[0].added, "H");
    }

    #[test]
    fn test_diff_new_binary_sentinel() {
        let (dir, repo) = init_repo();
        fs::write(dir.path().join("blob.bin"), b"\x00\x01").unwrap();

        let diff = repo.diff().unwrap();
        assert_eq!(diff.file_diffs.len(), 1);
        assert_eq!(diff.file_diffs[0].added, "<Binary Data>");
        assert_eq!(diff.file_diffs[0].deleted, "");
    }

    #[test]
    fn test_diff_lists_staged_deletions() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "x");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        repo.rm("a.txt").unwrap();
        let diff = repo.diff().unwrap();
        assert_eq!(diff.staged, vec!["a.txt"]);
    }

    // --- Reset / rm ---

    #[test]
    fn test_reset_without_hash_clears_stage() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "x");
        repo.add("a.txt").unwrap();

        repo.reset(None).unwrap();
        assert!(store::load_changes(&repo.stage_dir()).unwrap().is_empty());
    }

    #[test]
    fn test_reset_moves_head_and_truncates_manifest() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "v1\n");
        repo.add("a.txt").unwrap();
        repo.commit("one").unwrap();
        let first = repo.head().unwrap().active.parent.unwrap();

        write(&dir, "a.txt", "v2\n");
        repo.add("a.txt").unwrap();
        repo.commit("two").unwrap();

        repo.reset(Some(first.as_str())).unwrap();

        let head = repo.head().unwrap();
        assert_eq!(head.active.parent.as_deref(), Some(first.as_str()));

        let manifest =
            store::load_branch_manifest(&repo.local_branch_dir("main")).unwrap();
        assert_eq!(manifest.commits.last().map(String::as_str), Some(first.as_str()));

        assert_eq!(read(&dir, "a.txt"), "v1\n");
    }

    #[test]
    fn test_reset_unknown_hash_fails() {
        let (_dir, repo) = init_repo();
        assert!(matches!(
            repo.reset(Some("deadbeef")),
            Err(ArtError::NotFound(_))
        ));
    }

    #[test]
    fn test_rm_stages_delete_and_unlinks() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "x");
        repo.add("a.txt").unwrap();
        repo.commit("first").unwrap();

        repo.rm("a.txt").unwrap();
        assert!(!dir.path().join("a.txt").exists());

        let staged = store::load_changes(&repo.stage_dir()).unwrap();
        assert_eq!(staged.get("a.txt"), Some(&Change::Delete));

        repo.commit("remove").unwrap();
        assert!(!repo.active_state().unwrap().contains_key("a.txt"));
    }

    // --- Configuration ---

    #[test]
    fn test_config_round_trip() {
        let (_dir, repo) = init_repo();
        assert!(repo.config_get("handle").unwrap().is_none());
        repo.config_set("handle", "artist").unwrap();
        assert_eq!(repo.config_get("handle").unwrap().as_deref(), Some("artist"));
        assert_eq!(repo.config_list().unwrap().len(), 1);
    }

    #[test]
    fn test_remote_round_trip() {
        let (_dir, repo) = init_repo();
        assert!(repo.remote_url().unwrap().is_empty());
        repo.set_remote("artist/project").unwrap();
        assert_eq!(repo.remote_url().unwrap(), "artist/project");
    }

    // --- Replay invariants ---

    #[test]
    fn test_replay_reproduces_each_commit() {
        let (dir, repo) = init_repo();
        let versions = ["one\n", "one\ntwo\n", "one\n2\n"];
        let mut hashes = Vec::new();

        for (i, content) in versions.iter().enumerate() {
            write(&dir, "f.txt", content);
            repo.add("f.txt").unwrap();
            repo.commit(&format!("v{i}")).unwrap();
            hashes.push(repo.head().unwrap().active.parent.unwrap());
        }

        for (hash, content) in hashes.iter().zip(versions.iter()) {
            let state = repo.state_at("main", Some(hash.as_str())).unwrap();
            assert_eq!(text_of(&state, "f.txt"), *content);
        }
    }

    #[test]
    fn test_stage_is_last_writer_wins() {
        let (dir, repo) = init_repo();
        write(&dir, "a.txt", "first");
        repo.add("a.txt").unwrap();
        write(&dir, "a.txt", "second");
        repo.add("a.txt").unwrap();

        let staged = store::load_changes(&repo.stage_dir()).unwrap();
        assert_eq!(
            staged.get("a.txt"),
            Some(&Change::Create {
                content: "second".to_string(),
                binary: false
            })
        );
    }
}

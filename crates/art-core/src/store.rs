//! Paginated manifest/part storage.
//!
//! Every persistent mapping in the repository uses the same layout: a
//! directory holding a `manifest.json` that names size-bounded part files
//! in order. The stage, stash entries, commit change sets, and the root
//! snapshot all go through this module; only the page payload differs
//! (`{"changes": {...}}` for change maps, `{"files": [...]}` for the root
//! snapshot).
//!
//! Parts are written first and the manifest last, so a reader that sees a
//! manifest sees every part it names. Manifests go through `atomic_write`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::error::ArtResult;
use crate::fsutil::atomic_write;

/// Upper bound on a part's serialized size, in bytes.
///
/// A single change whose encoding alone exceeds the bound still gets its
/// own part — one change is never split across parts.
pub const MAX_PART_SIZE: usize = 32_000_000;

/// A manifest listing part filenames in write order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PartManifest {
    pub parts: Vec<String>,
}

/// A branch's commit list, oldest to newest.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BranchManifest {
    pub commits: Vec<String>,
}

/// One file captured in the root snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootEntry {
    pub path: String,
    /// File content; base64 when `binary` is set.
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
}

/// A size-bounded page of some payload kind.
trait Page: Default + Serialize + DeserializeOwned {
    type Item;
    fn push(&mut self, item: Self::Item);
}

/// Page shape for change maps: `{"changes": {path: change}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ChangePage {
    changes: BTreeMap<String, Change>,
}

impl Page for ChangePage {
    type Item = (String, Change);
    fn push(&mut self, (path, change): Self::Item) {
        self.changes.insert(path, change);
    }
}

/// Page shape for the root snapshot: `{"files": [entry, ...]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RootPage {
    files: Vec<RootEntry>,
}

impl Page for RootPage {
    type Item = RootEntry;
    fn push(&mut self, item: Self::Item) {
        self.files.push(item);
    }
}

/// Write items into pages under `dir`, opening a new part whenever adding
/// the next item would push the current (non-empty) part past the bound.
/// Part files are named `<prefix><i>.json`; the list of names is returned
/// for the caller's manifest.
fn write_pages<P: Page>(
    dir: &Path,
    prefix: &str,
    items: Vec<(P::Item, usize)>,
) -> ArtResult<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    let mut page = P::default();
    let mut page_size = 0usize;
    let mut page_len = 0usize;

    for (item, size) in items {
        if page_len > 0 && page_size + size > MAX_PART_SIZE {
            let name = format!("{prefix}{}.json", names.len());
            write_json(&dir.join(&name), &page)?;
            names.push(name);
            page = P::default();
            page_size = 0;
            page_len = 0;
        }
        page.push(item);
        page_size += size;
        page_len += 1;
    }

    if page_len > 0 {
        let name = format!("{prefix}{}.json", names.len());
        write_json(&dir.join(&name), &page)?;
        names.push(name);
    }

    Ok(names)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> ArtResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> ArtResult<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

// ---------------------------------------------------------------------------
// Change maps (stage, stash)
// ---------------------------------------------------------------------------

/// Load a paginated change map from `dir`.
///
/// A missing directory or manifest yields an empty map, not an error: an
/// absent stage and an empty stage are the same thing.
pub fn load_changes(dir: &Path) -> ArtResult<BTreeMap<String, Change>> {
    let manifest_path = dir.join("manifest.json");
    if !manifest_path.exists() {
        return Ok(BTreeMap::new());
    }
    let manifest: PartManifest = read_json(&manifest_path)?;
    load_change_parts(dir, &manifest.parts)
}

/// Load and merge the named change-page files from `dir`.
pub fn load_change_parts(dir: &Path, parts: &[String]) -> ArtResult<BTreeMap<String, Change>> {
    let mut merged = BTreeMap::new();
    for name in parts {
        let page: ChangePage = read_json(&dir.join(name))?;
        merged.extend(page.changes);
    }
    Ok(merged)
}

/// Replace `dir` with a fresh paginated copy of `changes`.
///
/// The directory is removed recursively first; parts are written before
/// the manifest. An empty map produces a manifest with no parts.
pub fn save_changes(dir: &Path, changes: &BTreeMap<String, Change>) -> ArtResult<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;

    let items = sized_items(changes)?;
    let parts = write_pages::<ChangePage>(dir, "part.", items)?;

    let manifest = PartManifest { parts };
    atomic_write(
        &dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?.as_bytes(),
    )
}

/// Write a commit's change set as part files inside an existing branch
/// directory, named `<hash>.part.<i>.json`. Returns the part names for
/// the commit master.
pub fn write_commit_parts(
    branch_dir: &Path,
    hash: &str,
    changes: &BTreeMap<String, Change>,
) -> ArtResult<Vec<String>> {
    fs::create_dir_all(branch_dir)?;
    let items = sized_items(changes)?;
    write_pages::<ChangePage>(branch_dir, &format!("{hash}.part."), items)
}

fn sized_items(changes: &BTreeMap<String, Change>) -> ArtResult<Vec<((String, Change), usize)>> {
    changes
        .iter()
        .map(|(path, change)| {
            let size = change.encoded_size()?;
            Ok(((path.clone(), change.clone()), size))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Root snapshot
// ---------------------------------------------------------------------------

/// Write the root snapshot into `dir` as `manifest.part.<i>.json` pages
/// plus a `manifest.json` naming them.
pub fn save_root(dir: &Path, entries: Vec<RootEntry>) -> ArtResult<()> {
    fs::create_dir_all(dir)?;
    let items = entries
        .into_iter()
        .map(|entry| {
            let size = serde_json::to_string(&entry)?.len();
            Ok((entry, size))
        })
        .collect::<ArtResult<Vec<_>>>()?;
    let parts = write_pages::<RootPage>(dir, "manifest.part.", items)?;

    let manifest = PartManifest { parts };
    atomic_write(
        &dir.join("manifest.json"),
        serde_json::to_string_pretty(&manifest)?.as_bytes(),
    )
}

/// Load the root snapshot entries in their stored order.
pub fn load_root(dir: &Path) -> ArtResult<Vec<RootEntry>> {
    let manifest_path = dir.join("manifest.json");
    if !manifest_path.exists() {
        return Ok(Vec::new());
    }
    let manifest: PartManifest = read_json(&manifest_path)?;
    let mut entries = Vec::new();
    for name in &manifest.parts {
        let page: RootPage = read_json(&dir.join(name))?;
        entries.extend(page.files);
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Branch manifests
// ---------------------------------------------------------------------------

/// Load a branch's commit list; a missing manifest is an empty history.
pub fn load_branch_manifest(branch_dir: &Path) -> ArtResult<BranchManifest> {
    let path = branch_dir.join("manifest.json");
    if !path.exists() {
        return Ok(BranchManifest::default());
    }
    read_json(&path)
}

/// Persist a branch's commit list.
pub fn save_branch_manifest(branch_dir: &Path, manifest: &BranchManifest) -> ArtResult<()> {
    fs::create_dir_all(branch_dir)?;
    atomic_write(
        &branch_dir.join("manifest.json"),
        serde_json::to_string_pretty(manifest)?.as_bytes(),
    )
}

//! Three-way merge planning.
//!
//! Given the common-ancestor state, the active branch's state, and the
//! target branch's state, produce a per-file action list. The plan is
//! pure data; the repository applies it to the working tree and stage.
//!
//! A side that left a file untouched loses to the side that changed it;
//! when both sides changed a file differently, the working copy gets a
//! conflict-marked blob for the user to resolve.

use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::state::{Blob, FileState};

/// One file's outcome in a merge.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeAction {
    /// Take the target branch's version of the file.
    Write { path: String, blob: Blob },
    /// The target branch deleted the file.
    Remove { path: String },
    /// Both sides changed the file; `content` carries conflict markers.
    Conflict { path: String, content: String },
}

/// Compute the merge plan over the union of both sides' paths.
///
/// Files equal on both sides, or changed only on the active side, need
/// no action.
pub fn plan(
    base: &FileState,
    ours: &FileState,
    theirs: &FileState,
    target_branch: &str,
) -> Vec<MergeAction> {
    let paths: BTreeSet<&String> = ours.keys().chain(theirs.keys()).collect();
    let mut actions = Vec::new();

    for &path in &paths {
        let b = base.get(path);
        let o = ours.get(path);
        let t = theirs.get(path);

        if o == t {
            continue;
        }
        if b == o {
            // Only the target side moved.
            match t {
                None => actions.push(MergeAction::Remove { path: path.clone() }),
                Some(blob) => actions.push(MergeAction::Write {
                    path: path.clone(),
                    blob: blob.clone(),
                }),
            }
        } else if b == t {
            // Only our side moved; the working tree already reflects it.
            continue;
        } else {
            actions.push(MergeAction::Conflict {
                path: path.clone(),
                content: conflict_markers(o, t, target_branch),
            });
        }
    }

    actions
}

/// Render a conflict-marked blob for a file both sides changed.
pub fn conflict_markers(ours: Option<&Blob>, theirs: Option<&Blob>, target_branch: &str) -> String {
    format!(
        "<<<<<<< active\n{}\n=======\n{}\n>>>>>>> {}\n",
        side_text(ours),
        side_text(theirs),
        target_branch
    )
}

/// A side's content as marker text; a deleted side shows as empty and
/// binary content falls back to its base64 form.
fn side_text(blob: Option<&Blob>) -> String {
    match blob {
        None => String::new(),
        Some(Blob::Text(s)) => s.clone(),
        Some(Blob::Binary(bytes)) => BASE64.encode(bytes),
    }
}

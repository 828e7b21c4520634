//! Reconstructed file states.
//!
//! A state is the full file map of the working tree at some point in
//! history: the root snapshot with zero or more commit change sets
//! replayed on top. Text and binary contents are kept apart so that
//! edit scripts only ever touch text.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::change::Change;
use crate::delta;
use crate::error::{ArtError, ArtResult};
use crate::store::RootEntry;

/// The content of one file in a reconstructed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blob {
    Text(String),
    Binary(Vec<u8>),
}

impl Blob {
    /// Build a blob from raw disk bytes, classifying by NUL sniffing.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if delta::is_binary(bytes) {
            Blob::Binary(bytes.to_vec())
        } else {
            Blob::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    /// The bytes this blob materializes to on disk.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Blob::Text(s) => s.as_bytes(),
            Blob::Binary(b) => b,
        }
    }

    /// True when the on-disk bytes match this blob exactly.
    pub fn matches(&self, disk: &[u8]) -> bool {
        self.bytes() == disk
    }

    /// The root-snapshot entry capturing this blob at init time.
    pub fn to_root_entry(&self, path: String) -> RootEntry {
        match self {
            Blob::Text(s) => RootEntry {
                path,
                content: s.clone(),
                binary: false,
            },
            Blob::Binary(b) => RootEntry {
                path,
                content: BASE64.encode(b),
                binary: true,
            },
        }
    }

    /// The change entry that recreates this blob from nothing.
    pub fn to_create(&self) -> Change {
        match self {
            Blob::Text(s) => Change::Create {
                content: s.clone(),
                binary: false,
            },
            Blob::Binary(b) => Change::Create {
                content: BASE64.encode(b),
                binary: true,
            },
        }
    }
}

/// A full file map: relative path to content.
pub type FileState = BTreeMap<String, Blob>;

/// Seed a state from the root snapshot's entries.
pub fn state_from_root(entries: Vec<RootEntry>) -> ArtResult<FileState> {
    let mut state = FileState::new();
    for entry in entries {
        let blob = if entry.binary {
            let bytes = BASE64.decode(&entry.content).map_err(|e| {
                ArtError::Corrupt(format!("invalid base64 in root entry {}: {e}", entry.path))
            })?;
            Blob::Binary(bytes)
        } else {
            Blob::Text(entry.content)
        };
        state.insert(entry.path, blob);
    }
    Ok(state)
}

/// Replay one change set on top of `state`, in place.
///
/// Edit scripts apply to the file's current text (an absent or binary
/// entry replays against the empty string, matching how the script was
/// recorded).
pub fn apply_change_set(
    state: &mut FileState,
    changes: &BTreeMap<String, Change>,
) -> ArtResult<()> {
    for (path, change) in changes {
        match change {
            Change::Create { content, binary } => {
                let bytes = Change::decode_create(content, *binary)?;
                let blob = if *binary {
                    Blob::Binary(bytes)
                } else {
                    Blob::Text(String::from_utf8_lossy(&bytes).into_owned())
                };
                state.insert(path.clone(), blob);
            }
            Change::Delete => {
                state.remove(path);
            }
            Change::Ops(ops) => {
                let previous = match state.get(path) {
                    Some(Blob::Text(s)) => s.as_str(),
                    _ => "",
                };
                let next = delta::apply_ops(previous, ops)?;
                state.insert(path.clone(), Blob::Text(next));
            }
        }
    }
    Ok(())
}

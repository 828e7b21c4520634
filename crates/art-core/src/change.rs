//! Change entries — the per-file payload of commits, the stage, and stashes.
//!
//! A change is one of three variants: the file came into existence
//! (`Create`), the file was removed (`Delete`), or the file's text was
//! edited in place (`Ops`, an ordered list of character-offset edits).
//!
//! The on-disk JSON encoding is asymmetric for historical compatibility:
//! `Create` and `Delete` serialize as objects with a `type` tag, while an
//! op list serializes as a bare JSON array. The `ChangeRepr` layer below
//! accepts and produces both shapes.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{ArtError, ArtResult};

/// A single character-offset edit within a file.
///
/// Positions are UTF-8 byte offsets into the previous content and always
/// fall on character boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Op {
    /// Insert `content` at `position`.
    Insert { position: usize, content: String },
    /// Remove `length` bytes starting at `position`.
    Delete { position: usize, length: usize },
}

/// A change to a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChangeRepr", into = "ChangeRepr")]
pub enum Change {
    /// The file did not exist in the prior state. For binary files the
    /// content is base64-encoded and `binary` is set.
    Create { content: String, binary: bool },
    /// The file existed and is being removed.
    Delete,
    /// An ordered edit script applied to the prior text content.
    Ops(Vec<Op>),
}

impl Change {
    /// Build a create entry from raw file bytes, base64-encoding binary data.
    pub fn create_from_bytes(bytes: &[u8]) -> Self {
        if crate::delta::is_binary(bytes) {
            Change::Create {
                content: BASE64.encode(bytes),
                binary: true,
            }
        } else {
            Change::Create {
                content: String::from_utf8_lossy(bytes).into_owned(),
                binary: false,
            }
        }
    }

    /// Decode a create entry's content into raw file bytes.
    pub fn decode_create(content: &str, binary: bool) -> ArtResult<Vec<u8>> {
        if binary {
            BASE64
                .decode(content)
                .map_err(|e| ArtError::Corrupt(format!("invalid base64 content: {e}")))
        } else {
            Ok(content.as_bytes().to_vec())
        }
    }

    /// Byte length of this change's compact JSON encoding.
    ///
    /// Used for pagination accounting; the key is deliberately excluded.
    pub fn encoded_size(&self) -> ArtResult<usize> {
        Ok(serde_json::to_string(self)?.len())
    }
}

/// On-disk representation of a change entry.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChangeRepr {
    Tagged(TaggedChange),
    Ops(Vec<Op>),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedChange {
    Create {
        content: String,
        #[serde(default, skip_serializing_if = "is_false")]
        binary: bool,
    },
    Delete,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl From<ChangeRepr> for Change {
    fn from(repr: ChangeRepr) -> Self {
        match repr {
            ChangeRepr::Tagged(TaggedChange::Create { content, binary }) => {
                Change::Create { content, binary }
            }
            ChangeRepr::Tagged(TaggedChange::Delete) => Change::Delete,
            ChangeRepr::Ops(ops) => Change::Ops(ops),
        }
    }
}

impl From<Change> for ChangeRepr {
    fn from(change: Change) -> Self {
        match change {
            Change::Create { content, binary } => {
                ChangeRepr::Tagged(TaggedChange::Create { content, binary })
            }
            Change::Delete => ChangeRepr::Tagged(TaggedChange::Delete),
            Change::Ops(ops) => ChangeRepr::Ops(ops),
        }
    }
}

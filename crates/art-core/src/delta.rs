//! Delta computation between two versions of a text file.
//!
//! The edit script is a prefix/suffix trim: find the longest common prefix
//! and the longest common suffix (not overlapping the prefix), then emit at
//! most one delete and one insert covering the differing middle. Applying
//! the script to the old content reproduces the new content exactly.
//!
//! All offsets are UTF-8 byte positions. The trim walks whole characters,
//! so every emitted position lands on a character boundary.

use crate::change::Op;
use crate::error::{ArtError, ArtResult};

/// Returns true if the data appears to be binary (contains a NUL byte).
pub fn is_binary(data: &[u8]) -> bool {
    data.contains(&0)
}

/// Byte offsets delimiting the differing middle of two strings:
/// `(start, old_end, new_end)` with both ends exclusive.
fn trim_common(previous: &str, current: &str) -> (usize, usize, usize) {
    let mut start = 0;
    let mut prev_chars = previous.chars();
    let mut cur_chars = current.chars();
    loop {
        match (prev_chars.next(), cur_chars.next()) {
            (Some(a), Some(b)) if a == b => start += a.len_utf8(),
            _ => break,
        }
    }

    let mut old_end = previous.len();
    let mut new_end = current.len();
    let mut prev_rev = previous[start..].chars().rev();
    let mut cur_rev = current[start..].chars().rev();
    loop {
        match (prev_rev.next(), cur_rev.next()) {
            (Some(a), Some(b)) if a == b => {
                old_end -= a.len_utf8();
                new_end -= b.len_utf8();
            }
            _ => break,
        }
    }

    (start, old_end, new_end)
}

/// Compute the edit script transforming `previous` into `current`.
///
/// Returns `None` when the strings are identical. Otherwise the script is
/// at most two ops, applied in order: a delete of the differing span of
/// `previous`, then an insert of the differing span of `current`.
pub fn compute_ops(previous: &str, current: &str) -> Option<Vec<Op>> {
    let (start, old_end, new_end) = trim_common(previous, current);

    let mut ops = Vec::new();
    if old_end > start {
        ops.push(Op::Delete {
            position: start,
            length: old_end - start,
        });
    }
    if new_end > start {
        ops.push(Op::Insert {
            position: start,
            content: current[start..new_end].to_string(),
        });
    }

    if ops.is_empty() {
        None
    } else {
        Some(ops)
    }
}

/// The differing spans of two strings as `(deleted, added)` text.
///
/// Returns `None` when the strings are identical.
pub fn diff_regions(previous: &str, current: &str) -> Option<(String, String)> {
    let (start, old_end, new_end) = trim_common(previous, current);
    if old_end == start && new_end == start {
        return None;
    }
    Some((
        previous[start..old_end].to_string(),
        current[start..new_end].to_string(),
    ))
}

/// Apply an edit script to `content`, producing the new text.
///
/// Offsets recorded against a different base text are a sign of corrupted
/// history; they surface as `ArtError::Corrupt` rather than panicking.
pub fn apply_ops(content: &str, ops: &[Op]) -> ArtResult<String> {
    let mut out = content.to_string();
    for op in ops {
        match op {
            Op::Insert { position, content } => {
                if !out.is_char_boundary(*position) {
                    return Err(bad_offset("insert", *position, out.len()));
                }
                out.insert_str(*position, content);
            }
            Op::Delete { position, length } => {
                let end = position
                    .checked_add(*length)
                    .ok_or_else(|| bad_offset("delete", *position, out.len()))?;
                if !out.is_char_boundary(*position) || !out.is_char_boundary(end) {
                    return Err(bad_offset("delete", *position, out.len()));
                }
                out.replace_range(*position..end, "");
            }
        }
    }
    Ok(out)
}

fn bad_offset(kind: &str, position: usize, len: usize) -> ArtError {
    ArtError::Corrupt(format!(
        "{kind} offset {position} is invalid for content of {len} bytes"
    ))
}

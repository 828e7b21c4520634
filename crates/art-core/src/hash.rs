//! Commit hashing using SHA-1.
//!
//! A commit's identity is the hash of its serialized change set plus the
//! creation timestamp and message. Identical trees committed at different
//! moments (or with different messages) get distinct hashes.

use sha1::{Digest, Sha1};

/// Compute the SHA-1 hash of arbitrary bytes, returned as a hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex_encode(&result)
}

/// Compute a commit hash from the serialized change set, timestamp, and message.
pub fn commit_hash(changes_json: &str, timestamp: u64, message: &str) -> String {
    let payload = format!("{changes_json}{timestamp}{message}");
    hash_bytes(payload.as_bytes())
}

/// Encode raw bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

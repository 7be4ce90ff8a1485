//! Drift-detection fingerprints.
//!
//! A fingerprint is a short deterministic digest over the subset of tags a
//! role may edit. It detects local metadata drift against the last-synced
//! snapshot; it is not a security primitive.

use crate::key::can_edit;
use crate::role::Role;
use crate::TagMap;
use sha2::{Digest, Sha256};

/// Hex width of a metadata fingerprint.
const FINGERPRINT_LEN: usize = 16;

/// Hex width of a file uuid.
const FILE_UUID_LEN: usize = 4;

/// Digest the tags editable by `cardinal`.
///
/// Keys are visited in sorted order (the `TagMap` is a `BTreeMap`), so two
/// maps with the same editable entries always produce the same digest
/// regardless of how they were built. Changing any editable value changes
/// the digest; changing a non-editable value does not.
pub fn fingerprint(tags: &TagMap, cardinal: Role) -> String {
    let mut hasher = Sha256::new();

    for (key, value) in tags.iter().filter(|(k, _)| can_edit(k, cardinal)) {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }

    let digest = format!("{:x}", hasher.finalize());
    digest[..FINGERPRINT_LEN].to_string()
}

/// Stable short identifier for a file path.
///
/// A display and disambiguation aid only: it is derived from the path, so
/// renaming the file changes it.
pub fn file_uuid(path: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(path.as_bytes()));
    digest[..FILE_UUID_LEN].to_uppercase()
}

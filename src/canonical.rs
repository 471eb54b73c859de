//! Canonical serialization for deterministic signing and fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Key sets are signed over entries sorted lexicographically, so the
//!   native subsystem's return order does not affect the digest
//! - Fingerprints hash serde_json output; struct fields serialize in
//!   declaration order and Vecs in index order

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::types::ExposureKey;

/// Separator between canonical key entries.
pub const KEY_ENTRY_SEPARATOR: &str = ",";

/// Build the cleartext a key set is signed over.
///
/// Each key becomes `key.rollingStartNumber.rollingPeriod.transmissionRisk`;
/// entries are sorted and joined with `,`.
pub fn canonical_key_set(keys: &[ExposureKey]) -> String {
    let mut entries: Vec<String> = keys.iter().map(ExposureKey::canonical_entry).collect();
    entries.sort();
    entries.join(KEY_ENTRY_SEPARATOR)
}

/// Serialize a value to canonical JSON bytes.
///
/// Serialization of the crate's own types cannot fail; a failure here
/// yields an empty buffer rather than a panic.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

/// Log-safe fingerprint of a key set.
///
/// Independent of input order, like the signed cleartext.
pub fn key_set_fingerprint(keys: &[ExposureKey]) -> String {
    canonical_hash_hex(&canonical_key_set(keys))
}

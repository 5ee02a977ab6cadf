//! SHA-256 hashing helpers.
//!
//! Mirrors `assay_evidence::mandate::id::compute_mandate_id`'s use of
//! `sha2::Sha256` + `hex::encode`, minus the `"sha256:"` prefix convention
//! (this spec's self-identifiers are bare lowercase hex, per `spec.md` §3).

use sha2::{Digest, Sha256};

/// SHA-256 of `bytes`, returned as 64 lowercase hex characters.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of `bytes`, returned as 32 raw bytes.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

//! Verifies a snapshot artifact (`spec.md` §4.6).
//!
//! Grounded on `internal/policylock/policylock.go`'s `VerifySnapshotZip`
//! and `ReadSnapshotInfo`/`ShowSnapshot`: a fail-fast chain where the
//! first failing check determines the returned reason.

use crate::archive::read_deterministic_zip;
use crate::hash::sha256_hex;
use crate::sign_payload::snapshot_sign_payload;
use crate::types::PolicySnapshot;
use serde::{Deserialize, Serialize};

/// Outcome of verifying a snapshot artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyStatus {
    Valid,
    Invalid,
}

/// `(status, reason)` pair; `reason` is empty for `Valid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub status: VerifyStatus,
    pub reason: &'static str,
}

impl VerifyResult {
    fn invalid(reason: &'static str) -> Self {
        Self {
            status: VerifyStatus::Invalid,
            reason,
        }
    }

    fn valid() -> Self {
        Self {
            status: VerifyStatus::Valid,
            reason: "",
        }
    }

    /// Suggested exit code for an embedding CLI (not built by this crate).
    pub fn exit_code(&self) -> i32 {
        match self.status {
            VerifyStatus::Valid => 0,
            VerifyStatus::Invalid => match self.reason {
                "zip_slip_path" => 3,
                _ => 1,
            },
        }
    }
}

/// Verify a snapshot archive's internal integrity (`spec.md` §4.6 steps 1-6).
pub fn verify_snapshot_zip(archive_bytes: &[u8]) -> VerifyResult {
    let entries = match read_deterministic_zip(archive_bytes) {
        Ok(entries) => entries,
        Err(crate::error::ArchiveError::PathUnsafe(_)) => {
            tracing::warn!("snapshot verify: zip_slip_path");
            return VerifyResult::invalid("zip_slip_path");
        }
        Err(err) => {
            tracing::debug!(%err, "snapshot verify: archive did not parse");
            return VerifyResult::invalid("missing_required_files");
        }
    };

    let (Some(snap_json), Some(body)) = (
        entries.get("policy_snapshot.json"),
        entries.get("policy_body.bin"),
    ) else {
        tracing::debug!("snapshot verify: missing required entries");
        return VerifyResult::invalid("missing_required_files");
    };

    let snap: PolicySnapshot = match serde_json::from_slice(snap_json) {
        Ok(s) => s,
        Err(err) => {
            tracing::debug!(%err, "snapshot verify: policy_snapshot.json did not parse");
            return VerifyResult::invalid("invalid_policy_snapshot_json");
        }
    };

    let body_hash = sha256_hex(body);
    match snap.policy.bytes.hashes.get("sha2-256") {
        Some(declared) if declared == &body_hash => {}
        _ => {
            tracing::warn!(
                snapshot_id = %snap.snapshot_id,
                "snapshot verify: policy body hash mismatch"
            );
            return VerifyResult::invalid("policy_body_hash_mismatch");
        }
    }

    let payload = snapshot_sign_payload(&snap);
    let payload_bytes = match crate::canon::to_vec(&payload) {
        Ok(b) => b,
        Err(err) => {
            tracing::debug!(%err, "snapshot verify: canonicalization failed");
            return VerifyResult::invalid("canonicalization_failed");
        }
    };
    let expected_id = sha256_hex(&payload_bytes);
    if snap.snapshot_id != expected_id {
        tracing::warn!(
            claimed = %snap.snapshot_id,
            computed = %expected_id,
            "snapshot verify: snapshot_id mismatch"
        );
        return VerifyResult::invalid("snapshot_id_mismatch");
    }

    tracing::debug!(snapshot_id = %snap.snapshot_id, "snapshot verify: valid");
    VerifyResult::valid()
}

/// A human-readable summary of a verified snapshot, mirroring Go's
/// `ShowSnapshot` — a data return rather than a formatted string, since
/// text rendering is a CLI-layer concern this crate does not build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSnapshotInfo {
    pub schema: String,
    pub created_at_utc: String,
    pub snapshot_id: String,
    pub policy_sha256: String,
    pub input_file: Option<String>,
    pub input_url: Option<String>,
}

/// Read snapshot metadata out of an archive without re-verifying its
/// integrity (the caller is expected to have called
/// [`verify_snapshot_zip`] first, per `spec.md` §4.7's "verified before
/// use" rule).
pub fn read_snapshot_info(archive_bytes: &[u8]) -> Result<VerifiedSnapshotInfo, crate::error::ArchiveError> {
    let entries = read_deterministic_zip(archive_bytes)?;
    let snap_json = entries
        .get("policy_snapshot.json")
        .ok_or_else(|| crate::error::ArchiveError::InvalidEntryName("policy_snapshot.json".to_string()))?;
    let body = entries
        .get("policy_body.bin")
        .ok_or_else(|| crate::error::ArchiveError::InvalidEntryName("policy_body.bin".to_string()))?;
    let snap: PolicySnapshot = serde_json::from_slice(snap_json)
        .map_err(|e| crate::error::ArchiveError::InvalidEntryName(e.to_string()))?;
    Ok(VerifiedSnapshotInfo {
        schema: snap.schema,
        created_at_utc: snap.created_at_utc,
        snapshot_id: snap.snapshot_id,
        policy_sha256: sha256_hex(body),
        input_file: if snap.policy.input.mode == "file" {
            snap.policy.input.path
        } else {
            None
        },
        input_url: if snap.policy.input.mode == "url" {
            snap.policy.input.url
        } else {
            None
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{snapshot_from_stdin, SnapshotOptions};
    use std::io::Cursor;

    fn opts() -> SnapshotOptions {
        SnapshotOptions {
            created_at_utc: Some("2026-01-01T00:00:00Z".to_string()),
            tool_version: "policyguardian/v0.1.0-test".to_string(),
            user_agent: Some("policyguardian/v0.1.0-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_snapshot_verifies() {
        let snap = snapshot_from_stdin(Cursor::new(b"hello"), &opts()).unwrap();
        let result = verify_snapshot_zip(&snap.archive_bytes);
        assert_eq!(result, VerifyResult::valid());
    }

    #[test]
    fn flipping_a_byte_is_detected() {
        let snap = snapshot_from_stdin(Cursor::new(b"hello"), &opts()).unwrap();
        let mut tampered = snap.archive_bytes.clone();
        let mid = tampered.len() / 2;
        tampered[mid] ^= 0xFF;
        let result = verify_snapshot_zip(&tampered);
        assert_eq!(result.status, VerifyStatus::Invalid);
    }

    #[test]
    fn missing_entries_are_rejected() {
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("only_one.txt".to_string(), b"x".to_vec());
        let zip = crate::archive::write_deterministic_zip(&entries).unwrap();
        let result = verify_snapshot_zip(&zip);
        assert_eq!(result, VerifyResult::invalid("missing_required_files"));
    }

    #[test]
    fn tampered_body_is_hash_mismatch() {
        let snap = snapshot_from_stdin(Cursor::new(b"hello"), &opts()).unwrap();
        let mut entries = read_deterministic_zip(&snap.archive_bytes).unwrap();
        entries.insert("policy_body.bin".to_string(), b"goodbye".to_vec());
        let tampered = crate::archive::write_deterministic_zip(&entries).unwrap();
        let result = verify_snapshot_zip(&tampered);
        assert_eq!(result, VerifyResult::invalid("policy_body_hash_mismatch"));
    }

    #[test]
    fn read_snapshot_info_reports_expected_fields() {
        let snap = snapshot_from_stdin(Cursor::new(b"hello"), &opts()).unwrap();
        let info = read_snapshot_info(&snap.archive_bytes).unwrap();
        assert_eq!(info.snapshot_id, snap.record.snapshot_id);
        assert_eq!(info.input_file, None);
        assert_eq!(info.input_url, None);
    }
}

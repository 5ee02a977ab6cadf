//! Verifies a consent event and its optional Ed25519 signature envelope
//! (`spec.md` §4.8).
//!
//! Grounded on `internal/consentguardian/consent.go`'s `VerifyConsent`
//! and `VerifyConsentFile`: integrity check first, then optional
//! snapshot-store resolution (degrading to `PARTIAL`, never `INVALID`),
//! then optional signature-envelope verification with a dedicated reason
//! per failure mode.

use crate::sign_payload::consent_sign_payload;
use crate::store::StoreConfig;
use crate::types::{ConsentEvent, SignatureEnvelope, SCHEMA_CONSENT_EVENT, SCHEMA_SIGNATURE_ENVELOPE};
use ed25519_dalek::{Verifier, VerifyingKey};

/// Outcome of verifying a consent event (`spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStatus {
    Valid,
    Partial,
    Invalid,
}

/// `(status, reason, unsigned_warning)`; `reason` is empty for `Valid`
/// unless an unsigned warning applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentVerifyResult {
    pub status: VerifyStatus,
    pub reason: &'static str,
    pub unsigned_warning: bool,
}

impl ConsentVerifyResult {
    fn invalid(reason: &'static str) -> Self {
        Self {
            status: VerifyStatus::Invalid,
            reason,
            unsigned_warning: false,
        }
    }

    /// Suggested exit code for an embedding CLI (not built by this crate).
    pub fn exit_code(&self) -> i32 {
        match self.status {
            VerifyStatus::Valid => 0,
            VerifyStatus::Partial => 2,
            VerifyStatus::Invalid => match self.reason {
                "signature_missing" => 3,
                "signature_verify_failed" | "invalid_signature" | "invalid_public_key" => 4,
                _ => 1,
            },
        }
    }
}

/// Verify a consent event's bytes against its own declared hash, with
/// optional signature-envelope verification and optional snapshot-store
/// resolution.
///
/// `resolve_snapshot_store`: when `Some(store)`, an event whose
/// `policy.snapshot_id` cannot be found in `store` downgrades the
/// otherwise-`Valid` result to `Partial` with reason `snapshot_missing`,
/// rather than failing outright — the event's own integrity still holds.
pub fn verify_consent(
    consent_json: &[u8],
    resolve_snapshot_store: Option<&StoreConfig>,
    signature_envelope: Option<&[u8]>,
) -> ConsentVerifyResult {
    tracing::debug!(bytes = consent_json.len(), "consent verify: starting");
    let event: ConsentEvent = match serde_json::from_slice(consent_json) {
        Ok(e) => e,
        Err(err) => {
            tracing::debug!(%err, "consent verify: event did not parse as JSON");
            return ConsentVerifyResult::invalid("invalid_json");
        }
    };
    if event.schema != SCHEMA_CONSENT_EVENT {
        tracing::warn!(schema = %event.schema, "consent verify: unexpected schema");
        return ConsentVerifyResult::invalid("wrong_schema");
    }

    let payload = consent_sign_payload(&event);
    let payload_bytes = match crate::canon::to_vec(&payload) {
        Ok(b) => b,
        Err(_) => return ConsentVerifyResult::invalid("jcs_error"),
    };
    let expected_hash = crate::hash::sha256_hex(&payload_bytes);

    let claimed = match event.hashes.get("sha2-256") {
        None if event.hashes.is_empty() => return ConsentVerifyResult::invalid("missing_hashes"),
        None => return ConsentVerifyResult::invalid("missing_sha2_256"),
        Some(h) if h.is_empty() => return ConsentVerifyResult::invalid("missing_sha2_256"),
        Some(h) => h,
    };
    if claimed != &expected_hash {
        tracing::warn!(
            claimed, computed = %expected_hash,
            "consent verify: payload hash mismatch"
        );
        return ConsentVerifyResult::invalid("hash_mismatch");
    }
    if !event.consent_event_id.is_empty() && event.consent_event_id != expected_hash {
        tracing::warn!("consent verify: consent_event_id mismatch");
        return ConsentVerifyResult::invalid("consent_event_id_mismatch");
    }

    let mut status = VerifyStatus::Valid;
    let mut reason = "";
    if let Some(store) = resolve_snapshot_store {
        let snapshot_path = store.snapshot_path(&event.policy.snapshot_id);
        if !snapshot_path.is_file() {
            tracing::debug!(
                snapshot_id = %event.policy.snapshot_id,
                "consent verify: referenced snapshot not found in store"
            );
            status = VerifyStatus::Partial;
            reason = "snapshot_missing";
        }
    }

    match &event.signing {
        None => ConsentVerifyResult {
            status,
            reason,
            unsigned_warning: true,
        },
        Some(signing) if signing.mode == "none" => ConsentVerifyResult {
            status,
            reason,
            unsigned_warning: true,
        },
        Some(signing) if signing.mode == "ed25519" => {
            let Some(sig_bytes) = signature_envelope else {
                tracing::debug!("consent verify: mode=ed25519 but no signature envelope supplied");
                return ConsentVerifyResult::invalid("signature_missing");
            };
            let envelope: SignatureEnvelope = match serde_json::from_slice(sig_bytes) {
                Ok(e) => e,
                Err(_) => return ConsentVerifyResult::invalid("invalid_signature_json"),
            };
            if envelope.schema != SCHEMA_SIGNATURE_ENVELOPE {
                return ConsentVerifyResult::invalid("wrong_signature_schema");
            }
            if envelope.algorithm != "ed25519" {
                return ConsentVerifyResult::invalid("wrong_signature_algorithm");
            }
            let envelope_hash = match envelope.payload_hashes.get("sha2-256") {
                Some(h) if !h.is_empty() => h,
                _ => return ConsentVerifyResult::invalid("missing_signature_payload_hash"),
            };
            if envelope_hash != &expected_hash {
                return ConsentVerifyResult::invalid("signature_payload_hash_mismatch");
            }
            let pub_bytes = match hex::decode(envelope.public_key.trim()) {
                Ok(b) if b.len() == 32 => b,
                _ => return ConsentVerifyResult::invalid("invalid_public_key"),
            };
            let sig_raw = match hex::decode(envelope.signature.trim()) {
                Ok(b) if b.len() == 64 => b,
                _ => return ConsentVerifyResult::invalid("invalid_signature"),
            };
            let mut pub_arr = [0u8; 32];
            pub_arr.copy_from_slice(&pub_bytes);
            let Ok(verifying_key) = VerifyingKey::from_bytes(&pub_arr) else {
                return ConsentVerifyResult::invalid("invalid_public_key");
            };
            let mut sig_arr = [0u8; 64];
            sig_arr.copy_from_slice(&sig_raw);
            let signature = ed25519_dalek::Signature::from_bytes(&sig_arr);
            if verifying_key.verify(&payload_bytes, &signature).is_err() {
                tracing::warn!("consent verify: ed25519 signature verification failed");
                return ConsentVerifyResult::invalid("signature_verify_failed");
            }
            tracing::debug!(consent_event_id = %expected_hash, "consent verify: signature valid");
            ConsentVerifyResult {
                status,
                reason,
                unsigned_warning: false,
            }
        }
        Some(_) => ConsentVerifyResult::invalid("unsupported_signing_mode"),
    }
}

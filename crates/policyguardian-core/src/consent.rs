//! Builds (and optionally Ed25519-signs) a consent event against a
//! verified snapshot (`spec.md` §4.7).
//!
//! Grounded on `internal/consentguardian/consent.go`'s `RecordConsent`,
//! `SubjectIDHash`/`normalizeIdentifier`, and `resolveSnapshot`. Signing
//! is raw Ed25519 over the canonical signing-payload bytes — not a DSSE
//! Pre-Authentication-Encoding wrapper like
//! `assay_evidence::mandate::signing` uses for mandates — because that
//! is what `consent.go`'s `ed25519.Sign(priv, signBytes)` call actually
//! signs.

use crate::error::BuildError;
use crate::hash::sha256_hex;
use crate::sign_payload::consent_sign_payload;
use crate::snapshot_verify::{verify_snapshot_zip, VerifyStatus};
use crate::store::StoreConfig;
use crate::timefmt;
use crate::types::{
    ConsentEvent, PolicyRef, SignatureEnvelope, SigningInfo, SubjectRef, SCHEMA_CONSENT_EVENT,
    SCHEMA_SIGNATURE_ENVELOPE, SPEC_URL_POLICY_GUARDIAN,
};
use ed25519_dalek::{Signer, SigningKey};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Construction-time options for [`record_consent`].
#[derive(Debug, Clone, Default)]
pub struct RecordOptions {
    pub created_at_utc: Option<String>,
    pub subject_identifier: String,
    pub tenant_salt_hex: String,
    pub pepper_hex: String,
    pub context: BTreeMap<String, String>,
    pub evidence: BTreeMap<String, String>,
    /// 64-byte Ed25519 private key (seed || public), hex-encoded.
    pub sign_priv_key_hex: Option<String>,
    pub key_description: Option<String>,
    pub legal_entity_name: Option<String>,
}

/// The built event, plus an Ed25519 sidecar envelope when signed.
#[derive(Debug)]
pub struct RecordedConsent {
    pub event: ConsentEvent,
    pub envelope: Option<SignatureEnvelope>,
}

/// Normalize a subject identifier: trim ASCII whitespace, then lowercase
/// every Unicode scalar. Mirrors Go's `normalizeIdentifier`.
pub fn normalize_identifier(s: &str) -> Result<String, BuildError> {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty() {
        return Err(BuildError::InvalidInputInvariants(
            "empty identifier".to_string(),
        ));
    }
    Ok(trimmed.chars().flat_map(char::to_lowercase).collect())
}

/// `SHA256(pepper || tenant_salt || utf8(normalize(identifier)))`.
pub fn subject_id_hash(identifier: &str, pepper_hex: &str, salt_hex: &str) -> Result<String, BuildError> {
    let normalized = normalize_identifier(identifier)?;
    let pepper = hex::decode(pepper_hex.trim())
        .map_err(|_| BuildError::InvalidHex("pepper".to_string()))?;
    let salt = hex::decode(salt_hex.trim())
        .map_err(|_| BuildError::InvalidHex("tenant_salt".to_string()))?;
    let mut msg = Vec::with_capacity(pepper.len() + salt.len() + normalized.len());
    msg.extend_from_slice(&pepper);
    msg.extend_from_slice(&salt);
    msg.extend_from_slice(normalized.as_bytes());
    Ok(sha256_hex(&msg))
}

struct ResolvedSnapshot {
    archive_bytes: Vec<u8>,
    snapshot_id: String,
    policy_sha256: String,
}

fn resolve_snapshot(arg: &str, store: &StoreConfig) -> Result<ResolvedSnapshot, BuildError> {
    let path = Path::new(arg);
    let candidate: PathBuf = if path.is_file() {
        path.to_path_buf()
    } else {
        store.snapshot_path(arg)
    };

    let bytes = std::fs::read(&candidate)
        .map_err(|_| BuildError::InputNotFound(arg.to_string()))?;
    let result = verify_snapshot_zip(&bytes);
    if result.status != VerifyStatus::Valid {
        tracing::warn!(
            path = %candidate.display(),
            reason = result.reason,
            "consent: referenced snapshot failed verification"
        );
        return Err(BuildError::InvalidInputInvariants(format!(
            "snapshot invalid: {}",
            result.reason
        )));
    }
    let info = crate::snapshot_verify::read_snapshot_info(&bytes)?;
    Ok(ResolvedSnapshot {
        policy_sha256: info.policy_sha256,
        snapshot_id: info.snapshot_id,
        archive_bytes: bytes,
    })
}

/// Build (and optionally sign) a consent event against a snapshot
/// identified either by filesystem path or by content-addressed ID in
/// `store`.
pub fn record_consent(
    snapshot_zip_path_or_id: &str,
    store: &StoreConfig,
    opts: &RecordOptions,
) -> Result<RecordedConsent, BuildError> {
    let created = match &opts.created_at_utc {
        Some(s) => {
            timefmt::parse(s)?;
            s.clone()
        }
        None => timefmt::now_utc_formatted(),
    };

    let resolved = resolve_snapshot(snapshot_zip_path_or_id, store)?;
    let pack_sha256 = sha256_hex(&resolved.archive_bytes);
    let subject_hash = subject_id_hash(&opts.subject_identifier, &opts.pepper_hex, &opts.tenant_salt_hex)?;

    let mut event = ConsentEvent {
        schema: SCHEMA_CONSENT_EVENT.to_string(),
        spec_url: SPEC_URL_POLICY_GUARDIAN.to_string(),
        created_at_utc: created,
        hashes: BTreeMap::new(),
        consent_event_id: String::new(),
        policy: PolicyRef {
            policy_sha256: resolved.policy_sha256,
            snapshot_id: resolved.snapshot_id,
            snapshot_pack_sha256: pack_sha256,
        },
        subject: SubjectRef {
            subject_id_hash: subject_hash,
            hash_algorithm: "sha2-256".to_string(),
        },
        context: opts.context.clone(),
        evidence: opts.evidence.clone(),
        signing: None,
    };

    let payload = consent_sign_payload(&event);
    let payload_bytes = crate::canon::to_vec(&payload)?;
    let event_hash = sha256_hex(&payload_bytes);
    event.hashes.insert("sha2-256".to_string(), event_hash.clone());
    event.consent_event_id = event_hash.clone();
    tracing::debug!(consent_event_id = %event_hash, "consent: recorded");

    let envelope = match &opts.sign_priv_key_hex {
        Some(key_hex) => {
            let key_bytes = hex::decode(key_hex.trim())
                .map_err(|_| BuildError::InvalidHex("ed25519 private key".to_string()))?;
            if key_bytes.len() != 64 {
                return Err(BuildError::InvalidKeyLength {
                    expected: 64,
                    got: key_bytes.len(),
                });
            }
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&key_bytes[..32]);
            let signing_key = SigningKey::from_bytes(&seed);
            let public_key_hex = hex::encode(signing_key.verifying_key().to_bytes());
            let signature = signing_key.sign(&payload_bytes);

            let mut payload_hashes = BTreeMap::new();
            payload_hashes.insert("sha2-256".to_string(), event_hash.clone());
            let signature_file = format!("{}.sig.ed25519.json", filename_stem(snapshot_zip_path_or_id));

            event.signing = Some(SigningInfo {
                mode: "ed25519".to_string(),
                algorithm: Some("ed25519".to_string()),
                public_key: Some(public_key_hex.clone()),
                key_description: opts.key_description.clone(),
                legal_entity_name: opts.legal_entity_name.clone(),
                signature_file: Some(signature_file),
            });

            Some(SignatureEnvelope {
                schema: SCHEMA_SIGNATURE_ENVELOPE.to_string(),
                algorithm: "ed25519".to_string(),
                public_key: public_key_hex,
                signature: hex::encode(signature.to_bytes()),
                payload_hashes,
            })
        }
        None => {
            event.signing = Some(SigningInfo {
                mode: "none".to_string(),
                ..Default::default()
            });
            None
        }
    };

    Ok(RecordedConsent { event, envelope })
}

fn filename_stem(path_or_id: &str) -> &str {
    Path::new(path_or_id)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path_or_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{snapshot_from_stdin, SnapshotOptions};
    use ed25519_dalek::SigningKey;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn write_snapshot(dir: &TempDir) -> PathBuf {
        let snap = snapshot_from_stdin(
            Cursor::new(b"hello"),
            &SnapshotOptions {
                created_at_utc: Some("2026-01-01T00:00:00Z".to_string()),
                tool_version: "policyguardian/v0.1.0-test".to_string(),
                user_agent: Some("policyguardian/v0.1.0-test".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        let path = dir.path().join("snap.zip");
        std::fs::write(&path, &snap.archive_bytes).unwrap();
        path
    }

    fn base_opts() -> RecordOptions {
        RecordOptions {
            created_at_utc: Some("2026-01-01T00:00:00Z".to_string()),
            subject_identifier: "  ALICE@Example.com  ".to_string(),
            tenant_salt_hex: "00".to_string(),
            pepper_hex: "ff".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn self_identifier_law_holds() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(&dir);
        let store = StoreConfig::new(dir.path());
        let recorded = record_consent(path.to_str().unwrap(), &store, &base_opts()).unwrap();
        let payload = consent_sign_payload(&recorded.event);
        let expected = sha256_hex(&crate::canon::to_vec(&payload).unwrap());
        assert_eq!(recorded.event.hashes["sha2-256"], expected);
        assert_eq!(recorded.event.consent_event_id, expected);
    }

    #[test]
    fn subject_hash_is_normalization_invariant() {
        let a = subject_id_hash("  ALICE@Example.com  ", "ff", "00").unwrap();
        let b = subject_id_hash("alice@example.com", "ff", "00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_identifier_is_rejected() {
        assert!(normalize_identifier("   ").is_err());
    }

    #[test]
    fn unsigned_consent_has_mode_none() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(&dir);
        let store = StoreConfig::new(dir.path());
        let recorded = record_consent(path.to_str().unwrap(), &store, &base_opts()).unwrap();
        assert_eq!(recorded.event.signing.unwrap().mode, "none");
        assert!(recorded.envelope.is_none());
    }

    #[test]
    fn signed_consent_verifies_against_envelope() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(&dir);
        let store = StoreConfig::new(dir.path());
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let mut priv_bytes = Vec::new();
        priv_bytes.extend_from_slice(&signing_key.to_bytes());
        priv_bytes.extend_from_slice(&signing_key.verifying_key().to_bytes());

        let mut opts = base_opts();
        opts.sign_priv_key_hex = Some(hex::encode(priv_bytes));
        let recorded = record_consent(path.to_str().unwrap(), &store, &opts).unwrap();

        let envelope = recorded.envelope.unwrap();
        assert_eq!(envelope.algorithm, "ed25519");
        assert_eq!(recorded.event.signing.unwrap().mode, "ed25519");
    }

    #[test]
    fn missing_snapshot_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = StoreConfig::new(dir.path());
        let err = record_consent("does-not-exist", &store, &base_opts()).unwrap_err();
        assert_eq!(err.reason(), "input_not_found");
    }

    #[test]
    fn context_and_evidence_are_carried_through() {
        let dir = TempDir::new().unwrap();
        let path = write_snapshot(&dir);
        let store = StoreConfig::new(dir.path());
        let mut opts = base_opts();
        opts.context.insert("purpose".to_string(), "marketing".to_string());
        let recorded = record_consent(path.to_str().unwrap(), &store, &opts).unwrap();
        assert_eq!(recorded.event.context.get("purpose"), Some(&"marketing".to_string()));
    }
}

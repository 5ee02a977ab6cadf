//! Tamper-detection tests proving the integrity checks actually detect
//! changes, not just "green because self-fulfilling".

use ed25519_dalek::SigningKey;
use policyguardian_core::consent_verify::{verify_consent, VerifyStatus as ConsentVerifyStatus};
use policyguardian_core::snapshot_verify::{verify_snapshot_zip, VerifyStatus as SnapshotVerifyStatus};
use policyguardian_core::{record_consent, snapshot_from_stdin, RecordOptions, SnapshotOptions, StoreConfig};
use std::io::Cursor;
use tempfile::TempDir;

fn fixed_opts() -> SnapshotOptions {
    SnapshotOptions {
        created_at_utc: Some("2026-01-01T00:00:00Z".to_string()),
        tool_version: "policyguardian/v0.1.0-test".to_string(),
        user_agent: Some("policyguardian/v0.1.0-test".to_string()),
        ..Default::default()
    }
}

/// Proves: flipping a single byte anywhere in a snapshot archive is
/// detected, not silently accepted.
#[test]
fn flipping_one_byte_breaks_snapshot_verification() {
    let snap = snapshot_from_stdin(Cursor::new(b"hello"), &fixed_opts()).unwrap();

    // Sanity: the untampered archive must verify first, or this test proves nothing.
    let original = verify_snapshot_zip(&snap.archive_bytes);
    assert_eq!(original.status, SnapshotVerifyStatus::Valid);

    for offset in [0, snap.archive_bytes.len() / 4, snap.archive_bytes.len() / 2, snap.archive_bytes.len() - 1] {
        let mut tampered = snap.archive_bytes.clone();
        tampered[offset] ^= 0x01;
        let result = verify_snapshot_zip(&tampered);
        assert_eq!(
            result.status,
            SnapshotVerifyStatus::Invalid,
            "byte flip at offset {offset} was not detected"
        );
    }
}

/// Proves: changing a single character inside the consent event's JSON
/// changes its hash, so tampering is caught by `verify_consent`.
#[test]
fn tampered_consent_event_fails_hash_check() {
    let dir = TempDir::new().unwrap();
    let snap = snapshot_from_stdin(Cursor::new(b"hello"), &fixed_opts()).unwrap();
    let path = dir.path().join("snap.zip");
    std::fs::write(&path, &snap.archive_bytes).unwrap();
    let store = StoreConfig::new(dir.path());

    let recorded = record_consent(
        path.to_str().unwrap(),
        &store,
        &RecordOptions {
            created_at_utc: Some("2026-01-01T00:00:00Z".to_string()),
            subject_identifier: "alice@example.com".to_string(),
            tenant_salt_hex: "00".to_string(),
            pepper_hex: "ff".to_string(),
            ..Default::default()
        },
    )
    .unwrap();

    let original_json = serde_json::to_vec(&recorded.event).unwrap();
    let original = verify_consent(&original_json, None, None);
    assert_eq!(original.status, ConsentVerifyStatus::Valid);

    let mut tampered_event = recorded.event.clone();
    tampered_event.context.insert("purpose".to_string(), "marketing".to_string());
    let tampered_json = serde_json::to_vec(&tampered_event).unwrap();

    let result = verify_consent(&tampered_json, None, None);
    assert_eq!(result.status, ConsentVerifyStatus::Invalid);
    assert_eq!(result.reason, "hash_mismatch");
}

/// Proves: flipping a bit in an Ed25519 signature breaks verification,
/// and a signature produced under a different key also fails.
#[test]
fn flipped_signature_bit_and_wrong_key_both_fail() {
    let dir = TempDir::new().unwrap();
    let snap = snapshot_from_stdin(Cursor::new(b"hello"), &fixed_opts()).unwrap();
    let path = dir.path().join("snap.zip");
    std::fs::write(&path, &snap.archive_bytes).unwrap();
    let store = StoreConfig::new(dir.path());

    let signing_key = SigningKey::from_bytes(&[3u8; 32]);
    let mut priv_bytes = signing_key.to_bytes().to_vec();
    priv_bytes.extend_from_slice(&signing_key.verifying_key().to_bytes());

    let recorded = record_consent(
        path.to_str().unwrap(),
        &store,
        &RecordOptions {
            created_at_utc: Some("2026-01-01T00:00:00Z".to_string()),
            subject_identifier: "alice@example.com".to_string(),
            tenant_salt_hex: "00".to_string(),
            pepper_hex: "ff".to_string(),
            sign_priv_key_hex: Some(hex::encode(priv_bytes)),
            ..Default::default()
        },
    )
    .unwrap();
    let event_json = serde_json::to_vec(&recorded.event).unwrap();

    // Sanity: valid signature verifies first.
    let envelope_json = serde_json::to_vec(recorded.envelope.as_ref().unwrap()).unwrap();
    let original = verify_consent(&event_json, None, Some(&envelope_json));
    assert_eq!(original.status, ConsentVerifyStatus::Valid);

    let mut flipped = recorded.envelope.clone().unwrap();
    let mut sig_bytes = hex::decode(&flipped.signature).unwrap();
    sig_bytes[10] ^= 0x01;
    flipped.signature = hex::encode(sig_bytes);
    let flipped_json = serde_json::to_vec(&flipped).unwrap();
    let result = verify_consent(&event_json, None, Some(&flipped_json));
    assert_eq!(result.status, ConsentVerifyStatus::Invalid);
    assert_eq!(result.reason, "signature_verify_failed");

    let wrong_key = SigningKey::from_bytes(&[4u8; 32]);
    let mut wrong_envelope = recorded.envelope.unwrap();
    wrong_envelope.public_key = hex::encode(wrong_key.verifying_key().to_bytes());
    let wrong_key_json = serde_json::to_vec(&wrong_envelope).unwrap();
    let result = verify_consent(&event_json, None, Some(&wrong_key_json));
    assert_eq!(result.status, ConsentVerifyStatus::Invalid);
}

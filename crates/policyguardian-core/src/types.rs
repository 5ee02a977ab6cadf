//! Display data model for policy snapshots and consent events.
//!
//! These types are the *display* documents — serialized with `serde_json`
//! for human/file consumption (`policy_snapshot.json`, the consent event
//! file, the signature sidecar). They are deliberately not what gets
//! hashed: [`crate::sign_payload`] builds the narrower signing-payload
//! projection straight from these structs. Grounded on
//! `internal/policylock/model.go` and `internal/consentguardian/model.go`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `schema` constant for [`PolicySnapshot`].
pub const SCHEMA_POLICY_SNAPSHOT: &str = "policylock.policy_snapshot.v0.1";
/// `schema` constant for [`ConsentEvent`].
pub const SCHEMA_CONSENT_EVENT: &str = "consentguardian.consent_event.v0.1";
/// `schema` constant for [`SignatureEnvelope`].
pub const SCHEMA_SIGNATURE_ENVELOPE: &str = "policyguardian.signature_envelope.v0.1";
/// Frozen spec identifier carried on both document kinds.
pub const SPEC_URL_POLICY_GUARDIAN: &str = "SPEC_POLICY_GUARDIAN_V0_1_FROZEN.md";

/// The metadata document packaged alongside raw policy bytes (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub schema: String,
    pub spec_url: String,
    pub tool_version: String,
    pub created_at_utc: String,
    pub policy: PolicySection,
    pub snapshot_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    pub input: PolicyInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<PolicyFetch>,
    pub bytes: PolicyBytes,
}

/// `mode` ∈ {`file`, `url`, `stdin`}; `path`/`url` present only for their
/// matching mode, enforced by [`crate::snapshot`]'s invariant checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyInput {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Fetch metadata, present iff `input.mode == "url"`.
///
/// `redirect_count` and `cross_domain_redirect` are tri-state: always
/// `Some` here (the display document always records them once fetched),
/// but elided from the signing payload when `Some(0)` / `Some(false)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyFetch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_at_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_leaf_cert_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_subject_cn_san: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_domain_redirect: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyBytes {
    pub length: u64,
    pub hashes: BTreeMap<String, String>,
}

/// The consent event document (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentEvent {
    pub schema: String,
    pub spec_url: String,
    pub created_at_utc: String,
    pub hashes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub consent_event_id: String,
    pub policy: PolicyRef,
    pub subject: SubjectRef,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub context: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub evidence: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRef {
    pub policy_sha256: String,
    pub snapshot_id: String,
    pub snapshot_pack_sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_id_hash: String,
    pub hash_algorithm: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigningInfo {
    /// `none` | `ed25519`.
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_file: Option<String>,
}

/// Sidecar file accompanying a signed consent event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    pub schema: String,
    pub algorithm: String,
    pub public_key: String,
    pub signature: String,
    pub payload_hashes: BTreeMap<String, String>,
}

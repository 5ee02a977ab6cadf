//! Builds a policy snapshot artifact from a file, stdin, or a URL
//! (`spec.md` §4.5).
//!
//! Grounded on `internal/policylock/policylock.go`'s
//! `SnapshotFromFile`/`SnapshotFromStdin`/`SnapshotFromURL` and shared
//! `buildSnapshot` helper: timestamp defaulting, `retrieved_at_utc`
//! pinning for determinism, mode-invariant checks, and the final
//! `snapshot_id = SHA256Hex(CanonJSON(SignPayload(snap)))` assignment.

use crate::archive::write_deterministic_zip;
use crate::error::BuildError;
use crate::fetch::{resolve_ip, FetchOutcome, Fetcher};
use crate::hash::sha256_hex;
use crate::sign_payload::snapshot_sign_payload;
use crate::timefmt;
use crate::types::{
    PolicyBytes, PolicyFetch, PolicyInput, PolicySection, PolicySnapshot, SCHEMA_POLICY_SNAPSHOT,
    SPEC_URL_POLICY_GUARDIAN,
};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

const DEFAULT_USER_AGENT: &str = "policyguardian/0.1 (PolicyLock)";

/// Construction-time options shared by all three snapshot entry points.
#[derive(Debug, Clone, Default)]
pub struct SnapshotOptions {
    pub created_at_utc: Option<String>,
    pub retrieved_at_utc: Option<String>,
    pub user_agent: Option<String>,
    pub tool_version: String,
    pub max_bytes: Option<u64>,
}

impl SnapshotOptions {
    fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// The archive bytes plus the in-memory record describing them.
#[derive(Debug)]
pub struct Snapshot {
    pub archive_bytes: Vec<u8>,
    pub record: PolicySnapshot,
}

/// Build a snapshot from a local file.
pub fn snapshot_from_file(path: &Path, opts: &SnapshotOptions) -> Result<Snapshot, BuildError> {
    tracing::debug!(path = %path.display(), "snapshot: reading file");
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BuildError::InputNotFound(path.display().to_string()),
        _ => BuildError::Io(e),
    })?;
    let input = PolicyInput {
        mode: "file".to_string(),
        path: Some(path.display().to_string()),
        url: None,
    };
    check_mode_invariants(&input, &None)?;
    build_snapshot(bytes, input, None, opts)
}

/// Build a snapshot from an arbitrary reader (stdin in practice).
pub fn snapshot_from_stdin<R: Read>(mut reader: R, opts: &SnapshotOptions) -> Result<Snapshot, BuildError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let input = PolicyInput {
        mode: "stdin".to_string(),
        path: None,
        url: None,
    };
    check_mode_invariants(&input, &None)?;
    build_snapshot(bytes, input, None, opts)
}

/// Build a snapshot by fetching `url` through `fetcher`.
pub fn snapshot_from_url(
    url: &str,
    fetcher: &dyn Fetcher,
    opts: &SnapshotOptions,
) -> Result<Snapshot, BuildError> {
    tracing::debug!(%url, "snapshot: fetching url");
    let parsed = url::Url::parse(url).map_err(|_| BuildError::InputNotFound(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(BuildError::UnsupportedScheme(parsed.scheme().to_string()));
    }
    let original_host = parsed.host_str().unwrap_or("").to_string();

    let mut headers = BTreeMap::new();
    headers.insert("user-agent".to_string(), opts.user_agent());
    let outcome: FetchOutcome = fetcher.get(url, &headers, opts.max_bytes)?;
    tracing::debug!(
        final_url = %outcome.final_url,
        status = outcome.status,
        redirect_count = outcome.redirect_count,
        "snapshot: fetch complete"
    );

    let cross_domain_redirect = {
        let final_host = url::Url::parse(&outcome.final_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_default();
        original_host.to_lowercase() != final_host.to_lowercase()
    };

    let fetch = PolicyFetch {
        requested_url: Some(url.to_string()),
        final_url: Some(outcome.final_url.clone()),
        request_headers: {
            let mut m = BTreeMap::new();
            m.insert("user-agent".to_string(), opts.user_agent());
            m
        },
        redirect_count: Some(outcome.redirect_count),
        http_status: Some(outcome.status),
        content_type: outcome.headers.get("content-type").cloned(),
        etag: outcome.headers.get("etag").cloned(),
        last_modified: outcome.headers.get("last-modified").cloned(),
        retrieved_at_utc: opts.retrieved_at_utc.clone(),
        resolved_ip: outcome
            .resolved_ip
            .clone()
            .or_else(|| resolve_ip(&original_host)),
        tls_version: outcome.tls_version.clone(),
        tls_leaf_cert_sha256: outcome.tls_leaf_cert_sha256.clone(),
        tls_subject_cn_san: outcome.tls_subject_cn_san.clone(),
        cross_domain_redirect: Some(cross_domain_redirect),
    };
    // retrieved_at_utc is finalized once created_at_utc is known, in build_snapshot.

    let input = PolicyInput {
        mode: "url".to_string(),
        path: None,
        url: Some(url.to_string()),
    };
    check_mode_invariants(&input, &Some(fetch.clone()))?;
    build_snapshot(outcome.body, input, Some(fetch), opts)
}

fn check_mode_invariants(input: &PolicyInput, fetch: &Option<PolicyFetch>) -> Result<(), BuildError> {
    match input.mode.as_str() {
        "file" => {
            if input.url.is_some() || fetch.is_some() {
                return Err(BuildError::InvalidInputInvariants(
                    "mode=file must not carry url or fetch".to_string(),
                ));
            }
        }
        "stdin" => {
            if input.path.is_some() || input.url.is_some() || fetch.is_some() {
                return Err(BuildError::InvalidInputInvariants(
                    "mode=stdin must not carry path, url, or fetch".to_string(),
                ));
            }
        }
        "url" => {
            if fetch.is_none() {
                return Err(BuildError::InvalidInputInvariants(
                    "mode=url requires fetch metadata".to_string(),
                ));
            }
        }
        other => {
            return Err(BuildError::InvalidInputInvariants(format!(
                "unknown mode: {other}"
            )))
        }
    }
    Ok(())
}

fn build_snapshot(
    policy_bytes: Vec<u8>,
    input: PolicyInput,
    mut fetch: Option<PolicyFetch>,
    opts: &SnapshotOptions,
) -> Result<Snapshot, BuildError> {
    if opts.tool_version.is_empty() {
        return Err(BuildError::InvalidInputInvariants(
            "tool_version must be non-empty".to_string(),
        ));
    }
    let created = match &opts.created_at_utc {
        Some(s) => {
            timefmt::parse(s)?;
            s.clone()
        }
        None => timefmt::now_utc_formatted(),
    };

    if let Some(f) = fetch.as_mut() {
        if f.retrieved_at_utc.as_deref().unwrap_or("").is_empty() {
            f.retrieved_at_utc = Some(created.clone());
        } else {
            timefmt::parse(f.retrieved_at_utc.as_ref().unwrap())?;
        }
    }

    let body_hash = sha256_hex(&policy_bytes);
    let mut hashes = BTreeMap::new();
    hashes.insert("sha2-256".to_string(), body_hash);

    let mut record = PolicySnapshot {
        schema: SCHEMA_POLICY_SNAPSHOT.to_string(),
        spec_url: SPEC_URL_POLICY_GUARDIAN.to_string(),
        tool_version: opts.tool_version.clone(),
        created_at_utc: created,
        policy: PolicySection {
            input,
            fetch,
            bytes: PolicyBytes {
                length: policy_bytes.len() as u64,
                hashes,
            },
        },
        snapshot_id: String::new(),
    };

    let payload = snapshot_sign_payload(&record);
    let payload_bytes = crate::canon::to_vec(&payload)?;
    record.snapshot_id = sha256_hex(&payload_bytes);
    tracing::debug!(snapshot_id = %record.snapshot_id, "snapshot: built");

    let snapshot_json = serde_json::to_vec_pretty(&record).map_err(|e| BuildError::InvalidUtf8(e.to_string()))?;

    let mut entries = BTreeMap::new();
    entries.insert("policy_body.bin".to_string(), policy_bytes);
    entries.insert("policy_snapshot.json".to_string(), snapshot_json);
    let archive_bytes = write_deterministic_zip(&entries)?;

    Ok(Snapshot {
        archive_bytes,
        record,
    })
}

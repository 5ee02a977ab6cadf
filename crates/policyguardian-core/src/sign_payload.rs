//! Projection from a display document to its canonical signing payload
//! (`spec.md` §4.4).
//!
//! Mirrors `BuildSignPayload`/`BuildConsentSignPayload`: pure functions,
//! no I/O, returning a [`CanonValue`] tree ready for [`crate::canon::to_vec`].
//! `schema`, `spec_url`, `tool_version`, the self-identifiers, `hashes` and
//! `signing` never appear here — they are explicitly excluded by `spec.md`
//! §4.4 so that including them would make the hash depend on itself.

use crate::canon::CanonValue;
use crate::types::{ConsentEvent, PolicySnapshot};
use std::collections::BTreeMap;

/// Build the canonical signing payload for a [`PolicySnapshot`].
pub fn snapshot_sign_payload(snap: &PolicySnapshot) -> CanonValue {
    let mut input = BTreeMap::new();
    input.insert(
        "mode".to_string(),
        CanonValue::str(snap.policy.input.mode.clone()),
    );
    if snap.policy.input.mode == "file" {
        if let Some(path) = &snap.policy.input.path {
            if !path.is_empty() {
                input.insert("path".to_string(), CanonValue::str(path.clone()));
            }
        }
    }
    if snap.policy.input.mode == "url" {
        if let Some(url) = &snap.policy.input.url {
            if !url.is_empty() {
                input.insert("url".to_string(), CanonValue::str(url.clone()));
            }
        }
    }

    let mut hashes = BTreeMap::new();
    if let Some(sha) = snap.policy.bytes.hashes.get("sha2-256") {
        hashes.insert("sha2-256".to_string(), CanonValue::str(sha.clone()));
    }
    let mut bytes = BTreeMap::new();
    bytes.insert("hashes".to_string(), CanonValue::Map(hashes));

    let mut policy = BTreeMap::new();
    policy.insert("input".to_string(), CanonValue::Map(input));
    policy.insert("bytes".to_string(), CanonValue::Map(bytes));

    let mut root_request_headers = None;

    if let Some(fetch) = &snap.policy.fetch {
        let mut f = BTreeMap::new();
        let add_str = |m: &mut BTreeMap<String, CanonValue>, k: &str, v: &Option<String>| {
            if let Some(v) = v {
                if !v.is_empty() {
                    m.insert(k.to_string(), CanonValue::str(v.clone()));
                }
            }
        };
        add_str(&mut f, "requested_url", &fetch.requested_url);
        add_str(&mut f, "final_url", &fetch.final_url);
        if let Some(n) = fetch.redirect_count {
            if n != 0 {
                f.insert("redirect_count".to_string(), CanonValue::uint(n));
            }
        }
        if let Some(status) = fetch.http_status {
            if status != 0 {
                f.insert("http_status".to_string(), CanonValue::uint(status as u64));
            }
        }
        add_str(&mut f, "content_type", &fetch.content_type);
        add_str(&mut f, "etag", &fetch.etag);
        add_str(&mut f, "last_modified", &fetch.last_modified);
        add_str(&mut f, "retrieved_at_utc", &fetch.retrieved_at_utc);
        add_str(&mut f, "resolved_ip", &fetch.resolved_ip);
        add_str(&mut f, "tls_version", &fetch.tls_version);
        add_str(&mut f, "tls_leaf_cert_sha256", &fetch.tls_leaf_cert_sha256);
        add_str(&mut f, "tls_subject_cn_san", &fetch.tls_subject_cn_san);
        if fetch.cross_domain_redirect == Some(true) {
            f.insert("cross_domain_redirect".to_string(), CanonValue::Bool(true));
        }

        let mut headers = BTreeMap::new();
        for (k, v) in &fetch.request_headers {
            if !v.is_empty() {
                headers.insert(k.to_lowercase(), CanonValue::str(v.clone()));
            }
        }
        if !headers.is_empty() {
            root_request_headers = Some(CanonValue::Map(headers));
        }

        policy.insert("fetch".to_string(), CanonValue::Map(f));
    }

    let mut root = BTreeMap::new();
    root.insert(
        "created_at_utc".to_string(),
        CanonValue::str(snap.created_at_utc.clone()),
    );
    root.insert("policy".to_string(), CanonValue::Map(policy));
    if let Some(request_headers) = root_request_headers {
        root.insert("request_headers".to_string(), request_headers);
    }
    CanonValue::Map(root)
}

/// Build the canonical signing payload for a [`ConsentEvent`].
pub fn consent_sign_payload(ev: &ConsentEvent) -> CanonValue {
    let mut policy = BTreeMap::new();
    policy.insert(
        "policy_sha256".to_string(),
        CanonValue::str(ev.policy.policy_sha256.clone()),
    );
    policy.insert(
        "snapshot_id".to_string(),
        CanonValue::str(ev.policy.snapshot_id.clone()),
    );
    policy.insert(
        "snapshot_pack_sha256".to_string(),
        CanonValue::str(ev.policy.snapshot_pack_sha256.clone()),
    );

    let mut subject = BTreeMap::new();
    subject.insert(
        "subject_id_hash".to_string(),
        CanonValue::str(ev.subject.subject_id_hash.clone()),
    );
    subject.insert(
        "hash_algorithm".to_string(),
        CanonValue::str(ev.subject.hash_algorithm.clone()),
    );

    let mut root = BTreeMap::new();
    root.insert(
        "created_at_utc".to_string(),
        CanonValue::str(ev.created_at_utc.clone()),
    );
    root.insert("policy".to_string(), CanonValue::Map(policy));
    root.insert("subject".to_string(), CanonValue::Map(subject));

    if let Some(ctx) = non_empty_filtered(&ev.context) {
        root.insert("context".to_string(), ctx);
    }
    if let Some(evidence) = non_empty_filtered(&ev.evidence) {
        root.insert("evidence".to_string(), evidence);
    }

    CanonValue::Map(root)
}

fn non_empty_filtered(m: &BTreeMap<String, String>) -> Option<CanonValue> {
    let filtered: BTreeMap<String, CanonValue> = m
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.clone(), CanonValue::str(v.clone())))
        .collect();
    if filtered.is_empty() {
        None
    } else {
        Some(CanonValue::Map(filtered))
    }
}

//! The `Fetcher` capability (`spec.md` §4.5, §9 design notes).
//!
//! The core never talks to the network directly inside `Snapshotter`;
//! instead it takes anything implementing [`Fetcher`]. [`ReqwestFetcher`]
//! is the production collaborator; [`StaticFetcher`] is an in-memory test
//! double returning a canned [`FetchOutcome`], the same test-substitution
//! shape `assay-evidence::store::BundleStore` gives an in-memory backend
//! alongside its real `ObjectStoreBundleStore`.
//!
//! Grounded on `internal/policylock/policylock.go`'s `SnapshotFromURL`:
//! redirect counting via `http.Client.CheckRedirect`, `Content-Length`
//! vs. bytes-actually-read truncation detection, `max_bytes+1`
//! over-read to detect a cap breach, and IPv4-preferring host
//! resolution.
//!
//! TLS connection metadata (`tls_version`, `tls_leaf_cert_sha256`,
//! `tls_subject_cn_san`) is part of [`FetchOutcome`] and fully exercised
//! by [`StaticFetcher`]-backed tests, but [`ReqwestFetcher`] leaves those
//! fields `None`: `reqwest`'s public blocking API does not expose the
//! underlying TLS session's peer certificates, and this crate does not
//! reach past it into `rustls` internals to get them (see `DESIGN.md`).

use crate::error::FetchError;
use std::collections::BTreeMap;
use std::io::Read;
use std::net::ToSocketAddrs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Everything a GET against a policy URL can tell the snapshotter.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub final_url: String,
    pub status: u16,
    /// Response headers, lowercased keys.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub redirect_count: u64,
    pub resolved_ip: Option<String>,
    pub tls_version: Option<String>,
    pub tls_leaf_cert_sha256: Option<String>,
    pub tls_subject_cn_san: Option<String>,
}

/// HTTP GET capability abstracted away from any one client library.
pub trait Fetcher {
    /// Fetch `url`, sending `headers`, capping the body at `max_bytes`
    /// (`None` = unbounded) by reading one extra byte past the cap to
    /// detect an overflow without buffering an unbounded response.
    fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        max_bytes: Option<u64>,
    ) -> Result<FetchOutcome, FetchError>;
}

/// Production `Fetcher` backed by a blocking `reqwest` client.
pub struct ReqwestFetcher {
    timeout: Duration,
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl ReqwestFetcher {
    /// Build a fetcher with an explicit request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Fetcher for ReqwestFetcher {
    fn get(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        max_bytes: Option<u64>,
    ) -> Result<FetchOutcome, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::UnsupportedScheme(parsed.scheme().to_string()));
        }
        let original_host = parsed.host_str().unwrap_or("").to_string();

        let redirects = Arc::new(Mutex::new(0u64));
        let redirects_for_policy = Arc::clone(&redirects);
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            *redirects_for_policy.lock().unwrap() = attempt.previous().len() as u64;
            if attempt.previous().len() >= 10 {
                attempt.error("too many redirects")
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::blocking::Client::builder()
            .redirect(policy)
            .timeout(self.timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let mut req = client.get(parsed.clone());
        for (k, v) in headers {
            req = req.header(k, v);
        }
        let resp = req.send().map_err(|e| FetchError::Request(e.to_string()))?;

        let final_url = resp.url().to_string();
        let status = resp.status().as_u16();
        let response_headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_lowercase(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let content_length = response_headers
            .get("content-length")
            .and_then(|v| v.parse::<u64>().ok());

        let read_cap = max_bytes.map(|m| m + 1);
        let mut reader: Box<dyn Read> = Box::new(resp);
        let mut body = Vec::new();
        match read_cap {
            Some(cap) => {
                let mut limited = reader.take(cap);
                limited
                    .read_to_end(&mut body)
                    .map_err(|e| FetchError::Request(e.to_string()))?;
            }
            None => {
                reader
                    .read_to_end(&mut body)
                    .map_err(|e| FetchError::Request(e.to_string()))?;
            }
        }
        if let Some(limit) = max_bytes {
            if body.len() as u64 > limit {
                return Err(FetchError::ResponseExceedsLimit(limit));
            }
        }
        if let Some(expected) = content_length {
            if expected > 0 && expected != body.len() as u64 {
                return Err(FetchError::Truncated {
                    expected,
                    actual: body.len() as u64,
                });
            }
        }

        let resolved_ip = resolve_ip(&original_host);
        let redirect_count = *redirects.lock().unwrap();

        Ok(FetchOutcome {
            final_url,
            status,
            headers: response_headers,
            body,
            redirect_count,
            resolved_ip,
            tls_version: None,
            tls_leaf_cert_sha256: None,
            tls_subject_cn_san: None,
        })
    }
}

/// Resolve `host` to its first IPv4 address, falling back to the first
/// address of any family. Mirrors Go's `resolveIP`.
pub fn resolve_ip(host: &str) -> Option<String> {
    if host.is_empty() {
        return None;
    }
    let addrs = (host, 0u16).to_socket_addrs().ok()?;
    let mut first_any = None;
    for addr in addrs {
        let ip = addr.ip();
        if ip.is_ipv4() {
            return Some(ip.to_string());
        }
        if first_any.is_none() {
            first_any = Some(ip.to_string());
        }
    }
    first_any
}

/// In-memory `Fetcher` test double: returns a canned outcome (or error)
/// regardless of the requested URL, so snapshot tests are deterministic
/// and hermetic.
pub struct StaticFetcher {
    result: Result<FetchOutcome, FetchError>,
}

impl StaticFetcher {
    /// Always succeed with `outcome`.
    pub fn ok(outcome: FetchOutcome) -> Self {
        Self {
            result: Ok(outcome),
        }
    }

    /// Always fail with `err`.
    pub fn err(err: FetchError) -> Self {
        Self { result: Err(err) }
    }
}

impl Fetcher for StaticFetcher {
    fn get(
        &self,
        _url: &str,
        _headers: &BTreeMap<String, String>,
        _max_bytes: Option<u64>,
    ) -> Result<FetchOutcome, FetchError> {
        match &self.result {
            Ok(outcome) => Ok(outcome.clone()),
            Err(e) => Err(clone_fetch_error(e)),
        }
    }
}

fn clone_fetch_error(e: &FetchError) -> FetchError {
    match e {
        FetchError::UnsupportedScheme(s) => FetchError::UnsupportedScheme(s.clone()),
        FetchError::InvalidUrl(s) => FetchError::InvalidUrl(s.clone()),
        FetchError::Request(s) => FetchError::Request(s.clone()),
        FetchError::ResponseExceedsLimit(n) => FetchError::ResponseExceedsLimit(*n),
        FetchError::Truncated { expected, actual } => FetchError::Truncated {
            expected: *expected,
            actual: *actual,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_fetcher_returns_canned_outcome() {
        let outcome = FetchOutcome {
            final_url: "https://example.com/policy".to_string(),
            status: 200,
            body: b"hello".to_vec(),
            ..Default::default()
        };
        let fetcher = StaticFetcher::ok(outcome.clone());
        let got = fetcher.get("https://example.com", &BTreeMap::new(), None).unwrap();
        assert_eq!(got.final_url, outcome.final_url);
        assert_eq!(got.body, outcome.body);
    }

    #[test]
    fn static_fetcher_returns_canned_error() {
        let fetcher = StaticFetcher::err(FetchError::ResponseExceedsLimit(10));
        let err = fetcher.get("https://example.com", &BTreeMap::new(), Some(10)).unwrap_err();
        assert!(matches!(err, FetchError::ResponseExceedsLimit(10)));
    }

    #[test]
    fn resolve_ip_returns_none_for_empty_host() {
        assert_eq!(resolve_ip(""), None);
    }
}

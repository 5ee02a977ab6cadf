//! Error types shared across the canonicalization, archive, fetch and
//! construction pipelines.
//!
//! Mirrors `assay_evidence::mandate::signing::VerifyError` and
//! `assay_evidence::store::error::StoreError`: structured variants with
//! named fields and `#[error("...")]` messages, one enum per concern rather
//! than a single catch-all.

use thiserror::Error;

/// Errors raised by the canonical JSON encoder (§4.1).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonError {
    /// The value tree contained `null`, which canonical JSON never encodes.
    #[error("null_not_allowed")]
    NullNotAllowed,
    /// The value tree contained a float or exponent-notation number.
    #[error("floats_not_allowed")]
    FloatsNotAllowed,
    /// A string or key was not valid UTF-8.
    #[error("invalid_utf8")]
    InvalidUtf8,
    /// An integer literal was malformed (leading zero, `+` sign, non-digit).
    #[error("invalid integer literal: {0}")]
    InvalidInteger(String),
}

/// Errors raised while writing or reading a deterministic archive (§4.3).
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// No entries were supplied to the writer.
    #[error("archive has no entries")]
    Empty,
    /// An entry name was empty, absolute, or contained a backslash.
    #[error("invalid entry name: {0}")]
    InvalidEntryName(String),
    /// Two entries shared the same name.
    #[error("duplicate entry name: {0}")]
    DuplicateEntryName(String),
    /// An entry name attempted path traversal or escaped the archive root.
    #[error("zip_slip_path: {0}")]
    PathUnsafe(String),
    /// Underlying ZIP library error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the `Fetcher` capability (§4.5, §9).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL scheme was neither `http` nor `https`.
    #[error("unsupported_scheme: {0}")]
    UnsupportedScheme(String),
    /// The URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The underlying HTTP client failed.
    #[error("http request failed: {0}")]
    Request(String),
    /// The response body exceeded the configured `max_bytes` cap.
    #[error("response_exceeds_limit: {0}")]
    ResponseExceedsLimit(u64),
    /// The `Content-Length` header disagreed with the bytes actually read.
    #[error("truncated_http: content-length={expected} read={actual}")]
    Truncated { expected: u64, actual: u64 },
}

/// Construction-time errors surfaced by `Snapshotter` and `ConsentRecorder`
/// (§7). Each variant corresponds to one of the reason codes named there.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The file/snapshot argument did not resolve to an existing, readable
    /// input.
    #[error("input_not_found: {0}")]
    InputNotFound(String),
    /// A URL scheme other than `http`/`https` was supplied.
    #[error("unsupported_scheme: {0}")]
    UnsupportedScheme(String),
    /// A hex-encoded argument (pepper, salt, signing key) failed to decode.
    #[error("invalid_hex: {0}")]
    InvalidHex(String),
    /// A decoded key was the wrong length.
    #[error("invalid_key_length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    /// A UTF-8 validation step failed.
    #[error("invalid_utf8: {0}")]
    InvalidUtf8(String),
    /// A supplied timestamp failed the round-trip format check (§6).
    #[error("invalid_timestamp: {0}")]
    InvalidTimestamp(String),
    /// `policy.input`'s mode/path/url/fetch shape violated §4.7's invariants.
    #[error("invalid_input_invariants: {0}")]
    InvalidInputInvariants(String),
    /// `Content-Length` disagreed with bytes read from a URL fetch.
    #[error("truncated_http: content-length={expected} read={actual}")]
    TruncatedHttp { expected: u64, actual: u64 },
    /// A URL response body exceeded `max_bytes`.
    #[error("response_exceeds_limit: {0}")]
    ResponseExceedsLimit(u64),
    /// Canonicalization of the signing payload failed.
    #[error("canonicalization_failed: {0}")]
    Canonicalization(#[from] CanonError),
    /// Archive construction failed.
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    /// Filesystem I/O failed.
    #[error("io_error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FetchError> for BuildError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::UnsupportedScheme(s) => BuildError::UnsupportedScheme(s),
            FetchError::InvalidUrl(s) => BuildError::InputNotFound(s),
            FetchError::Request(s) => BuildError::InputNotFound(s),
            FetchError::ResponseExceedsLimit(n) => BuildError::ResponseExceedsLimit(n),
            FetchError::Truncated { expected, actual } => {
                BuildError::TruncatedHttp { expected, actual }
            }
        }
    }
}

impl BuildError {
    /// The machine-readable reason code named in `spec.md` §7.
    pub fn reason(&self) -> &'static str {
        match self {
            BuildError::InputNotFound(_) => "input_not_found",
            BuildError::UnsupportedScheme(_) => "unsupported_scheme",
            BuildError::InvalidHex(_) => "invalid_hex",
            BuildError::InvalidKeyLength { .. } => "invalid_key_length",
            BuildError::InvalidUtf8(_) => "invalid_utf8",
            BuildError::InvalidTimestamp(_) => "invalid_timestamp",
            BuildError::InvalidInputInvariants(_) => "invalid_input_invariants",
            BuildError::TruncatedHttp { .. } => "truncated_http",
            BuildError::ResponseExceedsLimit(_) => "response_exceeds_limit",
            BuildError::Canonicalization(_) => "canonicalization_failed",
            BuildError::Archive(_) => "io_error",
            BuildError::Io(_) => "io_error",
        }
    }
}

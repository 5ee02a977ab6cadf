//! Canonical JSON encoder (RFC 8785 subset) over an in-memory value tree.
//!
//! Unlike `assay_evidence::crypto::jcs`, which canonicalizes any
//! `serde::Serialize` value via `serde_jcs` (and therefore inherits
//! `serde_json::Value`'s tolerance for floats and `null`), this encoder
//! operates on a closed value tree (`CanonValue`) that cannot represent
//! floats or null in the first place. `spec.md` §4.1 requires both to be
//! rejected with named errors, and rejecting them at the type level keeps
//! that contract independent of any third-party encoder's behavior.
//!
//! # Guarantees
//!
//! - Mapping keys are sorted by codepoint order (Rust `str` ordering, which
//!   is byte-wise UTF-8 and therefore codepoint order) before emission.
//! - No insignificant whitespace.
//! - Strings use the JSON standard minimal escape set; valid non-ASCII UTF-8
//!   passes through unescaped.
//! - Integers are emitted as their stored decimal digits verbatim (no
//!   leading `+`, no leading zero except the literal `0`, optional `-`).
//!
//! # Example
//!
//! ```
//! use policyguardian_core::canon::{self, CanonValue};
//!
//! let mut map = std::collections::BTreeMap::new();
//! map.insert("b".to_string(), CanonValue::Bool(true));
//! map.insert("a".to_string(), CanonValue::Int("1".to_string()));
//! let bytes = canon::to_vec(&CanonValue::Map(map)).unwrap();
//! assert_eq!(bytes, br#"{"a":1,"b":true}"#);
//! ```

use crate::error::CanonError;
use std::collections::BTreeMap;

/// A value in the canonical JSON value tree.
///
/// There is deliberately no `Null` and no floating-point variant: `spec.md`
/// §4.1 rejects both, so they are simply not representable here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonValue {
    /// `true` / `false`.
    Bool(bool),
    /// Arbitrary-precision decimal digits, stored as text so large IDs
    /// survive round-trip without a machine integer's width limit.
    Int(String),
    /// A valid UTF-8 string.
    Str(String),
    /// An ordered sequence of values.
    Seq(Vec<CanonValue>),
    /// A mapping from string keys to values, sorted at emission time.
    Map(BTreeMap<String, CanonValue>),
}

impl CanonValue {
    /// Convenience constructor for a string value.
    pub fn str(s: impl Into<String>) -> Self {
        CanonValue::Str(s.into())
    }

    /// Convenience constructor for an unsigned integer value.
    pub fn uint(n: u64) -> Self {
        CanonValue::Int(n.to_string())
    }
}

/// Serialize a `CanonValue` to canonical JSON bytes.
///
/// Returns a `CanonError` if the tree (which cannot itself hold null or
/// floats) somehow holds a malformed integer literal or invalid UTF-8 —
/// both of which are guarded against by every constructor in this crate,
/// so a caller building values through `CanonValue::str`/`uint` should never
/// observe these.
pub fn to_vec(value: &CanonValue) -> Result<Vec<u8>, CanonError> {
    let mut buf = Vec::new();
    write_value(&mut buf, value)?;
    Ok(buf)
}

fn write_value(buf: &mut Vec<u8>, value: &CanonValue) -> Result<(), CanonError> {
    match value {
        CanonValue::Bool(b) => {
            buf.extend_from_slice(if *b { b"true" } else { b"false" });
        }
        CanonValue::Int(digits) => {
            validate_integer(digits)?;
            buf.extend_from_slice(digits.as_bytes());
        }
        CanonValue::Str(s) => write_string(buf, s),
        CanonValue::Seq(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_value(buf, item)?;
            }
            buf.push(b']');
        }
        CanonValue::Map(map) => {
            // `BTreeMap<String, _>` already iterates in codepoint order.
            buf.push(b'{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_string(buf, k);
                buf.push(b':');
                write_value(buf, v)?;
            }
            buf.push(b'}');
        }
    }
    Ok(())
}

fn validate_integer(digits: &str) -> Result<(), CanonError> {
    let rest = digits.strip_prefix('-').unwrap_or(digits);
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CanonError::InvalidInteger(digits.to_string()));
    }
    if rest.len() > 1 && rest.starts_with('0') {
        return Err(CanonError::InvalidInteger(digits.to_string()));
    }
    Ok(())
}

/// Write a string using the JSON standard minimal escape set: `"`, `\`, and
/// control characters below `0x20`. Valid non-ASCII UTF-8 is copied through
/// as raw bytes — no `\uXXXX` expansion, matching the Go source's
/// `encoding/json` escaping exactly.
fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.extend_from_slice(b"\\\""),
            '\\' => buf.extend_from_slice(b"\\\\"),
            '\n' => buf.extend_from_slice(b"\\n"),
            '\r' => buf.extend_from_slice(b"\\r"),
            '\t' => buf.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                buf.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut tmp = [0u8; 4];
                buf.extend_from_slice(c.encode_utf8(&mut tmp).as_bytes());
            }
        }
    }
    buf.push(b'"');
}

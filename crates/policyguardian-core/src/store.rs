//! Content-addressed local filesystem store for snapshot artifacts
//! (`spec.md` §6).
//!
//! A deliberately narrower cousin of `assay-evidence::store::StoreSpec`:
//! that type parses a multi-scheme URL (`s3://`, `file://`, `memory://`)
//! for a BYOS object-store adapter. `spec.md` §1 places "the on-disk
//! 'store' directory layout" out of this crate's formal scope and
//! `internal/consentguardian/consent.go`'s `resolveSnapshot` only ever
//! reads `$POLICYGUARDIAN_STORE/snapshots/<id>.zip` from local disk, so
//! this is a single-scheme, parse-at-construction path builder rather
//! than a trait with swappable backends.

use std::env;
use std::path::{Path, PathBuf};

const ENV_VAR: &str = "POLICYGUARDIAN_STORE";
const DEFAULT_ROOT: &str = ".policyguardian_store";

/// A resolved store root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    root: PathBuf,
}

impl StoreConfig {
    /// Build a `StoreConfig` from an explicit root, bypassing environment
    /// resolution (used by tests and embedders with their own config
    /// layer).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the store root from `POLICYGUARDIAN_STORE`, defaulting to
    /// `.policyguardian_store` in the current directory.
    pub fn from_env() -> Self {
        let root = env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ROOT.to_string());
        Self { root: root.into() }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The content-addressed path for a snapshot's archive:
    /// `<root>/snapshots/<snapshot_id>.zip`.
    pub fn snapshot_path(&self, snapshot_id: &str) -> PathBuf {
        self.root
            .join("snapshots")
            .join(format!("{snapshot_id}.zip"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(unsafe_code)]
    fn defaults_when_env_unset() {
        // SAFETY: test-only, single-threaded env mutation scoped to this test.
        unsafe { env::remove_var(ENV_VAR) };
        let store = StoreConfig::from_env();
        assert_eq!(store.root(), Path::new(DEFAULT_ROOT));
    }

    #[test]
    fn snapshot_path_is_content_addressed() {
        let store = StoreConfig::new("/tmp/store");
        assert_eq!(
            store.snapshot_path("abc123"),
            PathBuf::from("/tmp/store/snapshots/abc123.zip")
        );
    }

    #[test]
    fn honors_explicit_root() {
        let store = StoreConfig::new("/srv/policyguardian");
        assert_eq!(store.root(), Path::new("/srv/policyguardian"));
    }
}

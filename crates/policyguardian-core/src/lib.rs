pub mod archive;
pub mod canon;
pub mod consent;
pub mod consent_verify;
pub mod error;
pub mod fetch;
pub mod hash;
pub mod sign_payload;
pub mod snapshot;
pub mod snapshot_verify;
pub mod store;
pub mod timefmt;
pub mod types;

// Convenience re-exports
pub use archive::{read_deterministic_zip, write_deterministic_zip};
pub use canon::CanonValue;
pub use consent::{normalize_identifier, record_consent, subject_id_hash, RecordOptions, RecordedConsent};
pub use consent_verify::{verify_consent, ConsentVerifyResult};
pub use error::{ArchiveError, BuildError, CanonError, FetchError};
pub use fetch::{resolve_ip, FetchOutcome, Fetcher, ReqwestFetcher, StaticFetcher};
pub use hash::{sha256, sha256_hex};
pub use sign_payload::{consent_sign_payload, snapshot_sign_payload};
pub use snapshot::{snapshot_from_file, snapshot_from_stdin, snapshot_from_url, Snapshot, SnapshotOptions};
pub use snapshot_verify::{read_snapshot_info, verify_snapshot_zip, VerifiedSnapshotInfo};
pub use store::StoreConfig;
pub use types::{
    ConsentEvent, PolicyBytes, PolicyFetch, PolicyInput, PolicyRef, PolicySection, PolicySnapshot,
    SignatureEnvelope, SigningInfo, SubjectRef, SCHEMA_CONSENT_EVENT, SCHEMA_POLICY_SNAPSHOT,
    SCHEMA_SIGNATURE_ENVELOPE, SPEC_URL_POLICY_GUARDIAN,
};

// VerifyStatus/VerifyResult are defined separately for snapshots and consent
// events (different reason-code vocabularies), so callers reach them through
// their owning module rather than a colliding top-level re-export.

//! # exposure-sync
//!
//! Exposure state tracking and diagnosis key submission for
//! exposure-notification apps.
//!
//! The crate answers two questions for the host application:
//!
//! > What does this device currently believe about its exposure status?
//!
//! > When authorized, how do this device's keys reach the key server intact?
//!
//! ## Architecture
//!
//! ```text
//!                      ┌─→ ExposureStateManager   (cached ExposureInfo + last detection)
//! ExposureNative ──────┤
//!   event stream       └─→ DiagnosisKeySubmitter  (keys → HMAC → DiagnosisKeyApi)
//! ```
//!
//! `ExposureRuntime` is the composition root: it subscribes both reactions
//! and owns their lifecycle.
//!
//! ## Integrity Guarantees
//!
//! - Key sets are signed with HMAC-SHA256 over a canonical, order-independent
//!   serialization
//! - Same secret + same key set → identical digest
//! - Keys are read from the native store at submission time, never cached

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod signing;
pub mod events;
pub mod native;
pub mod state;
pub mod config;
pub mod submission;
pub mod runtime;
pub mod telemetry;

// Re-exports
pub use types::{
    DetectionTimestamp, ExposureInfo, ExposureRecord,
    ExposureKey, RevisionToken, SubmissionCertificate,
    DetectExposuresResponse, DetectionFailure, DetectionFailureReason,
    AnalyticsSink, NoOpAnalytics, RecordingAnalytics,
};
pub use canonical::{canonical_key_set, key_set_fingerprint, canonical_hash_hex};
pub use signing::{
    calculate_hmac, verify_hmac, HmacError, HmacOutput, HmacSecret, HmacSigner, KeySetSigner,
};
pub use events::{ExposureEvent, ExposureEventBus, ExposureSubscription};
pub use native::{ExposureNative, InMemoryExposureNative, NativeCall, NativeError};
pub use state::{CacheState, ExposureSnapshot, ExposureStateManager};
pub use config::{ConfigError, ExposureConfig};
pub use submission::{
    ApiError, DiagnosisKeyApi, DiagnosisKeySubmitter, DiagnosisKeyUpload,
    RecordingDiagnosisKeyApi, SubmissionError, SubmissionOutcome, SubmissionReceipt,
    SubmissionReport, SYMPTOM_ONSET_PLACEHOLDER,
};
#[cfg(feature = "http")]
pub use submission::HttpDiagnosisKeyApi;
pub use runtime::{ExposureRuntime, ExposureRuntimeBuilder};

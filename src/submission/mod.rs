//! Diagnosis key submission.
//!
//! Turns the device's local exposure keys into a signed, authorized upload
//! to the diagnosis key server, once per exposure event and only when a
//! submission certificate is configured.
//!
//! ## Pipeline
//!
//! ```text
//! event → certificate? ─no─→ Skipped
//!              │yes
//!              ↓
//!   keys → regions → certificate → HMAC → package → revision token → onset → POST
//! ```

pub mod upload;
pub mod pipeline;
pub mod recording;

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;

use crate::native::NativeError;
use crate::signing::HmacError;

pub use upload::{DiagnosisKeyUpload, SubmissionReceipt, SYMPTOM_ONSET_PLACEHOLDER};
pub use pipeline::{DiagnosisKeySubmitter, SubmissionOutcome, SubmissionReport};
pub use recording::RecordingDiagnosisKeyApi;

#[cfg(feature = "http")]
pub use http::HttpDiagnosisKeyApi;

/// Errors talking to the diagnosis key server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The server rejected the upload.
    #[error("Key server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the raw body.
        message: String,
    },

    /// The response could not be decoded.
    #[error("Failed to decode key server response: {0}")]
    Decode(String),
}

/// Why a submission attempt stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    /// A native bridge call failed.
    #[error("Native bridge error: {0}")]
    Native(#[from] NativeError),

    /// Signing the key set failed.
    #[error("HMAC computation failed: {0}")]
    Hmac(#[from] HmacError),

    /// The upload failed.
    #[error("Upload failed: {0}")]
    Api(#[from] ApiError),
}

/// Remote diagnosis key endpoint.
///
/// The wire encoding belongs to the implementation.
#[async_trait]
pub trait DiagnosisKeyApi: Send + Sync {
    /// Post one upload.
    async fn post_diagnosis_keys(
        &self,
        upload: &DiagnosisKeyUpload,
    ) -> Result<SubmissionReceipt, ApiError>;
}

//! Core types for exposure state and key submission.

pub mod exposure;
pub mod key;
pub mod detection;
pub mod analytics;

pub use exposure::{DetectionTimestamp, ExposureInfo, ExposureRecord};
pub use key::{ExposureKey, RevisionToken, SubmissionCertificate};
pub use detection::{DetectExposuresResponse, DetectionFailure, DetectionFailureReason};
pub use analytics::{AnalyticsSink, NoOpAnalytics, RecordingAnalytics};

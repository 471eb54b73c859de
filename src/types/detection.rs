//! Outcome of a native exposure-detection pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the native subsystem refused or aborted a detection pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum DetectionFailureReason {
    /// Another detection pass is still running.
    Busy,
    /// The user revoked exposure-notification permission.
    PermissionRevoked,
    /// Exposure notifications are turned off on the device.
    NotEnabled,
    /// The platform's detection quota for the day is exhausted.
    RateLimited,
    /// Platform-specific code this layer does not interpret.
    Other(String),
}

impl fmt::Display for DetectionFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "exposure detection already in progress"),
            Self::PermissionRevoked => write!(f, "exposure notification permission revoked"),
            Self::NotEnabled => write!(f, "exposure notifications are disabled"),
            Self::RateLimited => write!(f, "exposure detection rate limit reached"),
            Self::Other(code) => write!(f, "exposure detection failed: {}", code),
        }
    }
}

/// Structured detection failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionFailure {
    /// Reason code reported by the platform.
    pub reason: DetectionFailureReason,
}

impl DetectionFailure {
    /// Create a failure with the given reason.
    pub fn new(reason: DetectionFailureReason) -> Self {
        Self { reason }
    }
}

impl fmt::Display for DetectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// Tagged result of `detect_exposures`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectExposuresResponse {
    /// Detection ran to completion.
    Success,
    /// Detection did not run or did not complete.
    Failure(DetectionFailure),
}

impl DetectExposuresResponse {
    /// Shorthand for a failure response.
    pub fn failure(reason: DetectionFailureReason) -> Self {
        Self::Failure(DetectionFailure::new(reason))
    }

    /// Whether detection succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_tagging() {
        let ok = serde_json::to_value(DetectExposuresResponse::Success).unwrap();
        assert_eq!(ok["kind"], "success");

        let failed = DetectExposuresResponse::failure(DetectionFailureReason::Busy);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["kind"], "failure");
        assert_eq!(json["reason"]["code"], "busy");
        assert!(!failed.is_success());
    }
}

//! Exposure keys, revision tokens and submission certificates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A rolling proximity key as delivered by the native subsystem.
///
/// The key material is kept in the base64 form the platform hands out;
/// this layer never decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureKey {
    /// Base64 key material.
    pub key: String,
    /// First 10-minute interval the key was valid for.
    pub rolling_start_number: u32,
    /// Number of 10-minute intervals the key was valid for.
    pub rolling_period: u32,
    /// Transmission risk level assigned to the key.
    #[serde(rename = "transmissionRisk")]
    pub transmission_risk_level: u8,
}

impl ExposureKey {
    /// Create a key.
    pub fn new(
        key: impl Into<String>,
        rolling_start_number: u32,
        rolling_period: u32,
        transmission_risk_level: u8,
    ) -> Self {
        Self {
            key: key.into(),
            rolling_start_number,
            rolling_period,
            transmission_risk_level,
        }
    }

    /// Canonical entry used when signing a key set.
    ///
    /// Format: `key.rollingStartNumber.rollingPeriod.transmissionRisk`.
    pub fn canonical_entry(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.key, self.rolling_start_number, self.rolling_period, self.transmission_risk_level
        )
    }
}

/// Opaque token that lets the key server supersede earlier uploads from this device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionToken(String);

impl RevisionToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token no server has issued yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the token as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True until the server has issued a token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RevisionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One-time credential authorizing a diagnosis key upload.
///
/// `Debug` is redacted; the value only leaves the process inside an upload.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionCertificate(String);

impl SubmissionCertificate {
    /// Wrap a certificate string.
    pub fn new(certificate: impl Into<String>) -> Self {
        Self(certificate.into())
    }

    /// Get the certificate as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubmissionCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubmissionCertificate(<redacted {} chars>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_entry() {
        let key = ExposureKey::new("z2Cx9hdz2SlxZ8GEgqTYpA==", 2_650_847, 144, 1);
        assert_eq!(key.canonical_entry(), "z2Cx9hdz2SlxZ8GEgqTYpA==.2650847.144.1");
    }

    #[test]
    fn test_key_wire_field_names() {
        let key = ExposureKey::new("abc", 10, 144, 3);
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["rollingStartNumber"], 10);
        assert_eq!(json["rollingPeriod"], 144);
        assert_eq!(json["transmissionRisk"], 3);
    }

    #[test]
    fn test_certificate_debug_is_redacted() {
        let cert = SubmissionCertificate::new("cert-123");
        let debug = format!("{:?}", cert);
        assert!(!debug.contains("cert-123"));
    }
}

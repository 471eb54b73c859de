//! Environment-level configuration.
//!
//! ## Variables
//!
//! - `REGION_CODES`: comma-separated affected region codes (required)
//! - `ANDROID_APPLICATION_ID`: platform package identifier (required)
//! - `PROXY_OTP`: one-time submission certificate (optional; unset or empty
//!   disables key submission)
//! - `POST_DIAGNOSIS_KEYS_URL`: diagnosis key server endpoint (optional)

use tracing::{debug, warn};

use crate::types::SubmissionCertificate;

/// Region codes variable.
pub const REGION_CODES_VAR: &str = "REGION_CODES";
/// Package identifier variable.
pub const APP_PACKAGE_VAR: &str = "ANDROID_APPLICATION_ID";
/// Submission certificate variable.
pub const CERTIFICATE_VAR: &str = "PROXY_OTP";
/// Key server endpoint variable.
pub const KEY_SERVER_URL_VAR: &str = "POST_DIAGNOSIS_KEYS_URL";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing configuration variable: {0}")]
    Missing(&'static str),

    /// A variable is set but unusable.
    #[error("Invalid configuration variable {var}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Configuration consumed by the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureConfig {
    /// Affected region codes, in configured order.
    pub region_codes: Vec<String>,
    /// Application package/bundle identifier.
    pub app_package_name: String,
    /// Certificate authorizing an upload; `None` for ordinary users.
    pub certificate: Option<SubmissionCertificate>,
    /// Diagnosis key server endpoint.
    pub key_server_url: Option<String>,
}

impl ExposureConfig {
    /// Build a configuration directly.
    pub fn new(region_codes: &str, app_package_name: impl Into<String>) -> Self {
        Self {
            region_codes: parse_region_codes(region_codes),
            app_package_name: app_package_name.into(),
            certificate: None,
            key_server_url: None,
        }
    }

    /// Set the submission certificate.
    pub fn with_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.certificate = Some(SubmissionCertificate::new(certificate));
        self
    }

    /// Set the key server endpoint.
    pub fn with_key_server_url(mut self, url: impl Into<String>) -> Self {
        self.key_server_url = Some(url.into());
        self
    }

    /// Load from process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_regions = lookup(REGION_CODES_VAR).ok_or(ConfigError::Missing(REGION_CODES_VAR))?;
        let region_codes = parse_region_codes(&raw_regions);
        if region_codes.is_empty() {
            return Err(ConfigError::Invalid {
                var: REGION_CODES_VAR,
                reason: "no region codes listed".to_string(),
            });
        }

        let app_package_name = lookup(APP_PACKAGE_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(APP_PACKAGE_VAR))?;

        let certificate = lookup(CERTIFICATE_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(SubmissionCertificate::new);

        let key_server_url = lookup(KEY_SERVER_URL_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if certificate.is_some() && key_server_url.is_none() {
            warn!(
                "{} is set but {} is not; uploads need an explicitly wired API client",
                CERTIFICATE_VAR, KEY_SERVER_URL_VAR
            );
        }

        debug!(
            regions = ?region_codes,
            app_package_name = %app_package_name,
            certificate_configured = certificate.is_some(),
            "exposure configuration loaded"
        );

        Ok(Self {
            region_codes,
            app_package_name,
            certificate,
            key_server_url,
        })
    }

    /// Whether key submission is enabled.
    pub fn submission_enabled(&self) -> bool {
        self.certificate.is_some()
    }
}

/// Split a comma-separated region list. Entries are trimmed; empty entries
/// are dropped.
pub fn parse_region_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

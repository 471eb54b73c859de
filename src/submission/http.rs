//! HTTP client for the diagnosis key server.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::upload::ServerErrorBody;
use super::{ApiError, DiagnosisKeyApi, DiagnosisKeyUpload, SubmissionReceipt};
use crate::config::{ConfigError, ExposureConfig, KEY_SERVER_URL_VAR};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts uploads as JSON to the key server's publish endpoint.
#[derive(Debug, Clone)]
pub struct HttpDiagnosisKeyApi {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpDiagnosisKeyApi {
    /// Create a client for an endpoint.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("exposure-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// Create a client for the configured endpoint.
    pub fn from_config(config: &ExposureConfig) -> Result<Self, ConfigError> {
        let endpoint = config
            .key_server_url
            .clone()
            .ok_or(ConfigError::Missing(KEY_SERVER_URL_VAR))?;

        Self::new(endpoint, DEFAULT_TIMEOUT).map_err(|e| ConfigError::Invalid {
            var: KEY_SERVER_URL_VAR,
            reason: e.to_string(),
        })
    }

    /// The publish endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DiagnosisKeyApi for HttpDiagnosisKeyApi {
    async fn post_diagnosis_keys(
        &self,
        upload: &DiagnosisKeyUpload,
    ) -> Result<SubmissionReceipt, ApiError> {
        debug!(endpoint = %self.endpoint, keys = upload.exposure_keys.len(), "posting diagnosis keys");

        let response = self
            .http
            .post(&self.endpoint)
            .json(upload)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        receipt_from_response(status, body)
    }
}

/// Map a key server answer to a receipt or an [`ApiError`].
///
/// An empty success body yields a default receipt.
fn receipt_from_response(
    status: reqwest::StatusCode,
    body: String,
) -> Result<SubmissionReceipt, ApiError> {
    if !status.is_success() {
        let message = serde_json::from_str::<ServerErrorBody>(&body)
            .ok()
            .and_then(|b| b.message())
            .unwrap_or(body);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(SubmissionReceipt::default());
    }

    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

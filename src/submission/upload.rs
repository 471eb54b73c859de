//! Diagnosis key upload payload and server receipt.

use serde::{Deserialize, Serialize};

use crate::signing::HmacOutput;
use crate::types::{ExposureKey, RevisionToken, SubmissionCertificate};

/// Symptom-onset interval sent with every upload.
///
/// Known simplification: the onset date is not collected, so the offset is
/// always zero.
pub const SYMPTOM_ONSET_PLACEHOLDER: i32 = 0;

/// Everything sent to the diagnosis key server for one submission.
///
/// Field order follows the upload contract: keys, regions, certificate,
/// HMAC key, package name, revision token, symptom onset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisKeyUpload {
    /// Keys from the local store, in native order.
    #[serde(rename = "temporaryExposureKeys")]
    pub exposure_keys: Vec<ExposureKey>,
    /// Affected region codes.
    #[serde(rename = "regions")]
    pub region_codes: Vec<String>,
    /// One-time authorization certificate.
    #[serde(rename = "verificationPayload")]
    pub certificate: SubmissionCertificate,
    /// Base64 HMAC secret.
    #[serde(rename = "hmackey")]
    pub hmac_key: String,
    /// Application package identifier.
    pub app_package_name: String,
    /// Revision token; empty on first upload.
    pub revision_token: RevisionToken,
    /// Symptom-onset offset in days.
    #[serde(rename = "symptomOnsetInterval")]
    pub symptom_onset: i32,
    /// Base64 digest of the canonical key set. Bound to the certificate
    /// server-side, so it is not part of the body.
    #[serde(skip)]
    pub hmac_digest: String,
}

impl DiagnosisKeyUpload {
    /// Assemble an upload from its parts.
    pub fn new(
        exposure_keys: Vec<ExposureKey>,
        region_codes: Vec<String>,
        certificate: SubmissionCertificate,
        hmac: HmacOutput,
        app_package_name: String,
        revision_token: RevisionToken,
        symptom_onset: i32,
    ) -> Self {
        Self {
            exposure_keys,
            region_codes,
            certificate,
            hmac_key: hmac.key,
            app_package_name,
            revision_token,
            symptom_onset,
            hmac_digest: hmac.digest,
        }
    }

    /// JSON request body.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Successful server answer to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// Token to send with the next upload from this device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_token: Option<RevisionToken>,
    /// Number of keys the server stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_exposures: Option<u32>,
}

/// Error body returned by the key server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl ServerErrorBody {
    /// Best human-readable message.
    pub fn message(&self) -> Option<String> {
        match (&self.error, &self.code) {
            (Some(error), Some(code)) => Some(format!("{} ({})", error, code)),
            (Some(error), None) => Some(error.clone()),
            (None, Some(code)) => Some(code.clone()),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> DiagnosisKeyUpload {
        DiagnosisKeyUpload::new(
            vec![ExposureKey::new("k1", 100, 144, 1)],
            vec!["US".to_string(), "CA".to_string()],
            SubmissionCertificate::new("cert-123"),
            HmacOutput {
                digest: "digest==".to_string(),
                key: "key==".to_string(),
            },
            "org.example.gaen".to_string(),
            RevisionToken::new("rev-7"),
            SYMPTOM_ONSET_PLACEHOLDER,
        )
    }

    #[test]
    fn test_wire_body() {
        let body: serde_json::Value = serde_json::from_slice(&upload().to_json().unwrap()).unwrap();

        assert_eq!(body["temporaryExposureKeys"][0]["key"], "k1");
        assert_eq!(body["temporaryExposureKeys"][0]["rollingStartNumber"], 100);
        assert_eq!(body["regions"], serde_json::json!(["US", "CA"]));
        assert_eq!(body["verificationPayload"], "cert-123");
        assert_eq!(body["hmackey"], "key==");
        assert_eq!(body["appPackageName"], "org.example.gaen");
        assert_eq!(body["revisionToken"], "rev-7");
        assert_eq!(body["symptomOnsetInterval"], 0);
        assert!(body.get("hmacDigest").is_none());
    }

    #[test]
    fn test_receipt_parsing() {
        let receipt: SubmissionReceipt =
            serde_json::from_str(r#"{"revisionToken":"rev-8","insertedExposures":14}"#).unwrap();
        assert_eq!(receipt.revision_token, Some(RevisionToken::new("rev-8")));
        assert_eq!(receipt.inserted_exposures, Some(14));

        let empty: SubmissionReceipt = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, SubmissionReceipt::default());
    }

    #[test]
    fn test_server_error_message() {
        let body: ServerErrorBody =
            serde_json::from_str(r#"{"error":"certificate expired","code":"invalid_verification"}"#).unwrap();
        assert_eq!(body.message().unwrap(), "certificate expired (invalid_verification)");
        assert_eq!(ServerErrorBody::default().message(), None);
    }
}

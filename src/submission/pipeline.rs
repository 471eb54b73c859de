//! The submission pipeline.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::upload::{DiagnosisKeyUpload, SubmissionReceipt, SYMPTOM_ONSET_PLACEHOLDER};
use super::{DiagnosisKeyApi, SubmissionError};
use crate::canonical::key_set_fingerprint;
use crate::config::ExposureConfig;
use crate::native::ExposureNative;
use crate::signing::{HmacSigner, KeySetSigner};
use crate::types::analytics::{EPI_ANALYTICS_CATEGORY, NOTIFICATION_RECEIVED_ACTION};
use crate::types::{AnalyticsSink, ExposureInfo, NoOpAnalytics, SubmissionCertificate};

/// What a submission attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// No certificate configured; nothing was fetched or sent.
    Skipped,
    /// The server accepted the upload.
    Submitted {
        /// Number of keys uploaded.
        key_count: usize,
        /// Server receipt.
        receipt: SubmissionReceipt,
    },
}

/// Result of reacting to one exposure event.
#[derive(Debug, Clone)]
pub struct SubmissionReport {
    /// Correlates log lines of one attempt.
    pub attempt_id: Uuid,
    /// Exposures carried by the triggering event.
    pub event_exposures: usize,
    /// When the attempt finished.
    pub completed_at: DateTime<Utc>,
    /// Outcome or the step that failed.
    pub result: Result<SubmissionOutcome, SubmissionError>,
}

impl SubmissionReport {
    /// Whether keys were uploaded.
    pub fn is_submitted(&self) -> bool {
        matches!(self.result, Ok(SubmissionOutcome::Submitted { .. }))
    }

    /// Whether the attempt was a no-op.
    pub fn is_skipped(&self) -> bool {
        matches!(self.result, Ok(SubmissionOutcome::Skipped))
    }
}

/// Uploads local exposure keys when an exposure event arrives.
///
/// Holds no mutable state shared with the state manager. No retry is
/// performed; every event yields exactly one attempt.
pub struct DiagnosisKeySubmitter<N: ExposureNative + 'static, A: DiagnosisKeyApi + 'static> {
    native: Arc<N>,
    api: Arc<A>,
    region_codes: Vec<String>,
    app_package_name: String,
    certificate: Option<SubmissionCertificate>,
    signer: Arc<dyn KeySetSigner>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl<N: ExposureNative + 'static, A: DiagnosisKeyApi + 'static> DiagnosisKeySubmitter<N, A> {
    /// Create a submitter with a freshly generated HMAC secret.
    pub fn new(native: Arc<N>, api: Arc<A>, config: &ExposureConfig) -> Self {
        Self {
            native,
            api,
            region_codes: config.region_codes.clone(),
            app_package_name: config.app_package_name.clone(),
            certificate: config.certificate.clone(),
            signer: Arc::new(HmacSigner::generate()),
            analytics: Arc::new(NoOpAnalytics),
        }
    }

    /// Replace the key-set signer.
    pub fn with_signer(mut self, signer: Arc<dyn KeySetSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Report notifications to an analytics sink.
    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Whether events will trigger uploads.
    pub fn is_enabled(&self) -> bool {
        self.certificate.is_some()
    }

    /// React to one exposure event.
    ///
    /// The payload only triggers the attempt; keys are always read fresh
    /// from the native store.
    pub async fn handle_exposure_event(&self, event: &ExposureInfo) -> SubmissionReport {
        let attempt_id = Uuid::new_v4();
        self.analytics
            .track_event(EPI_ANALYTICS_CATEGORY, NOTIFICATION_RECEIVED_ACTION);

        let span = info_span!("diagnosis_key_submission", attempt_id = %attempt_id);
        let result = self.submit().instrument(span).await;

        match &result {
            Ok(SubmissionOutcome::Skipped) => {
                debug!(attempt_id = %attempt_id, "no submission certificate, skipping key upload");
            }
            Ok(SubmissionOutcome::Submitted { key_count, receipt }) => {
                info!(
                    attempt_id = %attempt_id,
                    key_count = key_count,
                    inserted = ?receipt.inserted_exposures,
                    "diagnosis keys submitted"
                );
            }
            Err(e) => {
                warn!(attempt_id = %attempt_id, error = %e, "diagnosis key submission failed");
            }
        }

        SubmissionReport {
            attempt_id,
            event_exposures: event.len(),
            completed_at: Utc::now(),
            result,
        }
    }

    /// Run the pipeline once.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SubmissionError> {
        let Some(certificate) = self.certificate.clone() else {
            return Ok(SubmissionOutcome::Skipped);
        };

        let exposure_keys = self.native.get_exposure_keys().await?;
        debug!(
            key_count = exposure_keys.len(),
            key_set = %key_set_fingerprint(&exposure_keys),
            "exposure keys retrieved"
        );

        let region_codes = self.region_codes.clone();
        debug!(regions = ?region_codes, "region codes");
        debug!(certificate = ?certificate, "certificate");

        let hmac = self.signer.sign(&exposure_keys)?;
        debug!("key set signed");

        let app_package_name = self.app_package_name.clone();
        debug!(app_package_name = %app_package_name, "app package name");

        let revision_token = self.native.get_revision_token().await?;
        debug!(has_revision_token = !revision_token.is_empty(), "revision token retrieved");

        // Onset date is not collected yet.
        let symptom_onset = SYMPTOM_ONSET_PLACEHOLDER;

        let key_count = exposure_keys.len();
        let upload = DiagnosisKeyUpload::new(
            exposure_keys,
            region_codes,
            certificate,
            hmac,
            app_package_name,
            revision_token,
            symptom_onset,
        );

        let receipt = self.api.post_diagnosis_keys(&upload).await?;

        if let Some(token) = receipt.revision_token.as_ref().filter(|t| !t.is_empty()) {
            if let Err(e) = self.native.store_revision_token(token).await {
                warn!(error = %e, "failed to persist revision token from key server");
            }
        }

        Ok(SubmissionOutcome::Submitted { key_count, receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{InMemoryExposureNative, NativeCall};
    use crate::signing::{calculate_hmac, HmacError, HmacOutput, HmacSecret};
    use crate::submission::{ApiError, RecordingDiagnosisKeyApi};
    use crate::types::{ExposureKey, RecordingAnalytics, RevisionToken};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_SECRET: &[u8] = b"pipeline-test-secret";

    struct CountingSigner {
        inner: HmacSigner,
        calls: AtomicUsize,
    }

    impl KeySetSigner for CountingSigner {
        fn sign(&self, keys: &[ExposureKey]) -> Result<HmacOutput, HmacError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.sign(keys)
        }
    }

    struct FailingSigner;

    impl KeySetSigner for FailingSigner {
        fn sign(&self, _keys: &[ExposureKey]) -> Result<HmacOutput, HmacError> {
            Err(HmacError::InvalidKeyLength(0))
        }
    }

    fn keys() -> Vec<ExposureKey> {
        vec![
            ExposureKey::new("k1AAAAAAAAAAAAAAAAAAAA==", 2_650_000, 144, 1),
            ExposureKey::new("k2AAAAAAAAAAAAAAAAAAAA==", 2_650_144, 144, 1),
        ]
    }

    fn setup(
        config: ExposureConfig,
    ) -> (
        Arc<InMemoryExposureNative>,
        Arc<RecordingDiagnosisKeyApi>,
        Arc<CountingSigner>,
        DiagnosisKeySubmitter<InMemoryExposureNative, RecordingDiagnosisKeyApi>,
    ) {
        let native = Arc::new(InMemoryExposureNative::new());
        let api = Arc::new(RecordingDiagnosisKeyApi::new());
        let signer = Arc::new(CountingSigner {
            inner: HmacSigner::new(HmacSecret::from_bytes(TEST_SECRET)),
            calls: AtomicUsize::new(0),
        });
        let submitter = DiagnosisKeySubmitter::new(Arc::clone(&native), Arc::clone(&api), &config)
            .with_signer(signer.clone());
        (native, api, signer, submitter)
    }

    #[tokio::test]
    async fn test_no_certificate_is_noop() {
        let (native, api, signer, submitter) = setup(ExposureConfig::new("US", "org.example"));
        native.set_keys(keys());

        let report = submitter.handle_exposure_event(&ExposureInfo::empty()).await;

        assert!(report.is_skipped());
        assert!(!submitter.is_enabled());
        assert_eq!(api.upload_count(), 0);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(native.call_count(NativeCall::GetExposureKeys), 0);
        assert_eq!(native.call_count(NativeCall::GetRevisionToken), 0);
    }

    #[tokio::test]
    async fn test_upload_fields() {
        let config = ExposureConfig::new("US,CA", "org.example.gaen").with_certificate("cert-123");
        let (native, api, signer, submitter) = setup(config);
        native.set_keys(keys());
        native.set_revision_token(RevisionToken::new("rev-7"));

        let report = submitter.handle_exposure_event(&ExposureInfo::empty()).await;
        assert!(report.is_submitted());

        let uploads = api.uploads();
        assert_eq!(uploads.len(), 1);
        let upload = &uploads[0];
        let expected = calculate_hmac(&HmacSecret::from_bytes(TEST_SECRET), &keys()).unwrap();

        assert_eq!(upload.exposure_keys, keys());
        assert_eq!(upload.region_codes, vec!["US", "CA"]);
        assert_eq!(upload.certificate.as_str(), "cert-123");
        assert_eq!(upload.hmac_key, expected.key);
        assert_eq!(upload.hmac_digest, expected.digest);
        assert_eq!(upload.app_package_name, "org.example.gaen");
        assert_eq!(upload.revision_token.as_str(), "rev-7");
        assert_eq!(upload.symptom_onset, 0);

        assert_eq!(native.call_count(NativeCall::GetExposureKeys), 1);
        assert_eq!(native.call_count(NativeCall::GetRevisionToken), 1);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_receipt_token_is_stored() {
        let config = ExposureConfig::new("US", "org.example").with_certificate("cert");
        let (native, api, _, submitter) = setup(config);
        native.set_keys(keys());
        api.push_response(Ok(SubmissionReceipt {
            revision_token: Some(RevisionToken::new("rev-8")),
            inserted_exposures: Some(2),
        }));

        submitter.submit().await.unwrap();
        assert_eq!(native.revision_token().as_str(), "rev-8");
    }

    #[tokio::test]
    async fn test_native_failure_stops_pipeline() {
        let config = ExposureConfig::new("US", "org.example").with_certificate("cert");
        let (native, api, signer, submitter) = setup(config);
        native.fail_call(NativeCall::GetExposureKeys);

        let report = submitter.handle_exposure_event(&ExposureInfo::empty()).await;
        assert!(matches!(report.result, Err(SubmissionError::Native(_))));
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_hmac_failure_stops_pipeline() {
        let config = ExposureConfig::new("US", "org.example").with_certificate("cert");
        let (native, api, _, submitter) = setup(config);
        let submitter = submitter.with_signer(Arc::new(FailingSigner));
        native.set_keys(keys());

        let err = submitter.submit().await.unwrap_err();
        assert_eq!(err, SubmissionError::Hmac(HmacError::InvalidKeyLength(0)));
        assert_eq!(native.call_count(NativeCall::GetRevisionToken), 0);
        assert_eq!(api.upload_count(), 0);
    }

    #[tokio::test]
    async fn test_api_failure_is_reported_not_retried() {
        let config = ExposureConfig::new("US", "org.example").with_certificate("cert");
        let (native, api, _, submitter) = setup(config);
        native.set_keys(keys());
        api.push_response(Err(ApiError::Network("connection reset".to_string())));

        let report = submitter.handle_exposure_event(&ExposureInfo::empty()).await;
        assert_eq!(
            report.result,
            Err(SubmissionError::Api(ApiError::Network("connection reset".to_string())))
        );
        assert_eq!(api.upload_count(), 1);
        assert_eq!(native.call_count(NativeCall::StoreRevisionToken), 0);
    }

    #[tokio::test]
    async fn test_analytics_counts_every_event() {
        let analytics = Arc::new(RecordingAnalytics::default());
        let (_, _, _, submitter) = setup(ExposureConfig::new("US", "org.example"));
        let submitter = submitter.with_analytics(analytics.clone());

        submitter.handle_exposure_event(&ExposureInfo::empty()).await;
        submitter.handle_exposure_event(&ExposureInfo::empty()).await;

        assert_eq!(analytics.notifications_received(), 2);
    }
}

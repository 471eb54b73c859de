//! In-memory native subsystem for testing and host simulators.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use super::{ExposureNative, NativeCall, NativeError};
use crate::events::{ExposureEventBus, ExposureSubscription};
use crate::types::{
    DetectExposuresResponse, DetectionTimestamp, ExposureInfo, ExposureKey, RevisionToken,
};

#[derive(Debug, Default)]
struct NativeState {
    exposures: ExposureInfo,
    /// Exposures promoted to current by the next successful detection.
    staged_exposures: Option<ExposureInfo>,
    last_detection: Option<DetectionTimestamp>,
    keys: Vec<ExposureKey>,
    revision_token: RevisionToken,
    /// Scripted detection responses; `Success` when exhausted.
    detect_responses: VecDeque<DetectExposuresResponse>,
    failing: BTreeSet<NativeCall>,
    delays: BTreeMap<NativeCall, Duration>,
    calls: BTreeMap<NativeCall, u64>,
}

/// In-memory native subsystem.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order.
#[derive(Debug, Default)]
pub struct InMemoryExposureNative {
    state: Mutex<NativeState>,
    bus: ExposureEventBus,
}

impl InMemoryExposureNative {
    /// Create an empty subsystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current exposures.
    pub fn set_exposures(&self, exposures: ExposureInfo) {
        self.state.lock().exposures = exposures;
    }

    /// Exposures that the next successful detection pass will report.
    pub fn stage_detection_result(&self, exposures: ExposureInfo) {
        self.state.lock().staged_exposures = Some(exposures);
    }

    /// Set the last detection date.
    pub fn set_last_detection(&self, timestamp: Option<DetectionTimestamp>) {
        self.state.lock().last_detection = timestamp;
    }

    /// Replace the local key store.
    pub fn set_keys(&self, keys: Vec<ExposureKey>) {
        self.state.lock().keys = keys;
    }

    /// Replace the stored revision token.
    pub fn set_revision_token(&self, token: RevisionToken) {
        self.state.lock().revision_token = token;
    }

    /// Currently stored revision token.
    pub fn revision_token(&self) -> RevisionToken {
        self.state.lock().revision_token.clone()
    }

    /// Queue a response for a future `detect_exposures` call.
    pub fn push_detect_response(&self, response: DetectExposuresResponse) {
        self.state.lock().detect_responses.push_back(response);
    }

    /// Make a call fail with a bridge error until cleared.
    pub fn fail_call(&self, call: NativeCall) {
        self.state.lock().failing.insert(call);
    }

    /// Stop failing a call.
    pub fn clear_failure(&self, call: NativeCall) {
        self.state.lock().failing.remove(&call);
    }

    /// Delay a call before it answers.
    pub fn set_delay(&self, call: NativeCall, delay: Duration) {
        self.state.lock().delays.insert(call, delay);
    }

    /// Number of times a call was made.
    pub fn call_count(&self, call: NativeCall) -> u64 {
        self.state.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Update current exposures and notify subscribers, like a finished
    /// background matching run.
    ///
    /// Returns the number of subscribers notified.
    pub fn emit_exposure_event(&self, exposures: ExposureInfo) -> usize {
        self.state.lock().exposures = exposures.clone();
        self.bus.emit(exposures)
    }

    /// Number of live event subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    /// Record a call, apply its delay, and check injected failures.
    async fn enter(&self, call: NativeCall) -> Result<(), NativeError> {
        let delay = {
            let mut state = self.state.lock();
            *state.calls.entry(call).or_insert(0) += 1;
            state.delays.get(&call).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.lock().failing.contains(&call) {
            return Err(NativeError::bridge(call, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ExposureNative for InMemoryExposureNative {
    async fn get_current_exposures(&self) -> Result<ExposureInfo, NativeError> {
        self.enter(NativeCall::GetCurrentExposures).await?;
        Ok(self.state.lock().exposures.clone())
    }

    async fn fetch_last_exposure_detection_date(
        &self,
    ) -> Result<Option<DetectionTimestamp>, NativeError> {
        self.enter(NativeCall::FetchLastDetectionDate).await?;
        Ok(self.state.lock().last_detection)
    }

    async fn get_exposure_keys(&self) -> Result<Vec<ExposureKey>, NativeError> {
        self.enter(NativeCall::GetExposureKeys).await?;
        Ok(self.state.lock().keys.clone())
    }

    async fn get_revision_token(&self) -> Result<RevisionToken, NativeError> {
        self.enter(NativeCall::GetRevisionToken).await?;
        Ok(self.state.lock().revision_token.clone())
    }

    async fn store_revision_token(&self, token: &RevisionToken) -> Result<(), NativeError> {
        self.enter(NativeCall::StoreRevisionToken).await?;
        self.state.lock().revision_token = token.clone();
        Ok(())
    }

    async fn detect_exposures(&self) -> Result<DetectExposuresResponse, NativeError> {
        self.enter(NativeCall::DetectExposures).await?;

        let mut state = self.state.lock();
        let response = state
            .detect_responses
            .pop_front()
            .unwrap_or(DetectExposuresResponse::Success);

        if response.is_success() {
            if let Some(staged) = state.staged_exposures.take() {
                state.exposures = staged;
            }
            state.last_detection = Some(DetectionTimestamp::now());
        }

        Ok(response)
    }

    fn subscribe_to_exposure_events(&self) -> ExposureSubscription {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectionFailureReason, ExposureRecord};

    #[tokio::test]
    async fn test_detect_promotes_staged_exposures() {
        let native = InMemoryExposureNative::new();
        let staged = ExposureInfo::new(vec![ExposureRecord::new("e1", 0, 15, 3, 2)]);
        native.stage_detection_result(staged.clone());

        assert!(native.get_current_exposures().await.unwrap().is_empty());
        assert!(native.detect_exposures().await.unwrap().is_success());
        assert_eq!(native.get_current_exposures().await.unwrap(), staged);
        assert!(native.fetch_last_exposure_detection_date().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_scripted_failure_keeps_state() {
        let native = InMemoryExposureNative::new();
        native.stage_detection_result(ExposureInfo::new(vec![ExposureRecord::new("e1", 0, 15, 3, 2)]));
        native.push_detect_response(DetectExposuresResponse::failure(DetectionFailureReason::Busy));

        let response = native.detect_exposures().await.unwrap();
        assert!(!response.is_success());
        assert!(native.get_current_exposures().await.unwrap().is_empty());
        assert!(native.fetch_last_exposure_detection_date().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure_and_call_counts() {
        let native = InMemoryExposureNative::new();
        native.fail_call(NativeCall::GetExposureKeys);

        let err = native.get_exposure_keys().await.unwrap_err();
        assert!(matches!(err, NativeError::Bridge { call: NativeCall::GetExposureKeys, .. }));

        native.clear_failure(NativeCall::GetExposureKeys);
        assert!(native.get_exposure_keys().await.is_ok());
        assert_eq!(native.call_count(NativeCall::GetExposureKeys), 2);
        assert_eq!(native.call_count(NativeCall::GetRevisionToken), 0);
    }

    #[tokio::test]
    async fn test_revision_token_store() {
        let native = InMemoryExposureNative::new();
        assert!(native.get_revision_token().await.unwrap().is_empty());

        native.store_revision_token(&RevisionToken::new("rev-1")).await.unwrap();
        assert_eq!(native.get_revision_token().await.unwrap().as_str(), "rev-1");
    }

    #[tokio::test]
    async fn test_emit_updates_current_exposures() {
        let native = InMemoryExposureNative::new();
        let mut sub = native.subscribe_to_exposure_events();
        let info = ExposureInfo::new(vec![ExposureRecord::new("e9", 0, 5, 1, 1)]);

        assert_eq!(native.emit_exposure_event(info.clone()), 1);
        assert_eq!(*sub.next().await.unwrap(), info);
        assert_eq!(native.get_current_exposures().await.unwrap(), info);
    }
}

//! Recording key server for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{ApiError, DiagnosisKeyApi, DiagnosisKeyUpload, SubmissionReceipt};

/// Key server double that records every upload.
///
/// Answers with queued results first, then with an empty receipt.
#[derive(Debug, Default)]
pub struct RecordingDiagnosisKeyApi {
    uploads: Mutex<Vec<DiagnosisKeyUpload>>,
    responses: Mutex<VecDeque<Result<SubmissionReceipt, ApiError>>>,
}

impl RecordingDiagnosisKeyApi {
    /// Create a server that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of a future upload.
    pub fn push_response(&self, response: Result<SubmissionReceipt, ApiError>) {
        self.responses.lock().push_back(response);
    }

    /// Uploads received so far.
    pub fn uploads(&self) -> Vec<DiagnosisKeyUpload> {
        self.uploads.lock().clone()
    }

    /// Number of uploads received.
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl DiagnosisKeyApi for RecordingDiagnosisKeyApi {
    async fn post_diagnosis_keys(
        &self,
        upload: &DiagnosisKeyUpload,
    ) -> Result<SubmissionReceipt, ApiError> {
        self.uploads.lock().push(upload.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SubmissionReceipt::default()))
    }
}

//! Exposure state manager.
//!
//! Single source of truth for what the device currently believes about its
//! exposure status. The cached snapshot is owned here and only written by
//! this module's operations; everyone else reads.
//!
//! ## Consistency
//!
//! - `refresh_exposure_info` writes exposures and detection timestamp in one
//!   critical section, so readers never see one without the other
//! - Concurrent refreshes are last-writer-wins by completion order
//! - `detect_exposures` returns only after its refresh has been applied

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::native::{ExposureNative, NativeError};
use crate::types::{
    DetectExposuresResponse, DetectionTimestamp, ExposureInfo, ExposureKey, RevisionToken,
};

/// Whether the cache has been filled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    /// No event or refresh has completed.
    #[default]
    Uninitialized,
    /// Holds values from at least one event or refresh, including a
    /// timestamp-only refresh.
    Populated,
}

/// Cached exposure state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposureSnapshot {
    /// Exposures as of the last event or refresh.
    pub exposure_info: ExposureInfo,
    /// When detection last ran, if ever.
    pub last_detection: Option<DetectionTimestamp>,
    /// Cache lifecycle.
    pub state: CacheState,
}

impl ExposureSnapshot {
    /// Whether the cache has been filled.
    pub fn is_populated(&self) -> bool {
        self.state == CacheState::Populated
    }
}

/// Owns cached exposure state and mediates native access.
pub struct ExposureStateManager<N: ExposureNative + 'static> {
    native: Arc<N>,
    snapshot: Arc<RwLock<ExposureSnapshot>>,
}

impl<N: ExposureNative + 'static> ExposureStateManager<N> {
    /// Create a manager with an uninitialized cache.
    pub fn new(native: Arc<N>) -> Self {
        Self {
            native,
            snapshot: Arc::new(RwLock::new(ExposureSnapshot::default())),
        }
    }

    /// The native subsystem this manager talks to.
    pub fn native(&self) -> &Arc<N> {
        &self.native
    }

    // ------------------------------------------------------------------
    // Cache reads
    // ------------------------------------------------------------------

    /// Copy of the full cached snapshot.
    pub fn snapshot(&self) -> ExposureSnapshot {
        self.snapshot.read().clone()
    }

    /// Cached exposures.
    pub fn exposure_info(&self) -> ExposureInfo {
        self.snapshot.read().exposure_info.clone()
    }

    /// Cached last detection timestamp.
    pub fn last_detection(&self) -> Option<DetectionTimestamp> {
        self.snapshot.read().last_detection
    }

    // ------------------------------------------------------------------
    // Cache writes
    // ------------------------------------------------------------------

    /// Fetch exposures and the last detection date, then replace both.
    pub async fn refresh_exposure_info(&self) -> Result<(), NativeError> {
        let exposure_info = self.native.get_current_exposures().await?;
        let last_detection = self.native.fetch_last_exposure_detection_date().await?;

        debug!(
            exposures = exposure_info.len(),
            last_detection = ?last_detection,
            "exposure info refreshed"
        );

        *self.snapshot.write() = ExposureSnapshot {
            exposure_info,
            last_detection,
            state: CacheState::Populated,
        };
        Ok(())
    }

    /// Fetch only the last detection date.
    ///
    /// This also marks the cache populated. At startup that means
    /// `is_populated()` can be true while the exposures are still the empty
    /// default; it says a refresh or event landed, not that exposures are known.
    pub async fn refresh_detection_timestamp(&self) -> Result<(), NativeError> {
        let last_detection = self.native.fetch_last_exposure_detection_date().await?;

        let mut snapshot = self.snapshot.write();
        snapshot.last_detection = last_detection;
        snapshot.state = CacheState::Populated;
        Ok(())
    }

    /// Run a native detection pass.
    ///
    /// On success the cache is refreshed before this returns. On failure the
    /// cache is left as it was.
    pub async fn detect_exposures(&self) -> Result<DetectExposuresResponse, NativeError> {
        let response = self.native.detect_exposures().await?;

        match &response {
            DetectExposuresResponse::Success => {
                self.refresh_exposure_info().await?;
                info!(exposures = self.snapshot.read().exposure_info.len(), "exposure detection completed");
            }
            DetectExposuresResponse::Failure(failure) => {
                warn!(reason = %failure.reason, "exposure detection failed");
            }
        }

        Ok(response)
    }

    /// Adopt an event payload, then refresh the detection timestamp.
    ///
    /// The payload replaces the cached exposures as-is.
    pub(crate) async fn apply_exposure_event(&self, exposure_info: &ExposureInfo) {
        {
            let mut snapshot = self.snapshot.write();
            snapshot.exposure_info = exposure_info.clone();
            snapshot.state = CacheState::Populated;
        }
        debug!(exposures = exposure_info.len(), "exposure event adopted");

        if let Err(e) = self.refresh_detection_timestamp().await {
            warn!(error = %e, "failed to refresh detection timestamp after exposure event");
        }
    }

    // ------------------------------------------------------------------
    // Native pass-through
    // ------------------------------------------------------------------

    /// Current exposures straight from native.
    pub async fn get_current_exposures(&self) -> Result<ExposureInfo, NativeError> {
        self.native.get_current_exposures().await
    }

    /// Local exposure keys straight from native.
    pub async fn get_exposure_keys(&self) -> Result<Vec<ExposureKey>, NativeError> {
        self.native.get_exposure_keys().await
    }

    /// Stored revision token straight from native.
    pub async fn get_revision_token(&self) -> Result<RevisionToken, NativeError> {
        self.native.get_revision_token().await
    }

    /// Store a revision token in the native secure store.
    pub async fn store_revision_token(&self, token: &RevisionToken) -> Result<(), NativeError> {
        self.native.store_revision_token(token).await
    }
}

impl<N: ExposureNative + 'static> Clone for ExposureStateManager<N> {
    fn clone(&self) -> Self {
        Self {
            native: Arc::clone(&self.native),
            snapshot: Arc::clone(&self.snapshot),
        }
    }
}

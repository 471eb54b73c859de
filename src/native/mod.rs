//! Bridge to the platform exposure-notification subsystem.
//!
//! The platform owns key generation, matching and secure storage. This
//! crate only talks to it through [`ExposureNative`]; the host application
//! provides the implementation.

pub mod memory;

use async_trait::async_trait;
use std::fmt;

use crate::events::ExposureSubscription;
use crate::types::{
    DetectExposuresResponse, DetectionTimestamp, ExposureInfo, ExposureKey, RevisionToken,
};

/// Native calls, used for error context and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NativeCall {
    /// `get_current_exposures`
    GetCurrentExposures,
    /// `fetch_last_exposure_detection_date`
    FetchLastDetectionDate,
    /// `get_exposure_keys`
    GetExposureKeys,
    /// `get_revision_token`
    GetRevisionToken,
    /// `store_revision_token`
    StoreRevisionToken,
    /// `detect_exposures`
    DetectExposures,
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetCurrentExposures => "get_current_exposures",
            Self::FetchLastDetectionDate => "fetch_last_exposure_detection_date",
            Self::GetExposureKeys => "get_exposure_keys",
            Self::GetRevisionToken => "get_revision_token",
            Self::StoreRevisionToken => "store_revision_token",
            Self::DetectExposures => "detect_exposures",
        };
        write!(f, "{}", name)
    }
}

/// Error returned by the native bridge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The exposure-notification subsystem is not available on this device.
    #[error("Exposure notification subsystem unavailable")]
    Unavailable,

    /// A bridge call failed.
    #[error("Native call {call} failed: {message}")]
    Bridge {
        /// The call that failed.
        call: NativeCall,
        /// Platform error message.
        message: String,
    },
}

impl NativeError {
    /// Bridge failure for a call.
    pub fn bridge(call: NativeCall, message: impl Into<String>) -> Self {
        Self::Bridge {
            call,
            message: message.into(),
        }
    }
}

/// Platform exposure-notification subsystem.
///
/// Every method is a suspension point. Implementations must not cache:
/// each call reflects the platform's state at call time.
#[async_trait]
pub trait ExposureNative: Send + Sync {
    /// Exposures the platform currently reports.
    async fn get_current_exposures(&self) -> Result<ExposureInfo, NativeError>;

    /// When detection last ran, if ever.
    async fn fetch_last_exposure_detection_date(
        &self,
    ) -> Result<Option<DetectionTimestamp>, NativeError>;

    /// Locally generated temporary exposure keys.
    async fn get_exposure_keys(&self) -> Result<Vec<ExposureKey>, NativeError>;

    /// Revision token from the secure store; empty if none was issued.
    async fn get_revision_token(&self) -> Result<RevisionToken, NativeError>;

    /// Persist a revision token in the secure store.
    async fn store_revision_token(&self, token: &RevisionToken) -> Result<(), NativeError>;

    /// Run a detection pass.
    async fn detect_exposures(&self) -> Result<DetectExposuresResponse, NativeError>;

    /// Subscribe to exposure events.
    fn subscribe_to_exposure_events(&self) -> ExposureSubscription;
}

pub use memory::InMemoryExposureNative;

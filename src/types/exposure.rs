//! Exposure records and detection timestamps.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in time, in epoch milliseconds, when exposure detection last ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectionTimestamp(i64);

impl DetectionTimestamp {
    /// Create a timestamp from epoch milliseconds.
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Create a timestamp for the current instant.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Epoch milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Convert to a UTC datetime, if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }
}

impl fmt::Display for DetectionTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl From<DateTime<Utc>> for DetectionTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

/// One detected proximate exposure, as reported by the native subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureRecord {
    /// Native identifier of the exposure window.
    pub id: String,
    /// Day of the exposure, epoch milliseconds.
    pub date: i64,
    /// Exposure duration in minutes.
    pub duration_minutes: u32,
    /// Risk score computed by the platform.
    pub total_risk_score: u32,
    /// Transmission risk level of the matched key.
    pub transmission_risk_level: u8,
    /// Minutes spent in each attenuation bucket.
    #[serde(default)]
    pub attenuation_durations: Vec<u32>,
}

impl ExposureRecord {
    /// Create a record with empty attenuation buckets.
    pub fn new(
        id: impl Into<String>,
        date: i64,
        duration_minutes: u32,
        total_risk_score: u32,
        transmission_risk_level: u8,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            duration_minutes,
            total_risk_score,
            transmission_risk_level,
            attenuation_durations: Vec::new(),
        }
    }
}

/// Ordered set of exposures the device currently knows about.
///
/// Always replaced wholesale; never merged with a previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExposureInfo(Vec<ExposureRecord>);

impl ExposureInfo {
    /// Wrap an ordered list of records.
    pub fn new(records: Vec<ExposureRecord>) -> Self {
        Self(records)
    }

    /// An empty exposure set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The records, in native order.
    pub fn records(&self) -> &[ExposureRecord] {
        &self.0
    }

    /// Number of exposures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no exposure has been detected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent exposure date, if any.
    pub fn latest_exposure_date(&self) -> Option<i64> {
        self.0.iter().map(|r| r.date).max()
    }
}

impl From<Vec<ExposureRecord>> for ExposureInfo {
    fn from(records: Vec<ExposureRecord>) -> Self {
        Self(records)
    }
}

impl IntoIterator for ExposureInfo {
    type Item = ExposureRecord;
    type IntoIter = std::vec::IntoIter<ExposureRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

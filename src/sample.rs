//! Canonical, vendor-independent health sample types.
//!
//! Every connector converges on these types and every sink consumes them.
//! Timestamps are absolute UTC instants; they are only rendered as strings at
//! the wire boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health data category. The serialized name equals the sample `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BloodGlucose,
    HeartRate,
    BloodPressure,
    Steps,
    ExerciseMinutes,
    Ecg,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 6] = [
        Category::BloodGlucose,
        Category::HeartRate,
        Category::BloodPressure,
        Category::Steps,
        Category::ExerciseMinutes,
        Category::Ecg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BloodGlucose => "blood_glucose",
            Category::HeartRate => "heart_rate",
            Category::BloodPressure => "blood_pressure",
            Category::Steps => "steps",
            Category::ExerciseMinutes => "exercise_minutes",
            Category::Ecg => "ecg",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a glucose reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlucoseSource {
    /// Continuous glucose monitor or any device-recorded reading
    Cgm,
    /// Explicitly user-entered
    Manual,
}

impl GlucoseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlucoseSource::Cgm => "cgm",
            GlucoseSource::Manual => "manual",
        }
    }
}

/// One ECG waveform point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EcgVoltage {
    /// Seconds since the start of the recording
    pub offset_secs: f64,
    /// Voltage in volts
    pub voltage: f64,
}

/// A single normalized health measurement.
///
/// Optional fields are `None` when the vendor did not report them; they are
/// never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalSample {
    BloodGlucose {
        timestamp: DateTime<Utc>,
        /// Always mg/dL
        mg_dl: f64,
        source: GlucoseSource,
    },
    HeartRate {
        timestamp: DateTime<Utc>,
        bpm: f64,
    },
    BloodPressure {
        timestamp: DateTime<Utc>,
        systolic_mmhg: f64,
        diastolic_mmhg: f64,
    },
    Steps {
        /// Interval start
        timestamp: DateTime<Utc>,
        /// Steps per minute over the interval
        spm: f64,
        /// Bucket width used to derive `spm`, never below 1
        interval_minutes: i64,
    },
    ExerciseMinutes {
        /// Interval start
        timestamp: DateTime<Utc>,
        minutes: f64,
    },
    Ecg {
        timestamp: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        average_bpm: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        classification: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sampling_hz: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voltages: Option<Vec<EcgVoltage>>,
    },
}

impl CanonicalSample {
    pub fn category(&self) -> Category {
        match self {
            CanonicalSample::BloodGlucose { .. } => Category::BloodGlucose,
            CanonicalSample::HeartRate { .. } => Category::HeartRate,
            CanonicalSample::BloodPressure { .. } => Category::BloodPressure,
            CanonicalSample::Steps { .. } => Category::Steps,
            CanonicalSample::ExerciseMinutes { .. } => Category::ExerciseMinutes,
            CanonicalSample::Ecg { .. } => Category::Ecg,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CanonicalSample::BloodGlucose { timestamp, .. }
            | CanonicalSample::HeartRate { timestamp, .. }
            | CanonicalSample::BloodPressure { timestamp, .. }
            | CanonicalSample::Steps { timestamp, .. }
            | CanonicalSample::ExerciseMinutes { timestamp, .. }
            | CanonicalSample::Ecg { timestamp, .. } => *timestamp,
        }
    }

    /// End of the interval for interval-based samples.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        match self {
            CanonicalSample::Steps {
                timestamp,
                interval_minutes,
                ..
            } => Some(*timestamp + Duration::minutes(*interval_minutes)),
            CanonicalSample::ExerciseMinutes { timestamp, minutes } => {
                Some(*timestamp + Duration::seconds((minutes * 60.0).round() as i64))
            }
            _ => None,
        }
    }

    /// The headline numeric value of the sample, if it has one.
    pub fn primary_value(&self) -> Option<f64> {
        match self {
            CanonicalSample::BloodGlucose { mg_dl, .. } => Some(*mg_dl),
            CanonicalSample::HeartRate { bpm, .. } => Some(*bpm),
            CanonicalSample::BloodPressure { systolic_mmhg, .. } => Some(*systolic_mmhg),
            CanonicalSample::Steps { spm, .. } => Some(*spm),
            CanonicalSample::ExerciseMinutes { minutes, .. } => Some(*minutes),
            CanonicalSample::Ecg { average_bpm, .. } => *average_bpm,
        }
    }
}

/// Rejected window bounds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {start} is not before end {end}")]
    Empty {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("window length must be at least one hour, got {0}")]
    InvalidHours(i64),
    #[error("window of {0} hours is out of range")]
    OutOfRange(i64),
}

/// Half-open time interval `[start, end)` scoping a batch read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReadWindow {
    /// Create a window, rejecting `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// The rolling window of `hours` ending at `end`.
    ///
    /// Rejects lengths under one hour and lengths that reach past the
    /// representable time range.
    pub fn last_hours(end: DateTime<Utc>, hours: i64) -> Result<Self, WindowError> {
        if hours < 1 {
            return Err(WindowError::InvalidHours(hours));
        }
        let start = Duration::try_hours(hours)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(WindowError::OutOfRange(hours))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Check if a timestamp falls within this window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

/// Result of probing a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectorStatus {
    Available,
    Unavailable { reason: String },
}

impl ConnectorStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ConnectorStatus::Available)
    }
}

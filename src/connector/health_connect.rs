//! Connector B: Android Health Connect record mapping.
//!
//! Health Connect records use `time` / `startTime` / `endTime` instants, wrap
//! physical quantities in unit objects, and mark provenance with a numeric
//! `recordingMethod`. Heart rate arrives as an aggregate series record and
//! daily step totals come keyed by local date plus zone id.

use super::normalize::{self, decode, parse_instant};
use super::{PlatformKind, VendorAdapter};
use crate::sample::{CanonicalSample, Category, GlucoseSource};
use serde::Deserialize;
use serde_json::Value;

/// `Metadata.RECORDING_METHOD_MANUAL_ENTRY`
const RECORDING_METHOD_MANUAL_ENTRY: i64 = 3;

/// Maps Health Connect-shaped records to canonical samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthConnectAdapter;

impl VendorAdapter for HealthConnectAdapter {
    fn platform(&self) -> PlatformKind {
        PlatformKind::HealthConnect
    }

    fn normalize(&self, category: Category, record: &Value) -> Option<CanonicalSample> {
        match category {
            Category::BloodGlucose => glucose(decode(category, record)?),
            Category::HeartRate => heart_rate(decode(category, record)?),
            Category::BloodPressure => blood_pressure(decode(category, record)?),
            Category::Steps => steps(decode(category, record)?),
            Category::ExerciseMinutes => exercise(decode(category, record)?),
            Category::Ecg => ecg(decode(category, record)?),
        }
    }
}

fn glucose(record: HcBloodGlucose) -> Option<CanonicalSample> {
    let mg_dl = match (
        record.level.in_milligrams_per_deciliter,
        record.level.in_millimoles_per_liter,
    ) {
        (Some(mg_dl), _) => mg_dl,
        (None, Some(mmol)) => normalize::mmol_to_mg_dl(mmol),
        (None, None) => return None,
    };
    let manual = record
        .metadata
        .and_then(|m| m.recording_method)
        .is_some_and(|method| method == RECORDING_METHOD_MANUAL_ENTRY);

    Some(CanonicalSample::BloodGlucose {
        timestamp: parse_instant(&record.time)?,
        mg_dl,
        source: if manual {
            GlucoseSource::Manual
        } else {
            GlucoseSource::Cgm
        },
    })
}

fn heart_rate(record: HcHeartRate) -> Option<CanonicalSample> {
    // Series records carry nested readings; the first one stands for the record.
    if let Some(first) = record.samples.as_ref().and_then(|s| s.first()) {
        return Some(CanonicalSample::HeartRate {
            timestamp: parse_instant(&first.time)?,
            bpm: first.beats_per_minute,
        });
    }

    let time = record.time.as_deref().or(record.start_time.as_deref())?;
    Some(CanonicalSample::HeartRate {
        timestamp: parse_instant(time)?,
        bpm: record.beats_per_minute?,
    })
}

fn blood_pressure(record: HcBloodPressure) -> Option<CanonicalSample> {
    Some(CanonicalSample::BloodPressure {
        timestamp: parse_instant(&record.time)?,
        systolic_mmhg: record.systolic?.in_millimeters_of_mercury,
        diastolic_mmhg: record.diastolic?.in_millimeters_of_mercury,
    })
}

fn steps(record: HcSteps) -> Option<CanonicalSample> {
    let (start, end) = match (&record.start_time, &record.end_time, &record.date) {
        (Some(start), Some(end), _) => (parse_instant(start)?, parse_instant(end)?),
        (_, _, Some(date)) => normalize::day_bounds(date, record.zone_id.as_deref())?,
        _ => return None,
    };
    let (spm, interval_minutes) = normalize::steps_rate(record.count, start, end);

    Some(CanonicalSample::Steps {
        timestamp: start,
        spm,
        interval_minutes,
    })
}

fn exercise(record: HcExerciseSession) -> Option<CanonicalSample> {
    let start = parse_instant(&record.start_time)?;
    let end = parse_instant(&record.end_time)?;

    Some(CanonicalSample::ExerciseMinutes {
        timestamp: start,
        minutes: normalize::exercise_minutes(start, end),
    })
}

fn ecg(record: HcEcg) -> Option<CanonicalSample> {
    Some(CanonicalSample::Ecg {
        timestamp: parse_instant(&record.time)?,
        average_bpm: record.average_heart_rate,
        classification: record.classification,
        sampling_hz: None,
        voltages: None,
    })
}

// Health Connect record structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcBloodGlucose {
    time: String,
    level: HcGlucoseLevel,
    metadata: Option<HcMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcGlucoseLevel {
    in_milligrams_per_deciliter: Option<f64>,
    in_millimoles_per_liter: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcMetadata {
    recording_method: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcHeartRate {
    time: Option<String>,
    start_time: Option<String>,
    beats_per_minute: Option<f64>,
    samples: Option<Vec<HcHeartRateSample>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcHeartRateSample {
    time: String,
    beats_per_minute: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcBloodPressure {
    time: String,
    systolic: Option<HcPressure>,
    diastolic: Option<HcPressure>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcPressure {
    in_millimeters_of_mercury: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcSteps {
    count: f64,
    start_time: Option<String>,
    end_time: Option<String>,
    date: Option<String>,
    zone_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcExerciseSession {
    start_time: String,
    end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HcEcg {
    time: String,
    average_heart_rate: Option<f64>,
    classification: Option<String>,
}

//! Connector A: Apple HealthKit record mapping.
//!
//! HealthKit records carry `startDate`/`endDate` strings with a UTC offset
//! (often without the colon, e.g. `-0800`) and report glucose in whatever unit
//! the query asked for.
//!
//! A steps record without `endDate` is a day total. Its `startDate` carries a
//! fixed UTC offset but no zone, so the day is always 24 hours long here,
//! unlike Health Connect day totals which are resolved in their `zoneId`.

use super::normalize::{self, decode, parse_instant, GlucoseUnit};
use super::{PlatformKind, VendorAdapter};
use crate::sample::{CanonicalSample, Category, EcgVoltage, GlucoseSource};
use chrono::Duration;
use serde::Deserialize;
use serde_json::Value;

/// Maps HealthKit-shaped records to canonical samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthKitAdapter;

impl VendorAdapter for HealthKitAdapter {
    fn platform(&self) -> PlatformKind {
        PlatformKind::HealthKit
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

fn glucose(record: HkGlucose) -> Option<CanonicalSample> {
    let unit = match record.unit.as_deref() {
        Some(unit) => GlucoseUnit::parse(unit)?,
        None => GlucoseUnit::MgDl,
    };
    let user_entered = record
        .metadata
        .as_ref()
        .and_then(|m| m.was_user_entered.as_ref())
        .is_some_and(normalize::truthy);

    Some(CanonicalSample::BloodGlucose {
        timestamp: parse_instant(&record.start_date)?,
        mg_dl: unit.to_mg_dl(record.value),
        source: if user_entered {
            GlucoseSource::Manual
        } else {
            GlucoseSource::Cgm
        },
    })
}

fn heart_rate(record: HkQuantity) -> Option<CanonicalSample> {
    Some(CanonicalSample::HeartRate {
        timestamp: parse_instant(&record.start_date)?,
        bpm: record.value,
    })
}

fn blood_pressure(record: HkBloodPressure) -> Option<CanonicalSample> {
    Some(CanonicalSample::BloodPressure {
        timestamp: parse_instant(&record.start_date)?,
        systolic_mmhg: record.blood_pressure_systolic_value?,
        diastolic_mmhg: record.blood_pressure_diastolic_value?,
    })
}

fn steps(record: HkInterval) -> Option<CanonicalSample> {
    let start = parse_instant(&record.start_date)?;
    // No end date means a daily total starting at `startDate`.
    let end = match record.end_date.as_deref() {
        Some(end) => parse_instant(end)?,
        None => start + Duration::days(1),
    };
    let (spm, interval_minutes) = normalize::steps_rate(record.value?, start, end);

    Some(CanonicalSample::Steps {
        timestamp: start,
        spm,
        interval_minutes,
    })
}

fn exercise(record: HkInterval) -> Option<CanonicalSample> {
    let start = parse_instant(&record.start_date)?;
    let end = parse_instant(record.end_date.as_deref()?)?;

    Some(CanonicalSample::ExerciseMinutes {
        timestamp: start,
        minutes: normalize::exercise_minutes(start, end),
    })
}

fn ecg(record: HkElectrocardiogram) -> Option<CanonicalSample> {
    Some(CanonicalSample::Ecg {
        timestamp: parse_instant(&record.start_date)?,
        average_bpm: record.average_heart_rate,
        classification: record.classification,
        sampling_hz: record.sampling_frequency,
        voltages: record.voltage_measurements.map(|points| {
            points
                .into_iter()
                .map(|p| EcgVoltage {
                    offset_secs: p.time_since_sample_start,
                    voltage: p.voltage,
                })
                .collect()
        }),
    })
}

// HealthKit record structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HkGlucose {
    value: f64,
    unit: Option<String>,
    start_date: String,
    metadata: Option<HkMetadata>,
}

#[derive(Debug, Deserialize)]
struct HkMetadata {
    #[serde(rename = "HKWasUserEntered")]
    was_user_entered: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HkQuantity {
    value: f64,
    start_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HkBloodPressure {
    blood_pressure_systolic_value: Option<f64>,
    blood_pressure_diastolic_value: Option<f64>,
    start_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HkInterval {
    value: Option<f64>,
    start_date: String,
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HkElectrocardiogram {
    start_date: String,
    average_heart_rate: Option<f64>,
    classification: Option<String>,
    sampling_frequency: Option<f64>,
    voltage_measurements: Option<Vec<HkVoltage>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HkVoltage {
    time_since_sample_start: f64,
    voltage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    }

    fn normalize(category: Category, record: Value) -> Option<CanonicalSample> {
        HealthKitAdapter.normalize(category, &record)
    }

    #[test]
    fn test_glucose_mmol_converted_and_tagged_cgm() {
        let sample = normalize(
            Category::BloodGlucose,
            json!({
                "value": 7.8,
                "unit": "mmol/L",
                "startDate": "2024-01-15T01:00:00.000Z",
                "metadata": {"HKWasUserEntered": false}
            }),
        )
        .unwrap();

        assert_eq!(
            sample,
            CanonicalSample::BloodGlucose {
                timestamp: t0() + Duration::hours(1),
                mg_dl: 140.54,
                source: GlucoseSource::Cgm,
            }
        );
    }

    #[test]
    fn test_glucose_user_entered_is_manual() {
        let sample = normalize(
            Category::BloodGlucose,
            json!({
                "value": 112.0,
                "startDate": "2024-01-14T17:00:00.000-0800",
                "metadata": {"HKWasUserEntered": 1}
            }),
        )
        .unwrap();

        match sample {
            CanonicalSample::BloodGlucose {
                timestamp,
                mg_dl,
                source,
            } => {
                assert_eq!(timestamp, t0() + Duration::hours(1));
                assert_eq!(mg_dl, 112.0);
                assert_eq!(source, GlucoseSource::Manual);
            }
            other => panic!("unexpected sample {other:?}"),
        }
    }

    #[test]
    fn test_glucose_unknown_unit_dropped() {
        assert!(normalize(
            Category::BloodGlucose,
            json!({"value": 5.0, "unit": "kPa", "startDate": "2024-01-15T01:00:00Z"})
        )
        .is_none());
    }

    #[test]
    fn test_blood_pressure_requires_both_values() {
        let records = vec![
            json!({
                "bloodPressureSystolicValue": 120.0,
                "bloodPressureDiastolicValue": 80.0,
                "startDate": "2024-01-15T06:00:00Z"
            }),
            json!({"bloodPressureSystolicValue": 131.0, "startDate": "2024-01-15T07:00:00Z"}),
            json!({"bloodPressureDiastolicValue": 79.0, "startDate": "2024-01-15T08:00:00Z"}),
        ];
        let samples: Vec<_> = records
            .into_iter()
            .filter_map(|r| normalize(Category::BloodPressure, r))
            .collect();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].primary_value(), Some(120.0));
    }

    #[test]
    fn test_steps_interval_and_daily_total() {
        let interval = normalize(
            Category::Steps,
            json!({
                "value": 900.0,
                "startDate": "2024-01-15T10:00:00Z",
                "endDate": "2024-01-15T10:30:00Z"
            }),
        )
        .unwrap();
        assert_eq!(
            interval,
            CanonicalSample::Steps {
                timestamp: t0() + Duration::hours(10),
                spm: 30.0,
                interval_minutes: 30,
            }
        );

        let daily = normalize(
            Category::Steps,
            json!({"value": 14400.0, "startDate": "2024-01-15T00:00:00Z"}),
        )
        .unwrap();
        assert_eq!(
            daily,
            CanonicalSample::Steps {
                timestamp: t0(),
                spm: 10.0,
                interval_minutes: 1440,
            }
        );

        // No zone to resolve: a DST day total still spans 24 hours.
        let dst_day = normalize(
            Category::Steps,
            json!({"value": 8280.0, "startDate": "2024-03-10T00:00:00-0800"}),
        )
        .unwrap();
        assert!(matches!(
            dst_day,
            CanonicalSample::Steps {
                interval_minutes: 1440,
                ..
            }
        ));
    }

    #[test]
    fn test_steps_zero_length_interval() {
        let sample = normalize(
            Category::Steps,
            json!({
                "value": 42.0,
                "startDate": "2024-01-15T10:00:00Z",
                "endDate": "2024-01-15T10:00:00Z"
            }),
        )
        .unwrap();
        assert_eq!(
            sample,
            CanonicalSample::Steps {
                timestamp: t0() + Duration::hours(10),
                spm: 42.0,
                interval_minutes: 1,
            }
        );
    }

    #[test]
    fn test_exercise_minutes_rounded() {
        let sample = normalize(
            Category::ExerciseMinutes,
            json!({
                "startDate": "2024-01-15T07:00:00Z",
                "endDate": "2024-01-15T07:12:40Z"
            }),
        )
        .unwrap();
        assert_eq!(sample.primary_value(), Some(13.0));
        assert!(normalize(
            Category::ExerciseMinutes,
            json!({"startDate": "2024-01-15T07:00:00Z"})
        )
        .is_none());
    }

    #[test]
    fn test_ecg_passes_through_available_fields() {
        let sample = normalize(
            Category::Ecg,
            json!({
                "startDate": "2024-01-15T12:00:00Z",
                "classification": "SinusRhythm",
                "samplingFrequency": 512.0,
                "voltageMeasurements": [
                    {"timeSinceSampleStart": 0.0, "voltage": 0.00012},
                    {"timeSinceSampleStart": 0.002, "voltage": 0.00015}
                ]
            }),
        )
        .unwrap();

        match sample {
            CanonicalSample::Ecg {
                average_bpm,
                classification,
                sampling_hz,
                voltages,
                ..
            } => {
                assert_eq!(average_bpm, None);
                assert_eq!(classification.as_deref(), Some("SinusRhythm"));
                assert_eq!(sampling_hz, Some(512.0));
                assert_eq!(voltages.unwrap().len(), 2);
            }
            other => panic!("unexpected sample {other:?}"),
        }
    }

    #[test]
    fn test_missing_mandatory_field_dropped() {
        assert!(normalize(Category::HeartRate, json!({"startDate": "2024-01-15T01:00:00Z"})).is_none());
        assert!(normalize(Category::HeartRate, json!({"value": 60.0, "startDate": "2024-01-15"})).is_none());
    }
}

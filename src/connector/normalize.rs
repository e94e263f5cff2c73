//! Unit conversions and interval arithmetic shared by the vendor adapters.

use crate::sample::Category;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// mmol/L to mg/dL for glucose.
pub const MMOL_TO_MG_DL: f64 = 18.018;

/// Convert a glucose reading in mmol/L to mg/dL, rounded to 2 decimals.
pub fn mmol_to_mg_dl(mmol: f64) -> f64 {
    round2(mmol * MMOL_TO_MG_DL)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Glucose units seen in vendor records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseUnit {
    MgDl,
    MmolL,
}

impl GlucoseUnit {
    /// Parse a vendor unit string. HealthKit reports mmol/L as
    /// `mmol<180.15588000005408>/L`, so only the prefix is matched.
    pub fn parse(unit: &str) -> Option<Self> {
        let unit = unit.trim().to_ascii_lowercase();
        if unit.starts_with("mmol") {
            Some(GlucoseUnit::MmolL)
        } else if unit.starts_with("mg") {
            Some(GlucoseUnit::MgDl)
        } else {
            None
        }
    }

    pub fn to_mg_dl(self, value: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => value,
            GlucoseUnit::MmolL => mmol_to_mg_dl(value),
        }
    }
}

/// Whole minutes between two instants, rounded to the nearest minute.
fn rounded_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    ((end - start).num_milliseconds() as f64 / 60_000.0).round() as i64
}

/// Steps-per-minute and bucket width for a count over `[start, end)`.
///
/// The width is clamped to at least one minute so zero-length or inverted
/// intervals never divide by zero.
pub fn steps_rate(count: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> (f64, i64) {
    let minutes = rounded_minutes(start, end).max(1);
    (count / minutes as f64, minutes)
}

/// Exercise minutes for `[start, end)`, rounded and floored at zero.
pub fn exercise_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    rounded_minutes(start, end).max(0) as f64
}

/// Parse a vendor timestamp into an absolute instant.
///
/// Accepts RFC 3339 and the colon-less offset form (`2024-01-15T10:00:00.000-0800`).
/// Strings without an offset are rejected rather than guessed.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// UTC bounds of a calendar day in an IANA zone. DST days keep their true length.
pub fn day_bounds(date: &str, zone: Option<&str>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let tz: Tz = match zone {
        Some(zone) => zone.parse().ok()?,
        None => Tz::UTC,
    };
    let start = start_of_day(tz, date)?;
    let end = start_of_day(tz, date.succ_opt()?)?;
    Some((start, end))
}

/// First valid local instant of `date`. Where midnight falls in a DST gap
/// the day starts when the clocks resume.
fn start_of_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    (0..=DAY_START_SEARCH_STEPS)
        .map(|step| midnight + Duration::minutes(step * 15))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .map(|start| start.with_timezone(&Utc))
}

/// Quarter-hour steps searched past a skipped midnight.
const DAY_START_SEARCH_STEPS: i64 = 4 * 3;

/// Interpret a vendor flag that may arrive as bool, number or string.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Decode one vendor record, logging and discarding it on shape mismatch.
pub fn decode<T: DeserializeOwned>(category: Category, record: &Value) -> Option<T> {
    match T::deserialize(record) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::debug!(%category, error = %e, "dropping malformed vendor record");
            None
        }
    }
}

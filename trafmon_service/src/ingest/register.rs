//! New-measurement payload parsing and validation.
//!
//! Payloads use the camera-facing field names:
//!
//! ```json
//! {
//!   "traffic_cam_id": 3,
//!   "start_datetime": "2024-05-01T08:00:00",
//!   "end_datetime": "2024-05-01T08:15:00",
//!   "vehicle_count": 42,
//!   "average_speed": 37.5
//! }
//! ```
//!
//! Datetimes are ISO 8601 with or without a UTC offset. An offset is dropped
//! and the wall-clock time kept, since hour-of-day analytics are defined on
//! the camera's local time.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::{Result, TrafficError};
use crate::model::NewMeasurement;

pub const REQUIRED_FIELDS: &[&str] = &[
    "traffic_cam_id",
    "start_datetime",
    "end_datetime",
    "vehicle_count",
    "average_speed",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

fn invalid(message: impl Into<String>) -> TrafficError {
    TrafficError::Validation(message.into())
}

/// Parses an ISO 8601 datetime into a wall-clock timestamp.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(dt.naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(invalid(format!("invalid datetime '{}', expected ISO 8601", text)))
}

/// Parses a JSON payload into a validated `NewMeasurement`.
pub fn parse_payload(payload: &Value) -> Result<NewMeasurement> {
    let object = payload
        .as_object()
        .ok_or_else(|| invalid("No JSON payload provided"))?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| object.get(*field).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(invalid(format!("Missing fields: {}", missing.join(", "))));
    }

    let new = NewMeasurement {
        camera_id: integer_field(payload, "traffic_cam_id")?,
        start_time: datetime_field(payload, "start_datetime")?,
        end_time: datetime_field(payload, "end_datetime")?,
        vehicle_count: integer_field(payload, "vehicle_count")?,
        average_speed: number_field(payload, "average_speed")?,
    };
    validate(&new)?;
    Ok(new)
}

/// Parses a payload given as JSON text.
pub fn parse_payload_str(text: &str) -> Result<NewMeasurement> {
    let payload: Value =
        serde_json::from_str(text).map_err(|e| invalid(format!("malformed JSON: {}", e)))?;
    parse_payload(&payload)
}

/// Checks the measurement invariants.
pub fn validate(new: &NewMeasurement) -> Result<()> {
    if new.start_time >= new.end_time {
        return Err(invalid("start_datetime must be before end_datetime"));
    }
    validate_counts(new.vehicle_count, new.average_speed)
}

/// Checks the fields an administrative correction may change.
pub fn validate_counts(vehicle_count: i32, average_speed: f64) -> Result<()> {
    if vehicle_count < 0 {
        return Err(invalid("vehicle_count must be non-negative"));
    }
    if !average_speed.is_finite() || average_speed < 0.0 {
        return Err(invalid("average_speed must be a non-negative number"));
    }
    Ok(())
}

fn integer_field(payload: &Value, field: &str) -> Result<i32> {
    let value = &payload[field];
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{} must be an integer, got {}", field, value)))
}

fn number_field(payload: &Value, field: &str) -> Result<f64> {
    let value = &payload[field];
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(format!("{} must be a number, got {}", field, value)))
}

fn datetime_field(payload: &Value, field: &str) -> Result<NaiveDateTime> {
    match &payload[field] {
        Value::String(s) => parse_datetime(s),
        other => Err(invalid(format!("{} must be an ISO 8601 string, got {}", field, other))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

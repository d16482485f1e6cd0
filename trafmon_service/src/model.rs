//! Core data types for the traffic monitoring service.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O: measurements, cameras, alerts, the traffic state
//! classification and the filter used for every range query.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Speed (same unit as `average_speed`) at or below which an interval counts
/// as congested when the caller does not supply a threshold.
pub const DEFAULT_SPEED_THRESHOLD: f64 = 20.0;

/// Format used for timestamps in flattened listings.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Measurement types
// ---------------------------------------------------------------------------

/// A measurement as submitted for ingestion, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewMeasurement {
    pub camera_id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub vehicle_count: i32,
    pub average_speed: f64,
}

/// One stored record per camera per observed interval.
///
/// Timestamps are wall-clock values as reported by the camera.
/// Invariant: `start_time < end_time`, `vehicle_count >= 0`, `average_speed >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub id: i32,
    pub camera_id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub vehicle_count: i32,
    pub average_speed: f64,
}

impl Measurement {
    /// Flattens the measurement into the listing shape returned to callers.
    pub fn to_record(&self) -> MeasurementRecord {
        MeasurementRecord {
            traffic_cam_id: self.camera_id,
            start_datetime: self.start_time.format(RECORD_TIME_FORMAT).to_string(),
            end_datetime: self.end_time.format(RECORD_TIME_FORMAT).to_string(),
            vehicle_count: self.vehicle_count,
            average_speed: self.average_speed,
        }
    }
}

/// Flattened measurement with formatted timestamps, used by the listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub traffic_cam_id: i32,
    pub start_datetime: String,
    pub end_datetime: String,
    pub vehicle_count: i32,
    pub average_speed: f64,
}

// ---------------------------------------------------------------------------
// Directory and alert types
// ---------------------------------------------------------------------------

/// A traffic camera as registered in the camera directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Camera {
    pub id: i32,
    pub alias: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A jam event recorded when an ingestion classifies as `TrafficState::Jam`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JamAlert {
    pub id: i32,
    pub camera_id: i32,
    pub event_time: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Traffic state
// ---------------------------------------------------------------------------

/// Discrete traffic state of a camera's most recent interval, relative to
/// that camera's historical mean speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrafficState {
    Low,
    Regular,
    High,
    Jam,
}

impl fmt::Display for TrafficState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficState::Low => write!(f, "Low"),
            TrafficState::Regular => write!(f, "Regular"),
            TrafficState::High => write!(f, "High"),
            TrafficState::Jam => write!(f, "Jam"),
        }
    }
}

// ---------------------------------------------------------------------------
// Range filter
// ---------------------------------------------------------------------------

/// Closed time window used by the analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Builds a window only when both bounds are present. A single bound is
    /// ignored rather than treated as open-ended.
    pub fn from_bounds(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self { start, end }),
            _ => None,
        }
    }

    /// Full containment: the measurement must start at or after `start` and
    /// end at or before `end`.
    pub fn contains(&self, m: &Measurement) -> bool {
        m.start_time >= self.start && m.end_time <= self.end
    }

    /// Inclusive check on the start time only (`start_time BETWEEN start AND end`),
    /// used by the history and volume queries.
    pub fn starts_within(&self, m: &Measurement) -> bool {
        m.start_time >= self.start && m.start_time <= self.end
    }
}

/// The filter shared by every analytics query.
///
/// `window` is mandatory for stats, peak hours and the listings; only the
/// congestion query may leave it out. `city` is an inner join against the
/// camera directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeFilter {
    pub window: Option<TimeWindow>,
    pub camera_id: Option<i32>,
    pub city: Option<String>,
}

impl RangeFilter {
    pub fn within(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            window: Some(TimeWindow::new(start, end)),
            ..Self::default()
        }
    }

    pub fn camera(mut self, camera_id: Option<i32>) -> Self {
        self.camera_id = camera_id;
        self
    }

    pub fn city(mut self, city: Option<&str>) -> Self {
        self.city = city.map(String::from);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

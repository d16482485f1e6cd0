//! Measurement store contract.
//!
//! The analytics core never talks to a database directly. Each public
//! operation asks a `Connector` for a fresh session, runs its queries through
//! the `MeasurementStore` trait, and drops the session on return (success or
//! failure), which releases the underlying connection.
//!
//! Implementations:
//! - `postgres`: production store backed by the relational schema in `sql/`.
//! - `memory`:   in-process store with identical filter semantics, used by
//!   tests and dry runs.

pub mod memory;
pub mod postgres;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::model::{Camera, JamAlert, Measurement, NewMeasurement, RangeFilter, TimeWindow};

/// Opens short-lived store sessions.
pub trait Connector {
    type Session: MeasurementStore;

    fn open(&self) -> Result<Self::Session>;
}

/// Queries and writes consumed by the analytics core.
pub trait MeasurementStore {
    /// Appends a measurement and returns it with its assigned id. The write is
    /// visible to every subsequent call on the same session.
    fn insert(&mut self, new: &NewMeasurement) -> Result<Measurement>;

    /// The camera's measurement with the greatest `end_time`.
    fn latest(&mut self, camera_id: i32) -> Result<Option<Measurement>>;

    /// Mean `average_speed` over the camera's full history.
    fn mean_speed(&mut self, camera_id: i32) -> Result<Option<f64>>;

    /// Measurements matching the filter, in insertion order. A window keeps
    /// only fully contained intervals; a city keeps only cameras registered
    /// in that city.
    fn range_query(&mut self, filter: &RangeFilter) -> Result<Vec<Measurement>>;

    fn insert_alert(&mut self, camera_id: i32, event_time: NaiveDateTime) -> Result<JamAlert>;

    // -- Administrative corrections ------------------------------------------

    /// Measurements by camera, optionally restricted to those whose
    /// `start_time` lies within the window (inclusive).
    fn history(
        &mut self,
        camera_id: Option<i32>,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Measurement>>;

    /// Returns `None` when no measurement has this id.
    fn update(
        &mut self,
        id: i32,
        vehicle_count: i32,
        average_speed: f64,
    ) -> Result<Option<Measurement>>;

    /// Returns `false` when no measurement has this id.
    fn delete(&mut self, id: i32) -> Result<bool>;

    // -- Alerts and directory ------------------------------------------------

    fn alerts_for_camera(&mut self, camera_id: i32) -> Result<Vec<JamAlert>>;

    /// Alerts with `event_time >= since`.
    fn alerts_since(&mut self, since: NaiveDateTime) -> Result<Vec<JamAlert>>;

    /// Distinct cities with at least one registered camera, sorted.
    fn cities(&mut self) -> Result<Vec<String>>;

    fn cameras_in_city(&mut self, city: &str) -> Result<Vec<Camera>>;
}

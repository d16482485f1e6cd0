//! Core-facing interface consumed by the request layer.
//!
//! `TrafficService` owns a `Connector` and opens one session per public
//! operation. The session is dropped when the operation returns, on success
//! and on failure alike, so no connection outlives a call.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;

use crate::alert::jam_alerts;
use crate::analysis::congestion::{self, CongestionReport};
use crate::analysis::peak_hours::{self, PeakHour};
use crate::analysis::stats::{self, RangeStats};
use crate::analysis::{classifier, jams};
use crate::error::{Result, TrafficError};
use crate::logging::{self, Component};
use crate::model::{
    Camera, DEFAULT_SPEED_THRESHOLD, JamAlert, Measurement, MeasurementRecord, NewMeasurement,
    RangeFilter, TimeWindow, TrafficState,
};
use crate::store::{Connector, MeasurementStore};

/// Result of ingesting one measurement.
///
/// `state` is `None` when the post-ingestion check could not run; the
/// measurement is stored regardless.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub measurement: Measurement,
    pub state: Option<TrafficState>,
    pub alert: Option<JamAlert>,
}

pub struct TrafficService<C: Connector> {
    connector: C,
    default_speed_threshold: f64,
}

impl<C: Connector> TrafficService<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            default_speed_threshold: DEFAULT_SPEED_THRESHOLD,
        }
    }

    pub fn with_default_speed_threshold(mut self, threshold: f64) -> Self {
        self.default_speed_threshold = threshold;
        self
    }

    pub fn default_speed_threshold(&self) -> f64 {
        self.default_speed_threshold
    }

    /// Runs `op` on a fresh session and logs any failure before returning it.
    fn with_session<T>(
        &self,
        component: Component,
        camera_id: Option<i32>,
        operation: &str,
        op: impl FnOnce(&mut C::Session) -> Result<T>,
    ) -> Result<T> {
        let result = self
            .connector
            .open()
            .and_then(|mut session| op(&mut session));
        if let Err(err) = &result {
            logging::log_failure(component, camera_id, operation, err);
        }
        result
    }

    // -----------------------------------------------------------------------
    // Ingestion and classification
    // -----------------------------------------------------------------------

    /// Stores a measurement, then classifies the camera and raises a jam
    /// alert if warranted, stamped with the current local time.
    pub fn record_measurement(&self, new: &NewMeasurement) -> Result<IngestReport> {
        self.record_measurement_at(new, Local::now().naive_local())
    }

    /// As `record_measurement`, with the evaluation time supplied.
    ///
    /// A failure in the alert step is logged and reported through
    /// `IngestReport::state`; it never undoes the stored measurement.
    pub fn record_measurement_at(
        &self,
        new: &NewMeasurement,
        now: NaiveDateTime,
    ) -> Result<IngestReport> {
        let camera_id = new.camera_id;
        self.with_session(Component::Ingest, Some(camera_id), "insert measurement", |session| {
            let measurement = session.insert(new)?;
            logging::debug(
                Component::Ingest,
                Some(camera_id),
                &format!("stored measurement {}", measurement.id),
            );

            match jam_alerts::check_and_alert(session, camera_id, now) {
                Ok(check) => {
                    if let Some(alert) = &check.alert {
                        logging::warn(
                            Component::Alerts,
                            Some(camera_id),
                            &format!("traffic jam detected (alert {})", alert.id),
                        );
                    }
                    Ok(IngestReport {
                        measurement,
                        state: Some(check.state),
                        alert: check.alert,
                    })
                }
                Err(err) => {
                    logging::warn(
                        Component::Alerts,
                        Some(camera_id),
                        &format!("alert check skipped, measurement kept: {}", err),
                    );
                    Ok(IngestReport {
                        measurement,
                        state: None,
                        alert: None,
                    })
                }
            }
        })
    }

    pub fn classify(&self, camera_id: i32) -> Result<TrafficState> {
        self.with_session(Component::Classifier, Some(camera_id), "classify", |session| {
            classifier::classify(session, camera_id)
        })
    }

    // -----------------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------------

    fn query(&self, operation: &str, filter: &RangeFilter) -> Result<Vec<Measurement>> {
        self.with_session(Component::Analytics, filter.camera_id, operation, |session| {
            session.range_query(filter)
        })
    }

    /// Mean speed and total volume; `NotFound` when nothing matches.
    pub fn range_stats(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        camera_id: Option<i32>,
        city: Option<&str>,
    ) -> Result<RangeStats> {
        let filter = RangeFilter::within(start, end).camera(camera_id).city(city);
        let measurements = self.query("range stats", &filter)?;
        stats::range_stats(&measurements).ok_or_else(|| {
            TrafficError::NotFound(format!("no records between {} and {}", start, end))
        })
    }

    pub fn peak_hours(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        camera_id: Option<i32>,
        city: Option<&str>,
    ) -> Result<Vec<PeakHour>> {
        let filter = RangeFilter::within(start, end).camera(camera_id).city(city);
        let measurements = self.query("peak hours", &filter)?;
        Ok(peak_hours::peak_hours(&measurements))
    }

    /// Congestion for one camera. The window applies only when both bounds
    /// are given. An empty result is a "no data" report, not an error.
    pub fn congestion(
        &self,
        camera_id: i32,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        speed_threshold: Option<f64>,
        city: Option<&str>,
    ) -> Result<CongestionReport> {
        let filter = RangeFilter {
            window: TimeWindow::from_bounds(start, end),
            camera_id: Some(camera_id),
            city: city.map(String::from),
        };
        let measurements = self.query("congestion", &filter)?;
        let threshold = speed_threshold.unwrap_or(self.default_speed_threshold);
        Ok(congestion::congestion(&measurements, threshold))
    }

    /// Intervals at or below the speed threshold, in insertion order.
    pub fn jams(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        speed_threshold: Option<f64>,
        camera_id: Option<i32>,
        city: Option<&str>,
    ) -> Result<Vec<MeasurementRecord>> {
        let filter = RangeFilter::within(start, end).camera(camera_id).city(city);
        let measurements = self.query("jam listing", &filter)?;
        let threshold = speed_threshold.unwrap_or(self.default_speed_threshold);
        Ok(jams::jam_records(&measurements, threshold))
    }

    /// Every interval in range, in insertion order.
    pub fn records(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        camera_id: Option<i32>,
        city: Option<&str>,
    ) -> Result<Vec<MeasurementRecord>> {
        let filter = RangeFilter::within(start, end).camera(camera_id).city(city);
        let measurements = self.query("record listing", &filter)?;
        Ok(jams::all_records(&measurements))
    }

    // -----------------------------------------------------------------------
    // History and administrative corrections
    // -----------------------------------------------------------------------

    /// Measurements by camera, optionally those starting within the window.
    pub fn history(
        &self,
        camera_id: Option<i32>,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Measurement>> {
        self.with_session(Component::Analytics, camera_id, "history", |session| {
            session.history(camera_id, window)
        })
    }

    /// Total vehicles over the same selection as `history`; 0 when empty.
    pub fn total_volume(&self, camera_id: Option<i32>, window: Option<TimeWindow>) -> Result<i64> {
        let measurements = self.history(camera_id, window)?;
        Ok(stats::total_volume(&measurements))
    }

    /// Corrects a stored measurement. Does not re-run alerting.
    pub fn update_measurement(
        &self,
        id: i32,
        vehicle_count: i32,
        average_speed: f64,
    ) -> Result<Measurement> {
        self.with_session(Component::Database, None, "update measurement", |session| {
            session
                .update(id, vehicle_count, average_speed)?
                .ok_or_else(|| TrafficError::NotFound(format!("measurement {} not found", id)))
        })
    }

    /// Removes a stored measurement. Does not re-run alerting.
    pub fn delete_measurement(&self, id: i32) -> Result<()> {
        self.with_session(Component::Database, None, "delete measurement", |session| {
            if session.delete(id)? {
                Ok(())
            } else {
                Err(TrafficError::NotFound(format!("measurement {} not found", id)))
            }
        })
    }

    // -----------------------------------------------------------------------
    // Alerts and directory
    // -----------------------------------------------------------------------

    pub fn alerts_for_camera(&self, camera_id: i32) -> Result<Vec<JamAlert>> {
        self.with_session(Component::Alerts, Some(camera_id), "list alerts", |session| {
            session.alerts_for_camera(camera_id)
        })
    }

    pub fn alerts_since(&self, since: NaiveDateTime) -> Result<Vec<JamAlert>> {
        self.with_session(Component::Alerts, None, "list alerts", |session| {
            session.alerts_since(since)
        })
    }

    pub fn cities(&self) -> Result<Vec<String>> {
        self.with_session(Component::Database, None, "list cities", |session| session.cities())
    }

    pub fn cameras_in_city(&self, city: &str) -> Result<Vec<Camera>> {
        self.with_session(Component::Database, None, "list cameras", |session| {
            session.cameras_in_city(city)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

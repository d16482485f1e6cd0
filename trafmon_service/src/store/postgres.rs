//! Postgres-backed measurement store.
//!
//! `PgConnector` opens one connection per session; dropping the session
//! closes it. Range filters are rendered into a single parameterised query so
//! the four analytics operations share exactly the same predicate.

use chrono::NaiveDateTime;
use postgres::types::ToSql;
use postgres::{Client, Row};

use super::{Connector, MeasurementStore};
use crate::db;
use crate::error::Result;
use crate::model::{Camera, JamAlert, Measurement, NewMeasurement, RangeFilter, TimeWindow};

const MEASUREMENT_COLUMNS: &str =
    "r.id, r.traffic_cam_id, r.start_time, r.end_time, r.vehicle_count, r.average_speed";

/// Connector holding the database URL.
#[derive(Debug, Clone)]
pub struct PgConnector {
    database_url: String,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

impl Connector for PgConnector {
    type Session = PgSession;

    fn open(&self) -> Result<PgSession> {
        Ok(PgSession::new(db::connect(&self.database_url)?))
    }
}

/// A single connection used for the duration of one operation.
pub struct PgSession {
    client: Client,
}

impl PgSession {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn measurement_from_row(row: &Row) -> Measurement {
    Measurement {
        id: row.get(0),
        camera_id: row.get(1),
        start_time: row.get(2),
        end_time: row.get(3),
        vehicle_count: row.get(4),
        average_speed: row.get(5),
    }
}

fn alert_from_row(row: &Row) -> JamAlert {
    JamAlert {
        id: row.get(0),
        camera_id: row.get(1),
        event_time: row.get(2),
    }
}

/// Renders the shared range predicate. Parameters borrow from the filter.
fn build_range_query(filter: &RangeFilter) -> (String, Vec<&(dyn ToSql + Sync)>) {
    let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
    let mut conditions: Vec<String> = Vec::new();

    let join = if filter.city.is_some() {
        " JOIN traffic_cams c ON c.id = r.traffic_cam_id"
    } else {
        ""
    };

    if let Some(window) = &filter.window {
        params.push(&window.start);
        conditions.push(format!("r.start_time >= ${}", params.len()));
        params.push(&window.end);
        conditions.push(format!("r.end_time <= ${}", params.len()));
    }
    if let Some(camera_id) = &filter.camera_id {
        params.push(camera_id);
        conditions.push(format!("r.traffic_cam_id = ${}", params.len()));
    }
    if let Some(city) = &filter.city {
        params.push(city);
        conditions.push(format!("c.city = ${}", params.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT {} FROM traffic_records r{}{} ORDER BY r.id",
        MEASUREMENT_COLUMNS, join, where_clause
    );
    (sql, params)
}

impl MeasurementStore for PgSession {
    fn insert(&mut self, new: &NewMeasurement) -> Result<Measurement> {
        let row = self.client.query_one(
            "INSERT INTO traffic_records AS r
                 (traffic_cam_id, start_time, end_time, vehicle_count, average_speed)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING r.id, r.traffic_cam_id, r.start_time, r.end_time,
                       r.vehicle_count, r.average_speed",
            &[
                &new.camera_id,
                &new.start_time,
                &new.end_time,
                &new.vehicle_count,
                &new.average_speed,
            ],
        )?;
        Ok(measurement_from_row(&row))
    }

    fn latest(&mut self, camera_id: i32) -> Result<Option<Measurement>> {
        let sql = format!(
            "SELECT {} FROM traffic_records r
             WHERE r.traffic_cam_id = $1
             ORDER BY r.end_time DESC, r.id DESC
             LIMIT 1",
            MEASUREMENT_COLUMNS
        );
        let row = self.client.query_opt(sql.as_str(), &[&camera_id])?;
        Ok(row.as_ref().map(measurement_from_row))
    }

    fn mean_speed(&mut self, camera_id: i32) -> Result<Option<f64>> {
        let row = self.client.query_one(
            "SELECT AVG(average_speed) FROM traffic_records WHERE traffic_cam_id = $1",
            &[&camera_id],
        )?;
        Ok(row.get(0))
    }

    fn range_query(&mut self, filter: &RangeFilter) -> Result<Vec<Measurement>> {
        let (sql, params) = build_range_query(filter);
        let rows = self.client.query(sql.as_str(), &params)?;
        Ok(rows.iter().map(measurement_from_row).collect())
    }

    fn insert_alert(&mut self, camera_id: i32, event_time: NaiveDateTime) -> Result<JamAlert> {
        let row = self.client.query_one(
            "INSERT INTO traffic_jam_alerts (traffic_cam_id, event_time)
             VALUES ($1, $2)
             RETURNING id, traffic_cam_id, event_time",
            &[&camera_id, &event_time],
        )?;
        Ok(alert_from_row(&row))
    }

    fn history(
        &mut self,
        camera_id: Option<i32>,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Measurement>> {
        let (start, end) = match window {
            Some(w) => (Some(w.start), Some(w.end)),
            None => (None, None),
        };
        let sql = format!(
            "SELECT {} FROM traffic_records r
             WHERE ($1::int IS NULL OR r.traffic_cam_id = $1)
               AND ($2::timestamp IS NULL OR r.start_time BETWEEN $2 AND $3)
             ORDER BY r.id",
            MEASUREMENT_COLUMNS
        );
        let rows = self.client.query(sql.as_str(), &[&camera_id, &start, &end])?;
        Ok(rows.iter().map(measurement_from_row).collect())
    }

    fn update(
        &mut self,
        id: i32,
        vehicle_count: i32,
        average_speed: f64,
    ) -> Result<Option<Measurement>> {
        let mut tx = self.client.transaction()?;
        let row = tx.query_opt(
            "UPDATE traffic_records AS r
             SET vehicle_count = $2, average_speed = $3
             WHERE r.id = $1
             RETURNING r.id, r.traffic_cam_id, r.start_time, r.end_time,
                       r.vehicle_count, r.average_speed",
            &[&id, &vehicle_count, &average_speed],
        )?;
        tx.commit()?;
        Ok(row.as_ref().map(measurement_from_row))
    }

    fn delete(&mut self, id: i32) -> Result<bool> {
        let mut tx = self.client.transaction()?;
        let affected = tx.execute("DELETE FROM traffic_records WHERE id = $1", &[&id])?;
        tx.commit()?;
        Ok(affected > 0)
    }

    fn alerts_for_camera(&mut self, camera_id: i32) -> Result<Vec<JamAlert>> {
        let rows = self.client.query(
            "SELECT id, traffic_cam_id, event_time FROM traffic_jam_alerts
             WHERE traffic_cam_id = $1
             ORDER BY id",
            &[&camera_id],
        )?;
        Ok(rows.iter().map(alert_from_row).collect())
    }

    fn alerts_since(&mut self, since: NaiveDateTime) -> Result<Vec<JamAlert>> {
        let rows = self.client.query(
            "SELECT id, traffic_cam_id, event_time FROM traffic_jam_alerts
             WHERE event_time >= $1
             ORDER BY id",
            &[&since],
        )?;
        Ok(rows.iter().map(alert_from_row).collect())
    }

    fn cities(&mut self) -> Result<Vec<String>> {
        let rows = self
            .client
            .query("SELECT DISTINCT city FROM traffic_cams ORDER BY city", &[])?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    fn cameras_in_city(&mut self, city: &str) -> Result<Vec<Camera>> {
        let rows = self.client.query(
            "SELECT id, alias, city, location_lat, location_lng FROM traffic_cams
             WHERE city = $1
             ORDER BY id",
            &[&city],
        )?;
        Ok(rows
            .iter()
            .map(|row| Camera {
                id: row.get(0),
                alias: row.get(1),
                city: row.get(2),
                latitude: row.get(3),
                longitude: row.get(4),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

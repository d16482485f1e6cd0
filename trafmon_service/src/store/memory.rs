//! In-process measurement store.
//!
//! Holds cameras, measurements and alerts behind a shared mutex. Sessions are
//! cheap handles onto the same data, so writes through one session are
//! immediately visible to every other session. Filter semantics match the
//! postgres store exactly, including the inner join on city.
//!
//! Once any camera is registered the directory acts like the postgres foreign
//! key: measurements and alerts for unknown camera ids are rejected with a
//! storage error. An empty directory accepts any id.

use chrono::NaiveDateTime;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Connector, MeasurementStore};
use crate::error::{Result, TrafficError};
use crate::model::{Camera, JamAlert, Measurement, NewMeasurement, RangeFilter, TimeWindow};

#[derive(Debug, Default)]
struct MemoryData {
    cameras: Vec<Camera>,
    measurements: Vec<Measurement>,
    alerts: Vec<JamAlert>,
    next_measurement_id: i32,
    next_alert_id: i32,
}

impl MemoryData {
    fn city_of(&self, camera_id: i32) -> Option<&str> {
        self.cameras
            .iter()
            .find(|c| c.id == camera_id)
            .map(|c| c.city.as_str())
    }

    fn ensure_known_camera(&self, camera_id: i32) -> Result<()> {
        if self.cameras.is_empty() || self.cameras.iter().any(|c| c.id == camera_id) {
            return Ok(());
        }
        Err(TrafficError::Storage(format!(
            "camera {} is not in the directory",
            camera_id
        )))
    }

    fn matches(&self, m: &Measurement, filter: &RangeFilter) -> bool {
        if let Some(window) = &filter.window {
            if !window.contains(m) {
                return false;
            }
        }
        if let Some(camera_id) = filter.camera_id {
            if m.camera_id != camera_id {
                return false;
            }
        }
        if let Some(city) = &filter.city {
            if self.city_of(m.camera_id) != Some(city.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Connector for the in-process store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a camera to the directory, replacing any entry with the same id.
    pub fn register_camera(&self, camera: Camera) -> Result<()> {
        let mut data = lock(&self.data)?;
        data.cameras.retain(|c| c.id != camera.id);
        data.cameras.push(camera);
        Ok(())
    }
}

impl Connector for MemoryStore {
    type Session = MemorySession;

    fn open(&self) -> Result<MemorySession> {
        Ok(MemorySession {
            data: Arc::clone(&self.data),
        })
    }
}

/// A session onto a `MemoryStore`.
#[derive(Debug)]
pub struct MemorySession {
    data: Arc<Mutex<MemoryData>>,
}

fn lock(data: &Mutex<MemoryData>) -> Result<MutexGuard<'_, MemoryData>> {
    data.lock()
        .map_err(|_| TrafficError::Storage("in-memory store lock poisoned".to_string()))
}

impl MemoryStore {
    #[cfg(test)]
    pub(crate) fn measurement_count(&self) -> usize {
        self.data.lock().map(|d| d.measurements.len()).unwrap_or(0)
    }
}

impl MeasurementStore for MemorySession {
    fn insert(&mut self, new: &NewMeasurement) -> Result<Measurement> {
        let mut data = lock(&self.data)?;
        data.ensure_known_camera(new.camera_id)?;
        data.next_measurement_id += 1;
        let stored = Measurement {
            id: data.next_measurement_id,
            camera_id: new.camera_id,
            start_time: new.start_time,
            end_time: new.end_time,
            vehicle_count: new.vehicle_count,
            average_speed: new.average_speed,
        };
        data.measurements.push(stored.clone());
        Ok(stored)
    }

    fn latest(&mut self, camera_id: i32) -> Result<Option<Measurement>> {
        let data = lock(&self.data)?;
        // Later insertions win ties on end_time.
        let latest = data
            .measurements
            .iter()
            .filter(|m| m.camera_id == camera_id)
            .fold(None::<&Measurement>, |best, m| match best {
                Some(b) if b.end_time > m.end_time => Some(b),
                _ => Some(m),
            });
        Ok(latest.cloned())
    }

    fn mean_speed(&mut self, camera_id: i32) -> Result<Option<f64>> {
        let data = lock(&self.data)?;
        let (sum, count) = data
            .measurements
            .iter()
            .filter(|m| m.camera_id == camera_id)
            .fold((0.0_f64, 0_usize), |(sum, n), m| (sum + m.average_speed, n + 1));
        Ok((count > 0).then(|| sum / count as f64))
    }

    fn range_query(&mut self, filter: &RangeFilter) -> Result<Vec<Measurement>> {
        let data = lock(&self.data)?;
        Ok(data
            .measurements
            .iter()
            .filter(|m| data.matches(m, filter))
            .cloned()
            .collect())
    }

    fn insert_alert(&mut self, camera_id: i32, event_time: NaiveDateTime) -> Result<JamAlert> {
        let mut data = lock(&self.data)?;
        data.ensure_known_camera(camera_id)?;
        data.next_alert_id += 1;
        let alert = JamAlert {
            id: data.next_alert_id,
            camera_id,
            event_time,
        };
        data.alerts.push(alert.clone());
        Ok(alert)
    }

    fn history(
        &mut self,
        camera_id: Option<i32>,
        window: Option<TimeWindow>,
    ) -> Result<Vec<Measurement>> {
        let data = lock(&self.data)?;
        Ok(data
            .measurements
            .iter()
            .filter(|m| camera_id.is_none_or(|id| m.camera_id == id))
            .filter(|m| window.is_none_or(|w| w.starts_within(m)))
            .cloned()
            .collect())
    }

    fn update(
        &mut self,
        id: i32,
        vehicle_count: i32,
        average_speed: f64,
    ) -> Result<Option<Measurement>> {
        let mut data = lock(&self.data)?;
        Ok(data.measurements.iter_mut().find(|m| m.id == id).map(|m| {
            m.vehicle_count = vehicle_count;
            m.average_speed = average_speed;
            m.clone()
        }))
    }

    fn delete(&mut self, id: i32) -> Result<bool> {
        let mut data = lock(&self.data)?;
        let before = data.measurements.len();
        data.measurements.retain(|m| m.id != id);
        Ok(data.measurements.len() < before)
    }

    fn alerts_for_camera(&mut self, camera_id: i32) -> Result<Vec<JamAlert>> {
        let data = lock(&self.data)?;
        Ok(data
            .alerts
            .iter()
            .filter(|a| a.camera_id == camera_id)
            .cloned()
            .collect())
    }

    fn alerts_since(&mut self, since: NaiveDateTime) -> Result<Vec<JamAlert>> {
        let data = lock(&self.data)?;
        Ok(data
            .alerts
            .iter()
            .filter(|a| a.event_time >= since)
            .cloned()
            .collect())
    }

    fn cities(&mut self) -> Result<Vec<String>> {
        let data = lock(&self.data)?;
        let mut cities: Vec<String> = data.cameras.iter().map(|c| c.city.clone()).collect();
        cities.sort();
        cities.dedup();
        Ok(cities)
    }

    fn cameras_in_city(&mut self, city: &str) -> Result<Vec<Camera>> {
        let data = lock(&self.data)?;
        Ok(data
            .cameras
            .iter()
            .filter(|c| c.city == city)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

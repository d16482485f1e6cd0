//! Peak-hour ranking.
//!
//! Measurements are bucketed by the hour of day of their `start_time` (the
//! date is ignored) and ranked by total vehicle count, busiest first. Equal
//! totals are ordered by ascending hour.

use serde::Serialize;
use std::collections::BTreeMap;

use chrono::Timelike;

use crate::model::Measurement;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakHour {
    /// `"HH:00"`
    pub hour: String,
    pub total_vehicles: i64,
}

pub fn peak_hours(measurements: &[Measurement]) -> Vec<PeakHour> {
    let mut buckets: BTreeMap<u32, i64> = BTreeMap::new();
    for m in measurements {
        *buckets.entry(m.start_time.hour()).or_insert(0) += i64::from(m.vehicle_count);
    }

    // BTreeMap iterates in ascending hour; the stable sort keeps that order
    // among equal totals.
    let mut ranked: Vec<(u32, i64)> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    ranked
        .into_iter()
        .map(|(hour, total_vehicles)| PeakHour {
            hour: hour_label(hour),
            total_vehicles,
        })
        .collect()
}

fn hour_label(hour: u32) -> String {
    format!("{:02}:00", hour)
}

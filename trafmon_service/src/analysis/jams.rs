//! Jam interval listing.

use crate::model::{Measurement, MeasurementRecord};

/// Flattened records of every interval with `average_speed <= speed_threshold`,
/// in the order given.
pub fn jam_records(measurements: &[Measurement], speed_threshold: f64) -> Vec<MeasurementRecord> {
    measurements
        .iter()
        .filter(|m| m.average_speed <= speed_threshold)
        .map(Measurement::to_record)
        .collect()
}

/// Flattened records of every interval, in the order given.
pub fn all_records(measurements: &[Measurement]) -> Vec<MeasurementRecord> {
    measurements.iter().map(Measurement::to_record).collect()
}

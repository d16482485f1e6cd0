//! Speed-based congestion percentage.

use serde::Serialize;

use crate::model::Measurement;

/// Share of slow intervals above which a camera is reported as congested.
pub const CONGESTED_ABOVE_PERCENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CongestionStatus {
    #[serde(rename = "congested")]
    Congested,
    #[serde(rename = "fluid")]
    Fluid,
    #[serde(rename = "no data")]
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CongestionReport {
    pub congestion_percentage: f64,
    pub status: CongestionStatus,
}

/// Percentage of intervals with `average_speed <= speed_threshold`, rounded
/// to two decimals. An empty slice is an explicit "no data" report, not an
/// error.
pub fn congestion(measurements: &[Measurement], speed_threshold: f64) -> CongestionReport {
    let total = measurements.len();
    if total == 0 {
        return CongestionReport {
            congestion_percentage: 0.0,
            status: CongestionStatus::NoData,
        };
    }

    let slow = measurements
        .iter()
        .filter(|m| m.average_speed <= speed_threshold)
        .count();
    let percentage = slow as f64 / total as f64 * 100.0;

    let status = if percentage > CONGESTED_ABOVE_PERCENT {
        CongestionStatus::Congested
    } else {
        CongestionStatus::Fluid
    };

    CongestionReport {
        congestion_percentage: round_to_hundredths(percentage),
        status,
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

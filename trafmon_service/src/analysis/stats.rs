//! Range statistics: mean speed and total volume over a filtered slice.

use serde::Serialize;

use crate::model::Measurement;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeStats {
    pub average_speed: f64,
    pub total_vehicle_count: i64,
}

/// Returns `None` for an empty slice; "no data" is not the same as zero.
pub fn range_stats(measurements: &[Measurement]) -> Option<RangeStats> {
    if measurements.is_empty() {
        return None;
    }
    let speed_sum: f64 = measurements.iter().map(|m| m.average_speed).sum();
    Some(RangeStats {
        average_speed: speed_sum / measurements.len() as f64,
        total_vehicle_count: total_volume(measurements),
    })
}

/// Sum of vehicle counts; 0 for an empty slice.
pub fn total_volume(measurements: &[Measurement]) -> i64 {
    measurements.iter().map(|m| i64::from(m.vehicle_count)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn m(count: i32, speed: f64) -> Measurement {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Measurement {
            id: 0,
            camera_id: 1,
            start_time: start,
            end_time: start + chrono::Duration::minutes(15),
            vehicle_count: count,
            average_speed: speed,
        }
    }

    #[test]
    fn test_stats_average_and_total() {
        let stats = range_stats(&[m(10, 30.0), m(20, 50.0), m(30, 70.0)]).unwrap();
        assert_eq!(stats.average_speed, 50.0);
        assert_eq!(stats.total_vehicle_count, 60);
    }

    #[test]
    fn test_empty_slice_has_no_stats() {
        assert_eq!(range_stats(&[]), None);
        assert_eq!(total_volume(&[]), 0);
    }

    #[test]
    fn test_total_does_not_overflow_i32() {
        let big = vec![m(i32::MAX, 10.0), m(i32::MAX, 10.0)];
        assert_eq!(total_volume(&big), 2 * i64::from(i32::MAX));
    }
}

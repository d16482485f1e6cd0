//! Traffic state classification.
//!
//! A camera's state compares the speed of its most recent interval (greatest
//! `end_time`) against the mean speed of its entire history. The bands are
//! evaluated in a fixed order and the first match wins:
//!
//! 1. `0.8 * avg <= v <= 1.2 * avg` → `Regular`
//! 2. `v >= 1.2 * avg`              → `Low`
//! 3. `0.2 * avg < v < 0.8 * avg`   → `High`
//! 4. anything else                 → `Jam`
//!
//! Band 1 is inclusive at both ends, so `v == 1.2 * avg` is `Regular`, not
//! `Low`, and `avg == 0, v == 0` is `Regular`. The bands overlap at that
//! boundary on purpose: the ordering is the observable contract.

use crate::error::{Result, TrafficError};
use crate::model::TrafficState;
use crate::store::MeasurementStore;

/// Band factors relative to the camera's historical mean speed.
pub const REGULAR_LOWER_FACTOR: f64 = 0.8;
pub const REGULAR_UPPER_FACTOR: f64 = 1.2;
pub const JAM_FACTOR: f64 = 0.2;

/// Classifies a latest-interval speed against a historical mean.
pub fn classify_speed(latest_speed: f64, mean_speed: f64) -> TrafficState {
    let v = latest_speed;
    let avg = mean_speed;

    if avg * REGULAR_LOWER_FACTOR <= v && v <= avg * REGULAR_UPPER_FACTOR {
        return TrafficState::Regular;
    }
    if v >= avg * REGULAR_UPPER_FACTOR {
        return TrafficState::Low;
    }
    if avg * JAM_FACTOR < v && v < avg * REGULAR_LOWER_FACTOR {
        return TrafficState::High;
    }
    TrafficState::Jam
}

/// Derives the current state of a camera from its stored history.
///
/// Fails with `NotFound` when the camera has no measurements.
pub fn classify<S: MeasurementStore + ?Sized>(store: &mut S, camera_id: i32) -> Result<TrafficState> {
    let latest = store.latest(camera_id)?.ok_or_else(|| no_history(camera_id))?;
    let mean = store.mean_speed(camera_id)?.ok_or_else(|| no_history(camera_id))?;
    Ok(classify_speed(latest.average_speed, mean))
}

fn no_history(camera_id: i32) -> TrafficError {
    TrafficError::NotFound(format!("no measurements for camera {}", camera_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewMeasurement;
    use crate::store::memory::MemoryStore;
    use crate::store::Connector;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn slot(i: i64) -> (NaiveDateTime, NaiveDateTime) {
        let base = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        let start = base + Duration::minutes(15 * i);
        (start, start + Duration::minutes(15))
    }

    fn seed(store: &MemoryStore, camera_id: i32, speeds: &[f64]) {
        let mut session = store.open().unwrap();
        for (i, speed) in speeds.iter().enumerate() {
            let (start, end) = slot(i as i64);
            session
                .insert(&NewMeasurement {
                    camera_id,
                    start_time: start,
                    end_time: end,
                    vehicle_count: 20,
                    average_speed: *speed,
                })
                .unwrap();
        }
    }

    // --- Pure band evaluation ------------------------------------------------

    #[test]
    fn test_upper_regular_boundary_wins_over_low() {
        assert_eq!(classify_speed(120.0, 100.0), TrafficState::Regular);
        assert_eq!(classify_speed(121.0, 100.0), TrafficState::Low);
    }

    #[test]
    fn test_lower_regular_boundary_is_inclusive() {
        assert_eq!(classify_speed(80.0, 100.0), TrafficState::Regular);
        assert_eq!(classify_speed(79.0, 100.0), TrafficState::High);
    }

    #[test]
    fn test_jam_boundary_is_excluded_from_high() {
        assert_eq!(classify_speed(21.0, 100.0), TrafficState::High);
        assert_eq!(classify_speed(20.0, 100.0), TrafficState::Jam);
        assert_eq!(classify_speed(0.0, 100.0), TrafficState::Jam);
    }

    #[test]
    fn test_zero_mean_degenerate_cases() {
        // 0 <= 0 <= 0 satisfies the Regular band.
        assert_eq!(classify_speed(0.0, 0.0), TrafficState::Regular);
        // Any positive speed over a zero mean falls through to Low.
        assert_eq!(classify_speed(5.0, 0.0), TrafficState::Low);
    }

    // --- Store-backed classification ----------------------------------------

    #[test]
    fn test_classify_uses_latest_and_full_history_mean() {
        let store = MemoryStore::new();
        // mean = 100, latest = 121
        seed(&store, 1, &[79.0, 121.0]);
        let mut s = store.open().unwrap();
        assert_eq!(classify(&mut s, 1).unwrap(), TrafficState::Low);
    }

    #[test]
    fn test_classify_jam_case() {
        let store = MemoryStore::new();
        // mean = 100, latest = 20
        seed(&store, 2, &[180.0, 20.0]);
        let mut s = store.open().unwrap();
        assert_eq!(classify(&mut s, 2).unwrap(), TrafficState::Jam);
    }

    #[test]
    fn test_reordering_history_does_not_change_state() {
        let a = MemoryStore::new();
        seed(&a, 1, &[40.0, 90.0, 70.0, 55.0]);
        let b = MemoryStore::new();
        seed(&b, 1, &[70.0, 40.0, 90.0, 55.0]);
        let state_a = classify(&mut a.open().unwrap(), 1).unwrap();
        let state_b = classify(&mut b.open().unwrap(), 1).unwrap();
        assert_eq!(state_a, state_b);
    }

    #[test]
    fn test_unknown_camera_is_not_found() {
        let store = MemoryStore::new();
        seed(&store, 1, &[50.0]);
        let mut s = store.open().unwrap();
        assert!(matches!(classify(&mut s, 99), Err(TrafficError::NotFound(_))));
    }
}

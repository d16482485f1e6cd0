//! Jam alert generation.
//!
//! # Clock injection
//! `check_and_alert` takes `now` rather than reading the clock, so the alert
//! timestamp (the moment of evaluation, not the measurement's interval) is
//! deterministic in tests.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::analysis::classifier;
use crate::error::Result;
use crate::model::{JamAlert, TrafficState};
use crate::store::MeasurementStore;

/// Outcome of the post-ingestion check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertCheck {
    pub state: TrafficState,
    pub alert: Option<JamAlert>,
}

/// Re-classifies the camera and records a `JamAlert` when the state is `Jam`.
///
/// Must run after the triggering measurement is written, on a store that
/// observes that write.
pub fn check_and_alert<S: MeasurementStore + ?Sized>(
    store: &mut S,
    camera_id: i32,
    now: NaiveDateTime,
) -> Result<AlertCheck> {
    let state = classifier::classify(store, camera_id)?;
    let alert = if state == TrafficState::Jam {
        Some(store.insert_alert(camera_id, now)?)
    } else {
        None
    };
    Ok(AlertCheck { state, alert })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewMeasurement;
    use crate::store::memory::MemoryStore;
    use crate::store::Connector;
    use chrono::{Duration, NaiveDate};

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(13, 0, 0)
            .unwrap()
    }

    fn insert(store: &MemoryStore, camera_id: i32, slot: i64, speed: f64) {
        let start = fixed_now() - Duration::hours(6) + Duration::minutes(15 * slot);
        store
            .open()
            .unwrap()
            .insert(&NewMeasurement {
                camera_id,
                start_time: start,
                end_time: start + Duration::minutes(15),
                vehicle_count: 25,
                average_speed: speed,
            })
            .unwrap();
    }

    #[test]
    fn test_jam_raises_alert_stamped_with_evaluation_time() {
        let store = MemoryStore::new();
        insert(&store, 1, 0, 90.0);
        insert(&store, 1, 1, 5.0);
        let mut s = store.open().unwrap();

        let check = check_and_alert(&mut s, 1, fixed_now()).unwrap();
        assert_eq!(check.state, TrafficState::Jam);
        let alert = check.alert.expect("jam should raise an alert");
        assert_eq!(alert.camera_id, 1);
        assert_eq!(alert.event_time, fixed_now());
        assert_eq!(s.alerts_for_camera(1).unwrap(), vec![alert]);
    }

    #[test]
    fn test_non_jam_states_raise_nothing() {
        let store = MemoryStore::new();
        insert(&store, 2, 0, 50.0);
        insert(&store, 2, 1, 50.0);
        let mut s = store.open().unwrap();

        let check = check_and_alert(&mut s, 2, fixed_now()).unwrap();
        assert_eq!(check.state, TrafficState::Regular);
        assert!(check.alert.is_none());
        assert!(s.alerts_for_camera(2).unwrap().is_empty());
    }

    #[test]
    fn test_repeated_jams_are_not_deduplicated() {
        let store = MemoryStore::new();
        insert(&store, 3, 0, 100.0);
        insert(&store, 3, 1, 100.0);
        insert(&store, 3, 2, 2.0);
        let mut s = store.open().unwrap();
        check_and_alert(&mut s, 3, fixed_now()).unwrap();

        insert(&store, 3, 3, 1.0);
        check_and_alert(&mut s, 3, fixed_now() + Duration::minutes(15)).unwrap();

        assert_eq!(s.alerts_for_camera(3).unwrap().len(), 2);
    }
}

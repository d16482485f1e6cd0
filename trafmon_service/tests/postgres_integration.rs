//! Integration tests for the postgres measurement store.
//!
//! Tests verify:
//! 1. The schema can be applied and verified
//! 2. Inserted measurements are visible to classification on the next read
//! 3. Range filters (window containment, camera, city join) match the
//!    in-memory store
//! 4. Alerts and administrative corrections persist
//!
//! Prerequisites:
//! - PostgreSQL running and reachable
//! - DATABASE_URL set in the environment or .env
//!
//! Run with: cargo test --test postgres_integration -- --ignored --test-threads=1

use chrono::{Duration, NaiveDate, NaiveDateTime};
use postgres::Client;
use std::env;

use trafmon_service::analysis::congestion::CongestionStatus;
use trafmon_service::db;
use trafmon_service::store::postgres::PgConnector;
use trafmon_service::{NewMeasurement, TrafficError, TrafficService, TrafficState};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Camera ids reserved for these tests.
const TEST_CAMERAS: &[(i32, &str)] = &[(900001, "TestCity"), (900002, "TestCity"), (900003, "OtherTestCity")];

fn database_url() -> String {
    dotenv::dotenv().ok();
    env::var("DATABASE_URL").expect("DATABASE_URL must be set")
}

fn setup_test_db() -> Client {
    let mut client = db::connect(&database_url()).expect("Failed to connect to test database");
    db::apply_schema(&mut client).expect("Failed to apply schema");
    cleanup_test_data(&mut client);

    for (id, city) in TEST_CAMERAS {
        client
            .execute(
                "INSERT INTO traffic_cams (id, alias, city, location_lat, location_lng)
                 VALUES ($1, $2, $3, 40.0, -3.7)
                 ON CONFLICT (id) DO NOTHING",
                &[id, &format!("Test cam {}", id), city],
            )
            .expect("Failed to insert test camera");
    }
    client
}

fn cleanup_test_data(client: &mut Client) {
    let ids: Vec<i32> = TEST_CAMERAS.iter().map(|(id, _)| *id).collect();
    // Delete in order to respect foreign key constraints
    let _ = client.execute("DELETE FROM traffic_jam_alerts WHERE traffic_cam_id = ANY($1)", &[&ids]);
    let _ = client.execute("DELETE FROM traffic_records WHERE traffic_cam_id = ANY($1)", &[&ids]);
}

fn service() -> TrafficService<PgConnector> {
    TrafficService::new(PgConnector::new(database_url()))
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2001, 2, 3)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn interval(camera_id: i32, start: NaiveDateTime, count: i32, speed: f64) -> NewMeasurement {
    NewMeasurement {
        camera_id,
        start_time: start,
        end_time: start + Duration::minutes(15),
        vehicle_count: count,
        average_speed: speed,
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires a live database
fn test_schema_verifies_after_apply() {
    let mut client = setup_test_db();
    db::verify_tables(&mut client).expect("all required tables should exist");
}

// ---------------------------------------------------------------------------
// Ingestion, classification, alerts
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires a live database
fn test_ingest_classify_and_alert_round_trip() {
    let mut client = setup_test_db();
    let service = service();

    service
        .record_measurement_at(&interval(900001, at(8, 0), 10, 90.0), at(8, 16))
        .unwrap();
    let report = service
        .record_measurement_at(&interval(900001, at(8, 15), 40, 4.0), at(8, 31))
        .unwrap();

    assert_eq!(report.state, Some(TrafficState::Jam));
    let alert = report.alert.expect("jam should raise an alert");
    assert_eq!(alert.event_time, at(8, 31));
    assert_eq!(service.classify(900001).unwrap(), TrafficState::Jam);
    assert_eq!(service.alerts_for_camera(900001).unwrap(), vec![alert]);

    assert!(matches!(service.classify(900002), Err(TrafficError::NotFound(_))));

    cleanup_test_data(&mut client);
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires a live database
fn test_range_filters_match_memory_semantics() {
    let mut client = setup_test_db();
    let service = service();

    service.record_measurement_at(&interval(900001, at(7, 50), 99, 30.0), at(8, 6)).unwrap();
    service.record_measurement_at(&interval(900001, at(8, 0), 10, 10.0), at(8, 16)).unwrap();
    service.record_measurement_at(&interval(900002, at(17, 0), 80, 50.0), at(17, 16)).unwrap();
    service.record_measurement_at(&interval(900003, at(17, 0), 5, 15.0), at(17, 16)).unwrap();

    let stats = service
        .range_stats(at(8, 0), at(23, 0), None, Some("TestCity"))
        .unwrap();
    assert_eq!(stats.total_vehicle_count, 90);
    assert_eq!(stats.average_speed, 30.0);

    let peak = service.peak_hours(at(8, 0), at(23, 0), None, Some("TestCity")).unwrap();
    assert_eq!(peak[0].hour, "17:00");
    assert_eq!(peak[0].total_vehicles, 80);
    assert_eq!(peak[1].hour, "08:00");

    let jams = service.jams(at(0, 0), at(23, 0), None, None, Some("TestCity")).unwrap();
    assert_eq!(jams.len(), 1);
    assert_eq!(jams[0].start_datetime, "2001-02-03 08:00:00");

    let congestion = service.congestion(900001, None, None, Some(20.0), None).unwrap();
    assert_eq!(congestion.congestion_percentage, 50.0);
    assert_eq!(congestion.status, CongestionStatus::Fluid);

    let empty = service
        .congestion(900002, Some(at(0, 0)), Some(at(1, 0)), None, None)
        .unwrap();
    assert_eq!(empty.status, CongestionStatus::NoData);

    cleanup_test_data(&mut client);
}

// ---------------------------------------------------------------------------
// Administrative corrections
// ---------------------------------------------------------------------------

#[test]
#[ignore] // Requires a live database
fn test_update_and_delete_round_trip() {
    let mut client = setup_test_db();
    let service = service();

    let report = service
        .record_measurement_at(&interval(900002, at(9, 0), 10, 40.0), at(9, 16))
        .unwrap();
    let id = report.measurement.id;

    let updated = service.update_measurement(id, 55, 12.5).unwrap();
    assert_eq!(updated.vehicle_count, 55);
    assert_eq!(updated.average_speed, 12.5);
    assert!(service.alerts_for_camera(900002).unwrap().is_empty());

    let window = trafmon_service::model::TimeWindow::new(at(8, 0), at(10, 0));
    assert_eq!(service.total_volume(Some(900002), Some(window)).unwrap(), 55);

    service.delete_measurement(id).unwrap();
    assert!(matches!(service.delete_measurement(id), Err(TrafficError::NotFound(_))));
    assert!(service.history(Some(900002), None).unwrap().is_empty());

    cleanup_test_data(&mut client);
}

#[test]
#[ignore] // Requires a live database
fn test_directory_contains_test_cities() {
    let _client = setup_test_db();
    let service = service();

    let cities = service.cities().unwrap();
    assert!(cities.contains(&"TestCity".to_string()));
    assert!(cities.contains(&"OtherTestCity".to_string()));

    let cams = service.cameras_in_city("TestCity").unwrap();
    let ids: Vec<i32> = cams.iter().map(|c| c.id).collect();
    assert!(ids.contains(&900001) && ids.contains(&900002));
    assert!(!ids.contains(&900003));
}

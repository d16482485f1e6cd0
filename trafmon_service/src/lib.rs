//! Traffic camera monitoring service.
//!
//! Ingests per-interval camera measurements (vehicle counts and average
//! speeds), classifies each camera's current traffic state, records jam
//! alerts, and answers congestion and volume queries over time ranges.

pub mod alert;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use error::{Result, TrafficError};
pub use model::{Camera, JamAlert, Measurement, NewMeasurement, TrafficState};
pub use service::{IngestReport, TrafficService};

//! Jam alerting.
//!
//! An alert is raised once per ingested measurement whose post-ingestion
//! classification is `Jam`. There is no suppression window: consecutive jam
//! ingestions for the same camera each raise their own alert, and corrections
//! to stored measurements never raise or retract alerts.

pub mod jam_alerts;

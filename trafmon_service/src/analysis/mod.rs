//! Traffic analysis for the monitoring service.
//!
//! Everything here is a pure function of stored measurements: the store
//! answers a `RangeFilter`, these modules reduce the result.
//!
//! Submodules:
//! - `classifier`: maps a camera's history to a `TrafficState`.
//! - `stats`:      mean speed and total volume over a range.
//! - `peak_hours`: hour-of-day ranking by vehicle volume.
//! - `congestion`: share of slow intervals and a status label.
//! - `jams`:       flattened listing of slow intervals.

pub mod classifier;
pub mod congestion;
pub mod jams;
pub mod peak_hours;
pub mod stats;

//! Command-line interface for the `trafmon_service` binary.
//!
//! Timestamps are ISO 8601 (`2024-05-01T08:00:00`, optionally with an offset)
//! and go through the same parser as ingested payloads.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{ArgGroup, Args, Parser, Subcommand};

use crate::error::{Result, TrafficError};
use crate::ingest::register::{parse_datetime, validate_counts};

/// Traffic camera monitoring service
#[derive(Parser, Debug)]
#[command(
    name = "trafmon_service",
    version,
    about = "Traffic camera measurement ingestion and analytics",
    arg_required_else_help = true,
    after_help = "Timestamps are ISO 8601, e.g. 2024-05-01T08:00:00."
)]
pub struct Cli {
    /// Configuration file path (defaults to ./trafmon.toml when present)
    #[arg(short, long, env = "TRAFMON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Time range with the optional camera and city filters.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RangeArgs {
    /// Range start (inclusive, compared with each interval's start)
    #[arg(long, value_parser = parse_datetime)]
    pub start: NaiveDateTime,

    /// Range end (inclusive, compared with each interval's end)
    #[arg(long, value_parser = parse_datetime)]
    pub end: NaiveDateTime,

    /// Only this camera
    #[arg(long = "camera")]
    pub camera_id: Option<i32>,

    /// Only cameras registered in this city
    #[arg(long)]
    pub city: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create tables if missing
    InitDb,

    /// Store one measurement from a JSON payload
    Ingest {
        /// JSON object with traffic_cam_id, start_datetime, end_datetime,
        /// vehicle_count and average_speed
        payload: String,
    },

    /// Store one measurement per line of a JSON-lines file
    Import {
        /// Path to the .jsonl file
        path: String,
    },

    /// Current traffic state of a camera
    State {
        camera_id: i32,
    },

    /// Mean speed and total vehicle count over a range
    Stats(RangeArgs),

    /// Hours of the day ranked by vehicle volume
    PeakHours(RangeArgs),

    /// Share of slow intervals for one camera
    Congestion {
        #[arg(long = "camera")]
        camera_id: i32,

        /// Applied together with --end; a single bound is ignored
        #[arg(long, value_parser = parse_datetime)]
        start: Option<NaiveDateTime>,

        #[arg(long, value_parser = parse_datetime)]
        end: Option<NaiveDateTime>,

        /// Speed at or below which an interval counts as slow
        #[arg(long, value_parser = threshold_arg)]
        threshold: Option<f64>,

        #[arg(long)]
        city: Option<String>,
    },

    /// Intervals at or below the speed threshold
    Jams {
        #[command(flatten)]
        range: RangeArgs,

        /// Speed at or below which an interval counts as a jam
        #[arg(long, value_parser = threshold_arg)]
        threshold: Option<f64>,
    },

    /// Every interval in a range
    Records(RangeArgs),

    /// Stored measurements, optionally by camera and start-time window
    History {
        #[arg(long = "camera")]
        camera_id: Option<i32>,

        #[arg(long, value_parser = parse_datetime, requires = "end")]
        start: Option<NaiveDateTime>,

        #[arg(long, value_parser = parse_datetime, requires = "start")]
        end: Option<NaiveDateTime>,
    },

    /// Total vehicle count, optionally by camera and start-time window
    Volume {
        #[arg(long = "camera")]
        camera_id: Option<i32>,

        #[arg(long, value_parser = parse_datetime, requires = "end")]
        start: Option<NaiveDateTime>,

        #[arg(long, value_parser = parse_datetime, requires = "start")]
        end: Option<NaiveDateTime>,
    },

    /// Correct the counts of a stored measurement
    Update {
        id: i32,

        #[arg(value_parser = vehicle_count_arg)]
        vehicle_count: i32,

        #[arg(value_parser = average_speed_arg)]
        average_speed: f64,
    },

    /// Remove a stored measurement
    Delete {
        id: i32,
    },

    /// Jam alerts for one camera, or raised since a time
    #[command(group(ArgGroup::new("selector").required(true).args(["camera_id", "since"])))]
    Alerts {
        #[arg(long = "camera")]
        camera_id: Option<i32>,

        #[arg(long, value_parser = parse_datetime)]
        since: Option<NaiveDateTime>,
    },

    /// Cities with registered cameras
    Cities,

    /// Cameras registered in a city
    Cams {
        city: String,
    },
}

fn invalid(message: impl Into<String>) -> TrafficError {
    TrafficError::Validation(message.into())
}

fn vehicle_count_arg(value: &str) -> Result<i32> {
    let count = value
        .trim()
        .parse::<i32>()
        .map_err(|_| invalid(format!("invalid vehicle count '{}'", value)))?;
    validate_counts(count, 0.0)?;
    Ok(count)
}

fn average_speed_arg(value: &str) -> Result<f64> {
    let speed = value
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(format!("invalid average speed '{}'", value)))?;
    validate_counts(0, speed)?;
    Ok(speed)
}

fn threshold_arg(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
        .ok_or_else(|| invalid(format!("invalid speed threshold '{}'", value)))
}

/// Process exit code for a failed command.
pub fn exit_code(err: &TrafficError) -> u8 {
    match err {
        TrafficError::Storage(_) => 1,
        TrafficError::Validation(_) => 2,
        TrafficError::NotFound(_) => 3,
    }
}

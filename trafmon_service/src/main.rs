use std::process::ExitCode;

use clap::Parser;
use serde_json::{Value, json};

use trafmon_service::cli::{self, Cli, Command, RangeArgs};
use trafmon_service::config::ServiceConfig;
use trafmon_service::ingest::{import, register};
use trafmon_service::logging::{self, Component};
use trafmon_service::model::TimeWindow;
use trafmon_service::store::postgres::PgConnector;
use trafmon_service::{Result, TrafficError, TrafficService, db};

fn main() -> ExitCode {
    // `.env` may carry TRAFMON_CONFIG, which clap reads while parsing.
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let result = ServiceConfig::load(cli.config.as_deref()).and_then(|config| {
        logging::init_logger(
            config.logging.level,
            config.logging.file.as_deref(),
            config.logging.console_timestamps,
        );
        run(cli.command, &config)
    });

    match result {
        Ok(output) => {
            println!("{}", render(&output));
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", render(&json!({ "error": err.to_string() })));
            ExitCode::from(cli::exit_code(&err))
        }
    }
}

fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| TrafficError::Storage(format!("cannot encode result: {}", e)))
}

fn run(command: Command, config: &ServiceConfig) -> Result<Value> {
    let database_url = config.database_url()?;

    if matches!(command, Command::InitDb) {
        let mut client = db::connect(database_url)?;
        db::apply_schema(&mut client)?;
        return Ok(json!({ "message": "schema applied" }));
    }

    // Fail fast on a missing schema; each operation then opens its own session.
    drop(db::connect_and_verify(database_url)?);
    logging::debug(Component::System, None, "database schema verified");

    let service = TrafficService::new(PgConnector::new(database_url))
        .with_default_speed_threshold(config.analysis.default_speed_threshold);

    match command {
        Command::InitDb => Ok(Value::Null),
        Command::Ingest { payload } => {
            let new = register::parse_payload_str(&payload)?;
            to_json(service.record_measurement(&new)?)
        }
        Command::Import { path } => to_json(import::import_file(&service, &path)?),
        Command::State { camera_id } => {
            let state = service.classify(camera_id)?;
            Ok(json!({ "traffic_state": state.to_string() }))
        }
        Command::Stats(RangeArgs { start, end, camera_id, city }) => {
            to_json(service.range_stats(start, end, camera_id, city.as_deref())?)
        }
        Command::PeakHours(RangeArgs { start, end, camera_id, city }) => {
            let peak = service.peak_hours(start, end, camera_id, city.as_deref())?;
            Ok(json!({ "peak_hours": to_json(peak)? }))
        }
        Command::Congestion { camera_id, start, end, threshold, city } => {
            to_json(service.congestion(camera_id, start, end, threshold, city.as_deref())?)
        }
        Command::Jams { range, threshold } => {
            let RangeArgs { start, end, camera_id, city } = range;
            let jams = service.jams(start, end, threshold, camera_id, city.as_deref())?;
            Ok(json!({ "traffic_jams": to_json(jams)? }))
        }
        Command::Records(RangeArgs { start, end, camera_id, city }) => {
            let records = service.records(start, end, camera_id, city.as_deref())?;
            Ok(json!({ "traffic_records": to_json(records)? }))
        }
        Command::History { camera_id, start, end } => {
            let history = service.history(camera_id, TimeWindow::from_bounds(start, end))?;
            Ok(json!({ "measurements": to_json(history)? }))
        }
        Command::Volume { camera_id, start, end } => {
            let total = service.total_volume(camera_id, TimeWindow::from_bounds(start, end))?;
            Ok(json!({ "total_vehicle_count": total }))
        }
        Command::Update { id, vehicle_count, average_speed } => {
            to_json(service.update_measurement(id, vehicle_count, average_speed)?)
        }
        Command::Delete { id } => {
            service.delete_measurement(id)?;
            Ok(json!({ "message": format!("measurement {} deleted", id) }))
        }
        Command::Alerts { camera_id, since } => {
            let alerts = match (camera_id, since) {
                (Some(camera_id), _) => service.alerts_for_camera(camera_id)?,
                (None, Some(since)) => service.alerts_since(since)?,
                (None, None) => {
                    return Err(TrafficError::Validation(
                        "alerts needs --camera or --since".to_string(),
                    ));
                }
            };
            Ok(json!({ "alerts": to_json(alerts)? }))
        }
        Command::Cities => Ok(json!({ "cities": service.cities()? })),
        Command::Cams { city } => Ok(json!({ "cams": to_json(service.cameras_in_city(&city)?)? })),
    }
}

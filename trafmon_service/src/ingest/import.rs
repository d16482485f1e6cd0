//! Batch import of new-measurement payloads.
//!
//! Reads a JSON-lines file (one payload per line, blank lines ignored) and
//! ingests each payload in order through `TrafficService::record_measurement`.
//! A bad line is logged and counted; it does not stop the import.

use serde::Serialize;
use std::fs;

use super::register;
use crate::error::{Result, TrafficError};
use crate::logging::{self, Component};
use crate::service::TrafficService;
use crate::store::Connector;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub alerts_raised: usize,
}

/// Ingests every payload in `text`.
pub fn import_lines<C: Connector>(service: &TrafficService<C>, text: &str) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        summary.total += 1;

        let outcome = register::parse_payload_str(line)
            .and_then(|new| service.record_measurement(&new));
        match outcome {
            Ok(report) => {
                summary.successful += 1;
                if report.alert.is_some() {
                    summary.alerts_raised += 1;
                }
            }
            Err(err) => {
                summary.failed += 1;
                logging::warn(
                    Component::Ingest,
                    None,
                    &format!("line {} skipped: {}", index + 1, err),
                );
            }
        }
    }

    logging::log_batch_summary(
        Component::Ingest,
        summary.total,
        summary.successful,
        summary.failed,
    );
    summary
}

/// Ingests every payload in the file at `path`.
pub fn import_file<C: Connector>(service: &TrafficService<C>, path: &str) -> Result<ImportSummary> {
    let text = fs::read_to_string(path)
        .map_err(|e| TrafficError::Validation(format!("cannot read {}: {}", path, e)))?;
    Ok(import_lines(service, &text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_bad_lines_are_counted_not_fatal() {
        let service = TrafficService::new(MemoryStore::new());
        let text = r#"
{"traffic_cam_id": 1, "start_datetime": "2024-05-01T08:00:00", "end_datetime": "2024-05-01T08:15:00", "vehicle_count": 10, "average_speed": 50}
{"traffic_cam_id": 1, "start_datetime": "2024-05-01T08:15:00"}

not json at all
{"traffic_cam_id": 1, "start_datetime": "2024-05-01T08:15:00", "end_datetime": "2024-05-01T08:30:00", "vehicle_count": 12, "average_speed": 48}
"#;
        let summary = import_lines(&service, text);
        assert_eq!(
            summary,
            ImportSummary {
                total: 4,
                successful: 2,
                failed: 2,
                alerts_raised: 0,
            }
        );
        assert_eq!(service.history(Some(1), None).unwrap().len(), 2);
    }

    #[test]
    fn test_jam_lines_count_alerts() {
        let service = TrafficService::new(MemoryStore::new());
        let text = concat!(
            r#"{"traffic_cam_id": 2, "start_datetime": "2024-05-01T08:00:00", "end_datetime": "2024-05-01T08:15:00", "vehicle_count": 10, "average_speed": 80}"#,
            "\n",
            r#"{"traffic_cam_id": 2, "start_datetime": "2024-05-01T08:15:00", "end_datetime": "2024-05-01T08:30:00", "vehicle_count": 60, "average_speed": 4}"#,
            "\n",
        );
        let summary = import_lines(&service, text);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.alerts_raised, 1);
    }

    #[test]
    fn test_missing_file_is_validation_error() {
        let service = TrafficService::new(MemoryStore::new());
        let result = import_file(&service, "/nonexistent/trafmon/import.jsonl");
        assert!(matches!(result, Err(TrafficError::Validation(_))));
    }
}

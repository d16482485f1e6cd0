//! Postgres connection helpers.
//!
//! Connections are opened per operation by `store::postgres::PgConnector`;
//! this module owns the pieces shared by the connector, the binary and the
//! integration tests: connecting, applying the schema, and checking that the
//! schema is in place.

use postgres::{Client, NoTls};

use crate::error::{Result, TrafficError};
use crate::logging::{self, Component};

/// Tables the service reads and writes.
pub const REQUIRED_TABLES: &[&str] = &["traffic_cams", "traffic_records", "traffic_jam_alerts"];

/// Base schema, applied by `apply_schema`.
pub const SCHEMA_SQL: &str = include_str!("../sql/001_traffic_schema.sql");

/// Opens a new connection.
pub fn connect(database_url: &str) -> Result<Client> {
    Client::connect(database_url, NoTls).map_err(|e| {
        let err = TrafficError::from(e);
        logging::log_failure(Component::Database, None, "connect", &err);
        err
    })
}

/// Creates any missing tables and indexes. Safe to run repeatedly.
pub fn apply_schema(client: &mut Client) -> Result<()> {
    client.batch_execute(SCHEMA_SQL)?;
    logging::info(Component::Database, None, "Schema applied");
    Ok(())
}

/// Fails with a `Storage` error naming every required table that is absent
/// from the current schema.
pub fn verify_tables(client: &mut Client) -> Result<()> {
    let expected: Vec<String> = REQUIRED_TABLES.iter().map(|t| t.to_string()).collect();
    let rows = client.query(
        "SELECT table_name::text
         FROM information_schema.tables
         WHERE table_schema = current_schema()
           AND table_name = ANY($1)",
        &[&expected],
    )?;
    let present: Vec<String> = rows.iter().map(|row| row.get(0)).collect();
    let missing = missing_tables(&present);

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TrafficError::Storage(format!(
            "missing tables: {} (apply sql/001_traffic_schema.sql)",
            missing.join(", ")
        )))
    }
}

/// Connects and verifies the schema in one step.
pub fn connect_and_verify(database_url: &str) -> Result<Client> {
    let mut client = connect(database_url)?;
    verify_tables(&mut client)?;
    Ok(client)
}

fn missing_tables(present: &[String]) -> Vec<&'static str> {
    REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|t| !present.iter().any(|p| p == t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tables_lists_absent_ones() {
        let present = vec!["traffic_records".to_string()];
        assert_eq!(
            missing_tables(&present),
            vec!["traffic_cams", "traffic_jam_alerts"]
        );
        let all: Vec<String> = REQUIRED_TABLES.iter().map(|t| t.to_string()).collect();
        assert!(missing_tables(&all).is_empty());
    }

    #[test]
    fn test_schema_defines_every_required_table() {
        for table in REQUIRED_TABLES {
            assert!(
                SCHEMA_SQL.contains(&format!("CREATE TABLE IF NOT EXISTS {}", table)),
                "schema should create '{}'",
                table
            );
        }
    }
}

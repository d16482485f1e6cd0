//! Request-layer input handling.
//!
//! Submodules:
//! - `register`: parses and validates a new-measurement payload.
//! - `import`:   feeds a JSON-lines file of payloads through ingestion.

pub mod import;
pub mod register;

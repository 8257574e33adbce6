//! hushlog-core
//!
//! Pure domain types for the query-log anonymizer: records, projects,
//! the model selector, and token accounting.
//! No database or HTTP dependency — this is the shared vocabulary of the system.

pub mod error;
pub mod models;

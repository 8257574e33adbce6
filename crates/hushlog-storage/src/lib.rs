//! hushlog-storage
//!
//! Access to the query-log store and the usage ledger. The traits in
//! [`store`] are what the anonymizer depends on; [`postgres`] is the
//! production implementation and [`memory`] backs tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use store::{QueryLogStore, UsageRecorder};

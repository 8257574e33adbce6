//! hushlog-anonymizer
//!
//! The anonymization job: pick a token-bounded batch of unprocessed records
//! for a project, send it through the model, and write the scrubbed text back.
//!
//! Everything runs sequentially. Failures never escape [`run::run`]; they
//! resolve to a zero contribution and a log line, and the records stay
//! unprocessed for the next scheduled invocation.

pub mod context;
pub mod driver;
pub mod error;
pub mod run;
pub mod select;

pub use context::JobContext;

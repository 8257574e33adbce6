//! hushlog-openai
//!
//! OpenAI-compatible chat completions: wire types, the HTTP client, and the
//! anonymization prompt round trip.

pub mod anonymize;
pub mod chat;
pub mod client;
pub mod error;
pub mod tokens;

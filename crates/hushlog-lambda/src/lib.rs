//! hushlog-lambda
//!
//! HTTP trigger for the anonymization job, hosted on AWS Lambda or a local
//! listener.

use axum::middleware as axum_mw;
use axum::routing::{any, get};
use axum::Router;

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health (no job work)
        .route("/health", get(routes::health::health_check))
        // Trigger: method is checked in the handler so other methods get a
        // JSON 405 with an Allow header.
        .route("/", any(routes::anonymize::trigger))
        .route("/anonymize", any(routes::anonymize::trigger))
        .layer(axum_mw::from_fn(middleware::request_log::log_request))
        .with_state(state)
}

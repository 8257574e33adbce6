use hushlog_anonymizer::JobContext;

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub job: JobContext,
}

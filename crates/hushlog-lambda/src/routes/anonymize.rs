use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::Method;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use hushlog_anonymizer::run;
use hushlog_core::models::project::ProjectId;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TriggerParams {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub processed: usize,
}

/// Run one anonymization pass.
///
/// With `projectId`, only that project is processed; without it, the
/// projects with the stalest backlog are. Processing failures are logged and
/// count as zero: the endpoint itself only fails for a bad method. A query
/// string that cannot be read is logged and treated as naming no project.
pub async fn trigger(
    State(state): State<AppState>,
    method: Method,
    params: Result<Query<TriggerParams>, QueryRejection>,
) -> Result<Json<TriggerResponse>, ApiError> {
    if method != Method::GET {
        return Err(ApiError::MethodNotAllowed { allow: "GET" });
    }

    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            warn!(error = %e.body_text(), "unreadable query string, running backlog");
            TriggerParams::default()
        }
    };

    // An empty projectId means "no target", same as leaving it out.
    let project_id = params
        .project_id
        .and_then(|id| ProjectId::new(id).ok());

    let processed = run::run(&state.job, project_id.as_ref()).await;

    Ok(Json(TriggerResponse {
        status: "ok",
        processed,
    }))
}

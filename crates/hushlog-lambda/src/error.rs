use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors the trigger can report. Processing failures are never among them.
#[derive(Debug)]
pub enum ApiError {
    MethodNotAllowed { allow: &'static str },
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::MethodNotAllowed { allow } => (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, allow)],
                Json(ErrorBody {
                    error: "method not allowed".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

use crate::errors::Error;
use crate::metrics::INVALID_CATEGORY_TOTAL;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with `{"error": ...}`
    BadRequest(String),
    /// 404 with `{"message": ...}`
    NotFound(String),
    /// 500 with `{"error": "<context>: <cause>"}`
    Internal(anyhow::Error),
}

impl ApiError {
    /// Wraps a failure with the message shown to the client.
    pub fn internal(context: &'static str) -> impl FnOnce(Error) -> ApiError {
        move |err| ApiError::Internal(anyhow::anyhow!("{}: {}", context, err))
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidCategory(_) => {
                INVALID_CATEGORY_TOTAL.inc();
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                error!("Rejected request: {}", message);
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                error!("Not found: {}", message);
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Internal(err) => {
                let message = err.to_string();
                error!("API error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

//! JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::images::PipelineError;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Image generation unavailable")]
    Unavailable,

    #[error("Image generation failed")]
    GenerationFailed(String),

    #[error("Internal error")]
    Internal(String),
}

/// Error body: `{ok: false, error, detail?, hasAI?}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(rename = "hasAI", skip_serializing_if = "Option::is_none")]
    pub has_ai: Option<bool>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unavailable | ApiError::GenerationFailed(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorResponse {
        let (detail, has_ai) = match self {
            ApiError::Unavailable => (
                Some(PipelineError::Unavailable.to_string()),
                Some(false),
            ),
            ApiError::GenerationFailed(detail) => (Some(detail.clone()), Some(true)),
            ApiError::Internal(detail) => (Some(detail.clone()), None),
            ApiError::BadRequest(_) | ApiError::NotFound => (None, None),
        };

        ErrorResponse {
            ok: false,
            error: self.to_string(),
            detail,
            has_ai,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Unavailable => ApiError::Unavailable,
            PipelineError::Generation(e) => ApiError::GenerationFailed(e.to_string()),
            PipelineError::Aborted => ApiError::GenerationFailed(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

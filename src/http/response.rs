//! Error responses.
//!
//! # Design Decisions
//! - Validation failures are client errors (400)
//! - Training failures are server errors (500); there is no fallback model
//! - Predictor and breaker failures never reach this type; the pipeline degrades them

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::ValidationError;
use crate::predictor::TrainingError;

/// JSON body for every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Errors a handler can return to the transport layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Training(#[from] TrainingError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::model::{InferenceError, LoadError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Model load error: {0}")]
    ModelLoad(#[from] LoadError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Prediction failed: {0}")]
    Inference(#[from] InferenceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => {
                tracing::debug!("Rejected request: {}", self);
                metrics::counter!("validation_failures_total").increment(1);
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Inference(_) => {
                tracing::error!("Prediction error: {}", self);
                metrics::counter!("prediction_failures_total").increment(1);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => {
                tracing::error!("Internal server error: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "detail": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

//! Error kinds surfaced by the HTTP layer and their status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use formation_recommender::{BundleError, PredictionError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller sent something the model cannot score.
    #[error("{0}")]
    Validation(String),
    /// The model bundle is missing or unusable.
    #[error("model artifact unavailable: {0}")]
    Artifact(#[from] BundleError),
    #[error("prediction failed: {0}")]
    Model(String),
    #[error("prediction exceeded {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Artifact(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Value of the `type` field in the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::Artifact(_) => "artifact_error",
            ServiceError::Model(_) => "model_error",
            ServiceError::Timeout(_) => "timeout",
        }
    }
}

impl From<PredictionError> for ServiceError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::Validation(v) => ServiceError::Validation(v.to_string()),
            PredictionError::Model(message) => ServiceError::Model(message),
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize)]
struct ApiError {
    error: ApiErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: &'static str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "request failed");
        }
        let body = ApiError {
            error: ApiErrorDetail {
                message: self.to_string(),
                error_type: self.kind(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed request bodies are reported with status 400.
pub fn malformed_json(err: serde_json::Error) -> Response {
    let mut response = ServiceError::Validation(format!("malformed JSON: {}", err)).into_response();
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use formation_recommender::predict::ValidationError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::Validation("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::Artifact(BundleError::BadMagic).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ServiceError::Model("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ServiceError::Timeout(Duration::from_millis(5)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_prediction_errors_keep_their_kind() {
        let validation: ServiceError =
            PredictionError::from(ValidationError::MissingField("Age".into())).into();
        assert_eq!(validation.kind(), "validation_error");
        assert!(validation.to_string().contains("Age"));

        let model: ServiceError = PredictionError::Model("boom".into()).into();
        assert_eq!(model.kind(), "model_error");
    }

    #[test]
    fn test_timeout_message() {
        let err = ServiceError::Timeout(Duration::from_millis(2000));
        assert_eq!(err.to_string(), "prediction exceeded 2000ms");
        assert_eq!(err.kind(), "timeout");
    }
}

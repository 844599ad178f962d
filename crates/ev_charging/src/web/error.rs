use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use station_structs::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Model not available: {0}")]
    ModelUnavailable(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::ArtifactMissing { .. } => Self::ModelUnavailable(err.to_string()),
            PipelineError::Schema(msg) => Self::InvalidInput(msg),
            other => Self::InternalServerError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_status() {
        let missing = AppError::from(PipelineError::ArtifactMissing {
            path: String::from("models/model.bin"),
        });
        assert_eq!(missing.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let schema = AppError::from(PipelineError::Schema(String::from("bad")));
        assert_eq!(schema.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);

        let model = AppError::from(PipelineError::Model(String::from("boom")));
        assert_eq!(model.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

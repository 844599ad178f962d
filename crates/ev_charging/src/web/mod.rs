//! HTTP surface of the prediction service.

mod error;
mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::app_context::AppContext;

pub use error::AppError;
pub use routes::HealthResponse;

/// Builds the API router over the shared context.
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/predict", post(routes::predict))
        .route("/metadata", get(routes::metadata))
        .with_state(context)
}

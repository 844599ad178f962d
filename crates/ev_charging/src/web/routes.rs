use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use station_structs::{MetadataSummary, PredictionResponse, StationFeatures};
use tracing::debug;

use super::error::AppError;
use crate::app_context::{AppContext, ModelReadiness};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_ready: bool,
    pub unseen_category_requests: u64,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "EV Charging MLOps API", "docs": "/docs" }))
}

pub async fn health(State(context): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
        model_ready: context.is_ready(),
        unseen_category_requests: context
            .model_service()
            .map_or(0, |service| service.unseen_category_requests()),
    })
}

pub async fn predict(
    State(context): State<Arc<AppContext>>,
    payload: Result<Json<StationFeatures>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let service = match &context.model {
        ModelReadiness::Ready(service) => Arc::clone(service),
        ModelReadiness::Unavailable(reason) => {
            return Err(AppError::ModelUnavailable(reason.clone()));
        }
    };
    let Json(features) = payload?;

    let request = features.clone();
    let prediction = tokio::task::spawn_blocking(move || service.predict(&request))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Prediction task failed: {e}")))??;

    debug!(region = %features.region, prediction, "Served prediction");
    context.log_writer.record(features, prediction);

    Ok(Json(PredictionResponse {
        predicted_sessions_per_day: prediction,
    }))
}

pub async fn metadata(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<MetadataSummary>, AppError> {
    match &context.model {
        ModelReadiness::Ready(service) => Ok(Json(service.metadata().summary())),
        ModelReadiness::Unavailable(reason) => Err(AppError::ModelUnavailable(reason.clone())),
    }
}

//! Route handlers.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::pipeline::{
    BatchPredictionRequest, BatchPredictionResponse, PredictionRequest, PredictionResult,
    TrainRequest,
};
use crate::predictor::TrainingSummary;
use crate::resilience::BreakerSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.pipeline.model_version(),
    })
}

pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResult>, ApiError> {
    let result = state.pipeline.predict_one(&request).await?;
    Ok(Json(result))
}

pub async fn predict_batch(
    State(state): State<AppState>,
    Json(batch): Json<BatchPredictionRequest>,
) -> Json<BatchPredictionResponse> {
    let requests = batch.into_requests();
    let results = state.pipeline.predict_batch(&requests).await;
    Json(BatchPredictionResponse {
        success: true,
        results,
    })
}

pub async fn train(
    State(state): State<AppState>,
    Json(request): Json<TrainRequest>,
) -> Result<Json<TrainingSummary>, ApiError> {
    let summary = state.pipeline.train(request).await?;
    Ok(Json(summary))
}

pub async fn circuit_status(State(state): State<AppState>) -> Json<BreakerSnapshot> {
    Json(state.pipeline.breaker().snapshot())
}

pub async fn circuit_reset(State(state): State<AppState>) -> Json<BreakerSnapshot> {
    state.pipeline.breaker().reset();
    Json(state.pipeline.breaker().snapshot())
}

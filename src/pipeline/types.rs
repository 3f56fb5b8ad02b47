//! Request and response payloads for the inference pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enhancer::EnhancedPrediction;
use crate::predictor::Prediction;

/// Marker returned with every degraded response.
pub const FALLBACK_NOTICE: &str = "rule-based used";

/// A single match to predict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(alias = "homeTeam")]
    pub home_team: String,
    #[serde(alias = "awayTeam")]
    pub away_team: String,
    pub features: Vec<f64>,
    #[serde(default, alias = "enableAI")]
    pub enable_ai: bool,
}

/// Batch input: `{"predictions": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchPredictionRequest {
    Wrapped { predictions: Vec<PredictionRequest> },
    Bare(Vec<PredictionRequest>),
}

impl BatchPredictionRequest {
    pub fn into_requests(self) -> Vec<PredictionRequest> {
        match self {
            BatchPredictionRequest::Wrapped { predictions } => predictions,
            BatchPredictionRequest::Bare(predictions) => predictions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessPayload {
    pub success: bool,
    pub data: EnhancedPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedPayload {
    pub success: bool,
    pub error: String,
    pub fallback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_based: Option<Prediction>,
}

/// Outcome of one prediction: model output or a degraded fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResult {
    Success(SuccessPayload),
    Degraded(DegradedPayload),
}

impl PredictionResult {
    pub fn success(data: EnhancedPrediction) -> Self {
        PredictionResult::Success(SuccessPayload {
            success: true,
            data,
        })
    }

    pub fn degraded(error: impl Into<String>, rule_based: Option<Prediction>) -> Self {
        PredictionResult::Degraded(DegradedPayload {
            success: false,
            error: error.into(),
            fallback: FALLBACK_NOTICE.to_string(),
            rule_based,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResult::Success(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub success: bool,
    pub results: Vec<PredictionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRequest {
    pub data: Vec<Vec<f64>>,
    pub labels: Vec<u32>,
}

/// Malformed inference input, reported to the client before the breaker is consulted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("expected {expected} features, got {actual}")]
    FeatureLength { expected: usize, actual: usize },

    #[error("feature {index} is not a finite number")]
    NonFiniteFeature { index: usize },
}

//! Predictor contract, outcome types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::Elapsed;

/// Match outcome predicted by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::HomeWin, Outcome::Draw, Outcome::AwayWin];

    /// Training label encoding: 0 = home win, 1 = draw, 2 = away win.
    pub fn from_label(label: u32) -> Option<Self> {
        match label {
            0 => Some(Outcome::HomeWin),
            1 => Some(Outcome::Draw),
            2 => Some(Outcome::AwayWin),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Outcome::HomeWin => 0,
            Outcome::Draw => 1,
            Outcome::AwayWin => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::HomeWin => "home_win",
            Outcome::Draw => "draw",
            Outcome::AwayWin => "away_win",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-outcome probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl Probabilities {
    pub fn from_array(p: [f64; 3]) -> Self {
        Self {
            home: p[0],
            draw: p[1],
            away: p[2],
        }
    }
}

/// A single model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: Outcome,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Probabilities>,
    pub model_version: String,
}

/// Quality figures for a finished training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub samples: usize,
    pub epochs: u32,
    pub accuracy: f64,
    pub loss: f64,
}

/// Result of `Predictor::train`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub status: String,
    pub model_version: String,
    pub metrics: TrainingMetrics,
}

/// Errors raised by a prediction call.
#[derive(Debug, Error)]
pub enum PredictorError {
    /// Input rejected by the model.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal model failure.
    #[error("model error: {0}")]
    Model(String),

    /// Prediction did not finish within its deadline.
    #[error("prediction timed out: {0}")]
    Timeout(#[from] Elapsed),

    /// The worker running the prediction panicked or was cancelled.
    #[error("prediction worker failed: {0}")]
    Worker(String),
}

/// Errors raised by the administrative training path.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training data is empty")]
    EmptyDataset,

    #[error("got {data} samples but {labels} labels")]
    LengthMismatch { data: usize, labels: usize },

    #[error("sample {row} has {actual} features, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("sample {row} has label {label}, expected 0 (home), 1 (draw) or 2 (away)")]
    InvalidLabel { row: usize, label: u32 },

    #[error("sample {row} contains a non-finite feature")]
    NonFinite { row: usize },

    #[error("training worker failed: {0}")]
    Worker(String),
}

/// Result type for training operations.
pub type TrainingResult<T> = Result<T, TrainingError>;

/// Opaque model capability sitting behind the circuit breaker.
///
/// Implementations are called from blocking worker threads and may be
/// invoked concurrently.
pub trait Predictor: Send + Sync {
    /// Number of features every input vector must have.
    fn input_dim(&self) -> usize;

    /// Identifier of the model currently serving predictions.
    fn model_version(&self) -> String;

    fn predict(&self, features: &[f64]) -> Result<Prediction, PredictorError>;

    fn train(&self, data: &[Vec<f64>], labels: &[u32]) -> TrainingResult<TrainingSummary>;
}

//! Inference orchestration: breaker-guarded predictions and unguarded training.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use crate::enhancer::{enhance, EnhancedPrediction, MatchContext};
use crate::observability::metrics::{self, PredictionOutcome};
use crate::pipeline::types::{PredictionRequest, PredictionResult, TrainRequest, ValidationError};
use crate::predictor::fallback::rule_based;
use crate::predictor::{Prediction, Predictor, PredictorError, TrainingError, TrainingResult, TrainingSummary};
use crate::resilience::{with_timeout, BreakerError, CircuitBreaker};

/// Message used in degraded responses when error details are hidden.
pub const GENERIC_FAILURE: &str = "prediction service unavailable";

/// Wraps a predictor with the circuit breaker and the fallback contract.
pub struct InferencePipeline {
    predictor: Arc<dyn Predictor>,
    breaker: Arc<CircuitBreaker>,
    predict_timeout: Duration,
    expose_error_details: bool,
}

impl InferencePipeline {
    pub fn new(
        predictor: Arc<dyn Predictor>,
        breaker: Arc<CircuitBreaker>,
        predict_timeout: Duration,
    ) -> Self {
        Self {
            predictor,
            breaker,
            predict_timeout,
            expose_error_details: true,
        }
    }

    /// Whether degraded responses carry the underlying error message.
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.expose_error_details = expose;
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn model_version(&self) -> String {
        self.predictor.model_version()
    }

    pub fn validate(&self, request: &PredictionRequest) -> Result<(), ValidationError> {
        let expected = self.predictor.input_dim();
        if request.features.len() != expected {
            return Err(ValidationError::FeatureLength {
                expected,
                actual: request.features.len(),
            });
        }
        if let Some(index) = request.features.iter().position(|x| !x.is_finite()) {
            return Err(ValidationError::NonFiniteFeature { index });
        }
        Ok(())
    }

    /// Predict one match.
    ///
    /// Only validation errors are returned as `Err`; every predictor or
    /// breaker failure becomes a degraded result.
    pub async fn predict_one(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResult, ValidationError> {
        let start = Instant::now();

        if let Err(e) = self.validate(request) {
            tracing::warn!(
                operation = "predict",
                home_team = %request.home_team,
                away_team = %request.away_team,
                error = %e,
                "Rejected prediction request"
            );
            metrics::record_prediction(PredictionOutcome::Invalid, start);
            return Err(e);
        }

        let outcome = self
            .breaker
            .call(|| self.run_predictor(request.features.clone()))
            .await;

        match outcome {
            Ok(prediction) => {
                metrics::record_prediction(PredictionOutcome::Success, start);
                let data = if request.enable_ai {
                    let ctx = MatchContext {
                        home_team: &request.home_team,
                        away_team: &request.away_team,
                    };
                    enhance(prediction, &ctx)
                } else {
                    EnhancedPrediction::plain(prediction)
                };
                Ok(PredictionResult::success(data))
            }
            Err(err) => Ok(self.degrade(request, err, start)),
        }
    }

    /// Predict every request independently; output order matches input order.
    pub async fn predict_batch(&self, requests: &[PredictionRequest]) -> Vec<PredictionResult> {
        tracing::debug!(operation = "predict_batch", size = requests.len(), "Running batch");

        join_all(requests.iter().map(|request| async move {
            match self.predict_one(request).await {
                Ok(result) => result,
                Err(e) => PredictionResult::degraded(e.to_string(), rule_based(&request.features)),
            }
        }))
        .await
    }

    /// Train the predictor. Not guarded by the breaker and never retried.
    pub async fn train(&self, request: TrainRequest) -> TrainingResult<TrainingSummary> {
        let samples = request.data.len();
        tracing::info!(operation = "train", samples, "Training started");

        let predictor = Arc::clone(&self.predictor);
        let result = tokio::task::spawn_blocking(move || predictor.train(&request.data, &request.labels))
            .await
            .unwrap_or_else(|e| Err(TrainingError::Worker(e.to_string())));

        match &result {
            Ok(summary) => {
                metrics::record_training(true);
                tracing::info!(
                    operation = "train",
                    model_version = %summary.model_version,
                    accuracy = summary.metrics.accuracy,
                    loss = summary.metrics.loss,
                    "Training finished"
                );
            }
            Err(e) => {
                metrics::record_training(false);
                tracing::error!(operation = "train", samples, error = %e, "Training failed");
            }
        }
        result
    }

    async fn run_predictor(&self, features: Vec<f64>) -> Result<Prediction, PredictorError> {
        let predictor = Arc::clone(&self.predictor);
        let task = tokio::task::spawn_blocking(move || predictor.predict(&features));

        match with_timeout(self.predict_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(PredictorError::Worker(join.to_string())),
            Err(elapsed) => Err(elapsed.into()),
        }
    }

    fn degrade(
        &self,
        request: &PredictionRequest,
        err: BreakerError<PredictorError>,
        start: Instant,
    ) -> PredictionResult {
        let outcome = if err.is_open() {
            PredictionOutcome::ShortCircuited
        } else {
            PredictionOutcome::Degraded
        };
        metrics::record_prediction(outcome, start);

        tracing::warn!(
            operation = "predict",
            breaker = %self.breaker.name(),
            breaker_state = %self.breaker.state(),
            home_team = %request.home_team,
            away_team = %request.away_team,
            error = %err,
            "Prediction degraded to rule-based fallback"
        );

        let message = if self.expose_error_details {
            err.to_string()
        } else {
            GENERIC_FAILURE.to_string()
        };
        PredictionResult::degraded(message, rule_based(&request.features))
    }
}

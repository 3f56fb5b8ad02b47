//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_predictions_total` (counter): predictions by outcome
//! - `gateway_prediction_duration_seconds` (histogram): predictor latency
//! - `gateway_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_circuit_transitions_total` (counter): transitions by target state
//! - `gateway_training_runs_total` (counter): training runs by status
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Outcome label for a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOutcome {
    Success,
    Degraded,
    ShortCircuited,
    Invalid,
}

impl PredictionOutcome {
    fn as_str(self) -> &'static str {
        match self {
            PredictionOutcome::Success => "success",
            PredictionOutcome::Degraded => "degraded",
            PredictionOutcome::ShortCircuited => "short_circuited",
            PredictionOutcome::Invalid => "invalid",
        }
    }
}

pub fn record_prediction(outcome: PredictionOutcome, start: Instant) {
    metrics::counter!("gateway_predictions_total", "outcome" => outcome.as_str()).increment(1);
    metrics::histogram!("gateway_prediction_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_state(breaker: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!("gateway_circuit_state", "breaker" => breaker.to_string()).set(value);
}

pub fn record_circuit_transition(breaker: &str, to: CircuitState) {
    metrics::counter!(
        "gateway_circuit_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}

pub fn record_training(success: bool) {
    let status = if success { "ok" } else { "error" };
    metrics::counter!("gateway_training_runs_total", "status" => status).increment(1);
}

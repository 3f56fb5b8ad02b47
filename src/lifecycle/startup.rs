//! Startup orchestration.
//!
//! # Responsibilities
//! - Wire predictor, circuit breaker and pipeline from configuration
//! - Start background tasks (metrics exporter)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::pipeline::InferencePipeline;
use crate::predictor::{Predictor, SoftmaxPredictor};
use crate::resilience::CircuitBreaker;

/// Build the pipeline around the built-in predictor.
pub fn build_pipeline(config: &GatewayConfig) -> Arc<InferencePipeline> {
    let predictor: Arc<dyn Predictor> = Arc::new(SoftmaxPredictor::new(&config.predictor));
    build_pipeline_with(config, predictor)
}

/// Build the pipeline around any predictor implementation.
pub fn build_pipeline_with(
    config: &GatewayConfig,
    predictor: Arc<dyn Predictor>,
) -> Arc<InferencePipeline> {
    let breaker = Arc::new(CircuitBreaker::new(&config.breaker));

    tracing::info!(
        breaker = %config.breaker.name,
        failure_threshold = config.breaker.failure_threshold,
        success_threshold = config.breaker.success_threshold,
        recovery_timeout_ms = config.breaker.recovery_timeout_ms,
        model_version = %predictor.model_version(),
        input_dim = predictor.input_dim(),
        "Inference pipeline initialized"
    );

    Arc::new(
        InferencePipeline::new(predictor, breaker, config.predictor.timeout())
            .with_error_details(config.security.expose_error_details),
    )
}

/// Start the Prometheus exporter if enabled.
pub fn start_metrics(config: &GatewayConfig) {
    if !config.observability.metrics_enabled {
        return;
    }
    match config.observability.metrics_address.parse::<SocketAddr>() {
        Ok(addr) => metrics::init_metrics(addr),
        Err(e) => tracing::error!(
            metrics_address = %config.observability.metrics_address,
            error = %e,
            "Failed to parse metrics address"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;

    #[test]
    fn test_pipeline_reflects_config() {
        let mut config = GatewayConfig::default();
        config.breaker.name = "primary".into();
        config.predictor.model_version = "2.3.0".into();

        let pipeline = build_pipeline(&config);
        assert_eq!(pipeline.breaker().name(), "primary");
        assert_eq!(pipeline.breaker().state(), CircuitState::Closed);
        assert_eq!(pipeline.model_version(), "2.3.0");
    }
}

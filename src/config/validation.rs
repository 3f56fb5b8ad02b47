//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check every semantic constraint and collect all violations.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.breaker.name.trim().is_empty() {
        errors.push(ValidationError::new("breaker.name", "must not be empty"));
    }
    if config.breaker.failure_threshold == 0 {
        errors.push(ValidationError::new("breaker.failure_threshold", "must be at least 1"));
    }
    if config.breaker.success_threshold == 0 {
        errors.push(ValidationError::new("breaker.success_threshold", "must be at least 1"));
    }
    if config.breaker.recovery_timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.recovery_timeout_ms", "must be greater than 0"));
    }

    if config.predictor.input_dim == 0 {
        errors.push(ValidationError::new("predictor.input_dim", "must be at least 1"));
    }
    if config.predictor.timeout_ms == 0 {
        errors.push(ValidationError::new("predictor.timeout_ms", "must be greater than 0"));
    }
    if !(config.predictor.learning_rate.is_finite() && config.predictor.learning_rate > 0.0) {
        errors.push(ValidationError::new(
            "predictor.learning_rate",
            "must be a positive finite number",
        ));
    }
    if config.predictor.epochs == 0 {
        errors.push(ValidationError::new("predictor.epochs", "must be at least 1"));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

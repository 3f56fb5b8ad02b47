//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Prediction request:
//!     → circuit_breaker.rs (admit, short-circuit while open)
//!     → timeouts.rs (enforce predictor deadline)
//!     → circuit_breaker.rs (record outcome, trip or close)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every predictor call has a deadline
//! - A timeout counts as a failure, same as a predictor error
//! - Training is not routed through the breaker and is never retried

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{BreakerError, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use timeouts::{with_timeout, Elapsed};

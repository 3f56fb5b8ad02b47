//! Request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! PredictionRequest
//!     → validate (feature count, finite values) → 400 on failure
//!     → CircuitBreaker::call(deadline(Predictor::predict))
//!     → success: enhancer (if enable_ai) → {success: true, data}
//!     → failure: {success: false, error, fallback: "rule-based used"}
//!
//! TrainRequest
//!     → Predictor::train (no breaker, no retry) → 500 on failure
//! ```

pub mod service;
pub mod types;

pub use service::InferencePipeline;
pub use types::{
    BatchPredictionRequest, BatchPredictionResponse, PredictionRequest, PredictionResult,
    TrainRequest, ValidationError, FALLBACK_NOTICE,
};

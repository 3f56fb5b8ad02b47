//! Predictor subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline (inside breaker + deadline)
//!     → Predictor::predict (types.rs contract)
//!     → softmax.rs (built-in model)
//!
//! Degraded path:
//!     → fallback.rs (home vs away strength heuristic)
//! ```
//!
//! # Design Decisions
//! - The rest of the gateway only sees the `Predictor` trait
//! - Calls are synchronous; the pipeline runs them on blocking threads

pub mod fallback;
pub mod softmax;
pub mod types;

pub use softmax::SoftmaxPredictor;
pub use types::{
    Outcome, Prediction, Predictor, PredictorError, Probabilities, TrainingError,
    TrainingMetrics, TrainingResult, TrainingSummary,
};

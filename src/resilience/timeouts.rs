//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap predictor calls with a deadline
//! - Surface an elapsed deadline as an ordinary error so the breaker counts it
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The deadline elapsed before the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {}ms", .0.as_millis())]
pub struct Elapsed(pub Duration);

/// Await `fut`, giving up after `limit`.
pub async fn with_timeout<F, T>(limit: Duration, fut: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Elapsed(limit))
}

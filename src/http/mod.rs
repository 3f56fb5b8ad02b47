//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout, body limit)
//!     → handlers.rs (decode JSON, call pipeline)
//!     → response.rs (map validation/training errors to status codes)
//!     → Send to client
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use response::{ApiError, ErrorBody};
pub use server::{AppState, HttpServer};

//! Match outcome inference gateway library.

pub mod config;
pub mod enhancer;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod predictor;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::InferencePipeline;
pub use resilience::CircuitBreaker;

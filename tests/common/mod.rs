//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use inference_gateway::config::GatewayConfig;
use inference_gateway::lifecycle::startup;
use inference_gateway::predictor::{
    Outcome, Prediction, Predictor, PredictorError, Probabilities, TrainingError,
    TrainingMetrics, TrainingResult, TrainingSummary,
};
use inference_gateway::{HttpServer, Shutdown};

pub const INPUT_DIM: usize = 3;

/// Predictor whose failures are switched on and off by the test.
///
/// A negative third feature always fails, so individual batch items can be targeted.
#[derive(Default)]
pub struct ScriptedPredictor {
    pub calls: AtomicU32,
    pub failing: AtomicBool,
    pub delay: Option<Duration>,
}

#[allow(dead_code)]
impl ScriptedPredictor {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Predictor for ScriptedPredictor {
    fn input_dim(&self) -> usize {
        INPUT_DIM
    }

    fn model_version(&self) -> String {
        "scripted-1".to_string()
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.failing.load(Ordering::SeqCst) || features[2] < 0.0 {
            return Err(PredictorError::Model("inference backend crashed".into()));
        }
        let prediction = if features[0] >= features[1] {
            Outcome::HomeWin
        } else {
            Outcome::AwayWin
        };
        Ok(Prediction {
            prediction,
            confidence: 0.7,
            probabilities: Some(Probabilities {
                home: 0.7,
                draw: 0.2,
                away: 0.1,
            }),
            model_version: self.model_version(),
        })
    }

    fn train(&self, data: &[Vec<f64>], labels: &[u32]) -> TrainingResult<TrainingSummary> {
        if data.len() != labels.len() {
            return Err(TrainingError::LengthMismatch {
                data: data.len(),
                labels: labels.len(),
            });
        }
        Ok(TrainingSummary {
            status: "trained".to_string(),
            model_version: "scripted-2".to_string(),
            metrics: TrainingMetrics {
                samples: data.len(),
                epochs: 1,
                accuracy: 1.0,
                loss: 0.0,
            },
        })
    }
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway around `predictor`. `None` uses the built-in model.
pub async fn start_gateway(
    mut config: GatewayConfig,
    predictor: Option<Arc<dyn Predictor>>,
) -> TestGateway {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let listener = tokio::net::TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let server = match predictor {
        Some(predictor) => {
            let pipeline = startup::build_pipeline_with(&config, predictor);
            HttpServer::with_pipeline(config, pipeline)
        }
        None => HttpServer::new(config),
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

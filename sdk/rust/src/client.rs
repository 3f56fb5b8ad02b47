use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
    pub features: Vec<f64>,
    #[serde(default)]
    pub enable_ai: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub results: Vec<Value>, // Each entry is either {success: true, data} or a degraded payload
}

/// Non-success reply from the gateway.
#[derive(Debug)]
pub struct GatewayError {
    pub status: StatusCode,
    pub body: String,
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Gateway returned error status {}: {}", self.status, self.body)
    }
}

impl std::error::Error for GatewayError {}

pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, Box<dyn std::error::Error>> {
        let resp = self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Predict a single match. Degraded results still come back as `Ok`.
    pub async fn predict(&self, req: &PredictionRequest) -> Result<Value, Box<dyn std::error::Error>> {
        let resp = self.client
            .post(format!("{}/predict", self.base_url))
            .json(req)
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn predict_batch(&self, reqs: &[PredictionRequest]) -> Result<BatchResponse, Box<dyn std::error::Error>> {
        let resp = self.client
            .post(format!("{}/predict/batch", self.base_url))
            .json(&serde_json::json!({ "predictions": reqs }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    pub async fn train(&self, data: Vec<Vec<f64>>, labels: Vec<u32>) -> Result<Value, Box<dyn std::error::Error>> {
        let resp = self.client
            .post(format!("{}/train", self.base_url))
            .json(&serde_json::json!({ "data": data, "labels": labels }))
            .send()
            .await?;
        Self::decode(resp).await
    }

    /// Current circuit breaker snapshot.
    pub async fn circuit(&self) -> Result<Value, Box<dyn std::error::Error>> {
        let resp = self.client
            .get(format!("{}/circuit", self.base_url))
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, Box<dyn std::error::Error>> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Box::new(GatewayError { status, body: text }));
        }

        Ok(serde_json::from_str::<T>(&text)?)
    }
}

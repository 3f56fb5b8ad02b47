//! Built-in match outcome model.
//!
//! Multinomial logistic regression over three outcomes. Parameters live behind
//! a read-write lock; training works on a copy and swaps the result in, so
//! predictions keep flowing while a training run is in progress. Training runs
//! are serialized so each one starts from the previous run's result.

use std::sync::{Mutex, RwLock};

use crate::config::PredictorConfig;
use crate::predictor::types::{
    Outcome, Prediction, PredictorError, Predictor, Probabilities, TrainingError,
    TrainingMetrics, TrainingResult, TrainingSummary,
};

const CLASSES: usize = 3;

#[derive(Debug, Clone)]
struct Parameters {
    /// One weight row per outcome.
    weights: [Vec<f64>; CLASSES],
    bias: [f64; CLASSES],
}

impl Parameters {
    /// Untrained prior: feature 0 favours the home side, feature 1 the away side.
    fn prior(input_dim: usize) -> Self {
        let mut weights = [vec![0.0; input_dim], vec![0.0; input_dim], vec![0.0; input_dim]];
        if input_dim >= 2 {
            weights[Outcome::HomeWin.index()][0] = 1.0;
            weights[Outcome::AwayWin.index()][1] = 1.0;
        }
        Self {
            weights,
            bias: [0.0; CLASSES],
        }
    }

    fn probabilities(&self, features: &[f64]) -> [f64; CLASSES] {
        let mut logits = self.bias;
        for (k, logit) in logits.iter_mut().enumerate() {
            *logit += self.weights[k]
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        }
        softmax(logits)
    }
}

fn softmax(logits: [f64; CLASSES]) -> [f64; CLASSES] {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps = logits.map(|l| (l - max).exp());
    let total: f64 = exps.iter().sum();
    exps.map(|e| e / total)
}

fn argmax(p: &[f64; CLASSES]) -> usize {
    let mut best = 0;
    for k in 1..CLASSES {
        if p[k] > p[best] {
            best = k;
        }
    }
    best
}

#[derive(Debug)]
struct ModelState {
    params: Parameters,
    revision: u32,
}

/// Softmax classifier implementing [`Predictor`].
#[derive(Debug)]
pub struct SoftmaxPredictor {
    input_dim: usize,
    base_version: String,
    learning_rate: f64,
    epochs: u32,
    state: RwLock<ModelState>,
    training: Mutex<()>,
}

impl SoftmaxPredictor {
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            input_dim: config.input_dim,
            base_version: config.model_version.clone(),
            learning_rate: config.learning_rate,
            epochs: config.epochs,
            state: RwLock::new(ModelState {
                params: Parameters::prior(config.input_dim),
                revision: 0,
            }),
            training: Mutex::new(()),
        }
    }

    fn version_for(&self, revision: u32) -> String {
        if revision == 0 {
            self.base_version.clone()
        } else {
            format!("{}+r{}", self.base_version, revision)
        }
    }

    fn validate_training_set(&self, data: &[Vec<f64>], labels: &[u32]) -> TrainingResult<()> {
        if data.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if data.len() != labels.len() {
            return Err(TrainingError::LengthMismatch {
                data: data.len(),
                labels: labels.len(),
            });
        }
        for (row, (sample, &label)) in data.iter().zip(labels).enumerate() {
            if sample.len() != self.input_dim {
                return Err(TrainingError::DimensionMismatch {
                    row,
                    expected: self.input_dim,
                    actual: sample.len(),
                });
            }
            if sample.iter().any(|x| !x.is_finite()) {
                return Err(TrainingError::NonFinite { row });
            }
            if Outcome::from_label(label).is_none() {
                return Err(TrainingError::InvalidLabel { row, label });
            }
        }
        Ok(())
    }

    fn fit(&self, mut params: Parameters, data: &[Vec<f64>], labels: &[u32]) -> Parameters {
        let n = data.len() as f64;
        for _ in 0..self.epochs {
            let mut grad_w = [
                vec![0.0; self.input_dim],
                vec![0.0; self.input_dim],
                vec![0.0; self.input_dim],
            ];
            let mut grad_b = [0.0; CLASSES];

            for (x, &label) in data.iter().zip(labels) {
                let p = params.probabilities(x);
                for k in 0..CLASSES {
                    let target = if k == label as usize { 1.0 } else { 0.0 };
                    let g = p[k] - target;
                    grad_b[k] += g;
                    for (gw, xi) in grad_w[k].iter_mut().zip(x) {
                        *gw += g * xi;
                    }
                }
            }

            for k in 0..CLASSES {
                params.bias[k] -= self.learning_rate * grad_b[k] / n;
                for (w, gw) in params.weights[k].iter_mut().zip(&grad_w[k]) {
                    *w -= self.learning_rate * gw / n;
                }
            }
        }
        params
    }

    fn evaluate(params: &Parameters, data: &[Vec<f64>], labels: &[u32]) -> (f64, f64) {
        let mut correct = 0usize;
        let mut loss = 0.0;
        for (x, &label) in data.iter().zip(labels) {
            let p = params.probabilities(x);
            if argmax(&p) == label as usize {
                correct += 1;
            }
            loss -= p[label as usize].max(1e-12).ln();
        }
        let n = data.len() as f64;
        (correct as f64 / n, loss / n)
    }
}

impl Predictor for SoftmaxPredictor {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn model_version(&self) -> String {
        let state = self.state.read().expect("model lock poisoned");
        self.version_for(state.revision)
    }

    fn predict(&self, features: &[f64]) -> Result<Prediction, PredictorError> {
        if features.len() != self.input_dim {
            return Err(PredictorError::InvalidInput(format!(
                "expected {} features, got {}",
                self.input_dim,
                features.len()
            )));
        }
        if features.iter().any(|x| !x.is_finite()) {
            return Err(PredictorError::InvalidInput("features must be finite".into()));
        }

        let (p, version) = {
            let state = self.state.read().expect("model lock poisoned");
            (state.params.probabilities(features), self.version_for(state.revision))
        };
        if p.iter().any(|v| !v.is_finite()) {
            return Err(PredictorError::Model("probabilities overflowed".into()));
        }

        let best = argmax(&p);
        Ok(Prediction {
            prediction: Outcome::ALL[best],
            confidence: p[best],
            probabilities: Some(Probabilities::from_array(p)),
            model_version: version,
        })
    }

    fn train(&self, data: &[Vec<f64>], labels: &[u32]) -> TrainingResult<TrainingSummary> {
        self.validate_training_set(data, labels)?;

        let _run = self.training.lock().expect("training lock poisoned");
        let start = self.state.read().expect("model lock poisoned").params.clone();
        let params = self.fit(start, data, labels);
        let (accuracy, loss) = Self::evaluate(&params, data, labels);

        let revision = {
            let mut state = self.state.write().expect("model lock poisoned");
            state.params = params;
            state.revision += 1;
            state.revision
        };

        Ok(TrainingSummary {
            status: "trained".to_string(),
            model_version: self.version_for(revision),
            metrics: TrainingMetrics {
                samples: data.len(),
                epochs: self.epochs,
                accuracy,
                loss,
            },
        })
    }
}

//! Rule-based prediction attached to degraded responses.

use crate::predictor::types::{Outcome, Prediction};

pub const RULE_BASED_VERSION: &str = "rule-based-v1";
pub const RULE_BASED_CONFIDENCE: f64 = 0.6;

/// Compare home strength (feature 0) against away strength (feature 1).
///
/// Needs at least two finite features; returns `None` otherwise.
pub fn rule_based(features: &[f64]) -> Option<Prediction> {
    let (home, away) = match features {
        [home, away, ..] if home.is_finite() && away.is_finite() => (*home, *away),
        _ => return None,
    };

    let prediction = if home > away {
        Outcome::HomeWin
    } else {
        Outcome::AwayWin
    };

    Some(Prediction {
        prediction,
        confidence: RULE_BASED_CONFIDENCE,
        probabilities: None,
        model_version: RULE_BASED_VERSION.to_string(),
    })
}

//! Templated advisory text for successful predictions.
//!
//! Pure and synchronous: no I/O, no failure modes.

use serde::{Deserialize, Serialize};

use crate::predictor::{Outcome, Prediction};

/// Teams involved in the predicted match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext<'a> {
    pub home_team: &'a str,
    pub away_team: &'a str,
}

/// Advisory text added by [`enhance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub ai_insight: String,
    pub strategic_advice: String,
}

/// A prediction, optionally decorated with advisory text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedPrediction {
    #[serde(flatten)]
    pub prediction: Prediction,
    #[serde(flatten)]
    pub insight: Option<Insight>,
}

impl EnhancedPrediction {
    pub fn plain(prediction: Prediction) -> Self {
        Self {
            prediction,
            insight: None,
        }
    }
}

const STRONG_SIGNAL: f64 = 0.65;
const WEAK_SIGNAL: f64 = 0.45;

/// Decorate `prediction` with insight and advice for `ctx`.
pub fn enhance(prediction: Prediction, ctx: &MatchContext<'_>) -> EnhancedPrediction {
    let insight = Insight {
        ai_insight: insight_text(&prediction, ctx),
        strategic_advice: advice_text(&prediction),
    };
    EnhancedPrediction {
        prediction,
        insight: Some(insight),
    }
}

fn insight_text(prediction: &Prediction, ctx: &MatchContext<'_>) -> String {
    let pct = (prediction.confidence * 100.0).round();
    let lean = match prediction.prediction {
        Outcome::HomeWin => format!("leans towards {} winning at home", ctx.home_team),
        Outcome::AwayWin => format!("leans towards {} taking the win on the road", ctx.away_team),
        Outcome::Draw => "expects the sides to cancel each other out".to_string(),
    };
    format!(
        "{} vs {}: the model {} with {}% confidence.",
        ctx.home_team, ctx.away_team, lean, pct
    )
}

fn advice_text(prediction: &Prediction) -> String {
    let label = prediction.prediction.as_str();
    if prediction.confidence >= STRONG_SIGNAL {
        format!("Strong signal for {label}; it can anchor a selection on its own.")
    } else if prediction.confidence >= WEAK_SIGNAL {
        format!("Moderate signal for {label}; combine it with a hedge rather than backing it alone.")
    } else {
        format!("Weak signal for {label}; treat this match as high risk and keep exposure small.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(outcome: Outcome, confidence: f64) -> Prediction {
        Prediction {
            prediction: outcome,
            confidence,
            probabilities: None,
            model_version: "1.0.0".into(),
        }
    }

    const CTX: MatchContext<'static> = MatchContext {
        home_team: "Lions",
        away_team: "Tigers",
    };

    #[test]
    fn test_mentions_teams_and_outcome() {
        let enhanced = enhance(prediction(Outcome::HomeWin, 0.72), &CTX);
        let insight = enhanced.insight.unwrap();

        assert!(insight.ai_insight.contains("Lions"));
        assert!(insight.ai_insight.contains("Tigers"));
        assert!(insight.ai_insight.contains("72%"));
        assert!(insight.strategic_advice.contains("home_win"));
        assert!(insight.strategic_advice.starts_with("Strong"));
    }

    #[test]
    fn test_every_outcome_names_both_teams() {
        for outcome in Outcome::ALL {
            let insight = enhance(prediction(outcome, 0.5), &CTX).insight.unwrap();
            assert!(insight.ai_insight.contains("Lions"), "{outcome}");
            assert!(insight.ai_insight.contains("Tigers"), "{outcome}");
            assert!(insight.strategic_advice.contains(outcome.as_str()));
        }
    }

    #[test]
    fn test_advice_bands() {
        let weak = enhance(prediction(Outcome::Draw, 0.40), &CTX).insight.unwrap();
        assert!(weak.strategic_advice.starts_with("Weak"));

        let moderate = enhance(prediction(Outcome::AwayWin, 0.55), &CTX).insight.unwrap();
        assert!(moderate.strategic_advice.starts_with("Moderate"));
    }

    #[test]
    fn test_flattened_serialization() {
        let json = serde_json::to_value(enhance(prediction(Outcome::HomeWin, 0.9), &CTX)).unwrap();
        assert_eq!(json["prediction"], "home_win");
        assert!(json["ai_insight"].is_string());
        assert!(json["strategic_advice"].is_string());

        let plain = serde_json::to_value(EnhancedPrediction::plain(prediction(Outcome::Draw, 0.4))).unwrap();
        assert!(plain.get("ai_insight").is_none());
    }
}

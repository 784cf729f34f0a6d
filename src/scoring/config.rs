use serde::{Deserialize, Serialize};

use super::factors::Direction;

/// Factor name that reads the sentiment signal instead of a snapshot ratio
pub const SENTIMENT_FACTOR: &str = "sentiment";

/// Scale applied to the weighted sum (scores land in 0..=SCORE_SCALE)
pub const SCORE_SCALE: f64 = 100.0;

/// Allowed distance between the weight sum and 1.0
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Weighting configuration.
///
/// An ordered list of factors. Weights must sum to 1.0, and each factor
/// names its normalization and an optional default for missing values.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   factors:
///     - name: debt_to_equity
///       weight: 0.3
///       normalize: "minmax(0, 3)"
///       direction: lower_is_better
///       default: 1.0
///     - name: sentiment
///       weight: 0.2
///       normalize: "minmax(-1, 1)"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    pub factors: Vec<FactorConfig>,
}

/// A single weighted factor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FactorConfig {
    /// Ratio name in the snapshot, or "sentiment"
    pub name: String,

    /// Share of the final score, in [0, 1]
    pub weight: f64,

    /// Normalization expression: "minmax(low, high)" or "sigmoid(midpoint, steepness)"
    pub normalize: String,

    #[serde(default)]
    pub direction: Direction,

    /// Value used when the ratio is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
}

impl FactorConfig {
    pub fn new(name: &str, weight: f64, normalize: &str, direction: Direction) -> Self {
        Self {
            name: name.to_string(),
            weight,
            normalize: normalize.to_string(),
            direction,
            default: None,
        }
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_sentiment(&self) -> bool {
        self.name == SENTIMENT_FACTOR
    }
}

impl ScoringConfig {
    pub fn weight_sum(&self) -> f64 {
        self.factors.iter().map(|f| f.weight).sum()
    }

    pub fn factor(&self, name: &str) -> Option<&FactorConfig> {
        self.factors.iter().find(|f| f.name == name)
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            factors: vec![
                FactorConfig::new("debt_to_equity", 0.3, "minmax(0, 3)", Direction::LowerIsBetter)
                    .with_default(1.0),
                FactorConfig::new("current_ratio", 0.2, "minmax(0.5, 3)", Direction::HigherIsBetter)
                    .with_default(1.5),
                FactorConfig::new(
                    "interest_coverage",
                    0.3,
                    "minmax(0, 10)",
                    Direction::HigherIsBetter,
                )
                .with_default(3.0),
                FactorConfig::new(SENTIMENT_FACTOR, 0.2, "minmax(-1, 1)", Direction::HigherIsBetter)
                    .with_default(0.0),
            ],
        }
    }
}

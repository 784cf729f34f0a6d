use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Whether a larger raw value is better or worse for credit quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    HigherIsBetter,
    LowerIsBetter,
}

/// Maps a raw factor value onto [0, 1].
///
/// Parsed from the config strings `"minmax(low, high)"` and
/// `"sigmoid(midpoint, steepness)"`.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalization {
    /// Linear between `low` and `high`, clamped outside
    MinMax { low: f64, high: f64 },
    /// Logistic curve centered on `midpoint`
    Sigmoid { midpoint: f64, steepness: f64 },
}

impl Normalization {
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, args) = s
            .split_once('(')
            .and_then(|(name, rest)| rest.strip_suffix(')').map(|args| (name, args)))
            .with_context(|| format!("expected 'name(a, b)', got '{}'", s))?;

        let values: Vec<f64> = args
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("non-numeric argument in '{}'", s))?;
        if values.len() != 2 {
            bail!("expected 2 arguments in '{}', got {}", s, values.len());
        }
        if values.iter().any(|v| !v.is_finite()) {
            bail!("arguments must be finite in '{}'", s);
        }

        match name.trim().to_ascii_lowercase().as_str() {
            "minmax" => {
                let (low, high) = (values[0], values[1]);
                if low >= high {
                    bail!("minmax low ({}) must be below high ({})", low, high);
                }
                Ok(Normalization::MinMax { low, high })
            }
            "sigmoid" => {
                let (midpoint, steepness) = (values[0], values[1]);
                if steepness <= 0.0 {
                    bail!("sigmoid steepness must be positive, got {}", steepness);
                }
                Ok(Normalization::Sigmoid { midpoint, steepness })
            }
            other => bail!("unknown normalization '{}' (expected minmax or sigmoid)", other),
        }
    }

    /// Normalize a finite raw value to [0, 1].
    pub fn apply(&self, raw: f64, direction: Direction) -> f64 {
        let n = match self {
            Normalization::MinMax { low, high } => ((raw - low) / (high - low)).clamp(0.0, 1.0),
            Normalization::Sigmoid {
                midpoint,
                steepness,
            } => 1.0 / (1.0 + (-steepness * (raw - midpoint)).exp()),
        };
        match direction {
            Direction::HigherIsBetter => n,
            Direction::LowerIsBetter => 1.0 - n,
        }
    }

    /// Raw value that normalizes to exactly 0.5 in either direction
    pub fn neutral_raw(&self) -> f64 {
        match self {
            Normalization::MinMax { low, high } => (low + high) / 2.0,
            Normalization::Sigmoid { midpoint, .. } => *midpoint,
        }
    }
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Normalization::MinMax { low, high } => write!(f, "minmax({}, {})", low, high),
            Normalization::Sigmoid {
                midpoint,
                steepness,
            } => write!(f, "sigmoid({}, {})", midpoint, steepness),
        }
    }
}

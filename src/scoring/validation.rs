use std::collections::HashSet;

use super::config::{ScoringConfig, WEIGHT_TOLERANCE};
use super::factors::Normalization;
use crate::error::ScoringError;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.factors.is_empty() {
        errors.push("scoring.factors: at least one factor is required".to_string());
    }

    let mut seen = HashSet::new();
    for (i, factor) in config.factors.iter().enumerate() {
        if factor.name.trim().is_empty() {
            errors.push(format!("scoring.factors[{}].name: must not be empty", i));
        } else if !seen.insert(factor.name.as_str()) {
            errors.push(format!(
                "scoring.factors[{}].name: duplicate factor '{}'",
                i, factor.name
            ));
        }

        if !factor.weight.is_finite() {
            errors.push(format!("scoring.factors[{}].weight: must be finite", i));
        } else if !(0.0..=1.0).contains(&factor.weight) {
            errors.push(format!(
                "scoring.factors[{}].weight: {} is outside [0, 1]",
                i, factor.weight
            ));
        }

        if let Err(e) = Normalization::parse(&factor.normalize) {
            errors.push(format!(
                "scoring.factors[{}].normalize: invalid '{}' - {}",
                i, factor.normalize, e
            ));
        }

        if let Some(default) = factor.default {
            if !default.is_finite() {
                errors.push(format!("scoring.factors[{}].default: must be finite", i));
            }
        }
    }

    let sum = config.weight_sum();
    if !config.factors.is_empty() && (!sum.is_finite() || (sum - 1.0).abs() > WEIGHT_TOLERANCE) {
        errors.push(format!("scoring.factors: weights sum to {}, expected 1.0", sum));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Same checks as [`validate_scoring`], as a typed engine error.
pub fn ensure_valid(config: &ScoringConfig) -> Result<(), ScoringError> {
    validate_scoring(config).map_err(ScoringError::Configuration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{Direction, FactorConfig};

    fn factor(name: &str, weight: f64) -> FactorConfig {
        FactorConfig::new(name, weight, "minmax(0, 1)", Direction::HigherIsBetter)
    }

    #[test]
    fn test_default_config_valid() {
        assert!(validate_scoring(&ScoringConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_config() {
        let config = ScoringConfig { factors: vec![] };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("at least one factor"));
    }

    #[test]
    fn test_weights_not_summing_to_one() {
        let config = ScoringConfig {
            factors: vec![factor("debt_ratio", 0.5), factor("sentiment", 0.3)],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("weights sum to 0.8"));
    }

    #[test]
    fn test_weight_sum_within_tolerance() {
        let config = ScoringConfig {
            factors: vec![factor("a", 0.1), factor("b", 0.2), factor("c", 0.7)],
        };
        // 0.1 + 0.2 + 0.7 is not exactly 1.0 in binary floating point
        assert!(validate_scoring(&config).is_ok());
    }

    #[test]
    fn test_ensure_valid_maps_to_configuration_error() {
        let config = ScoringConfig {
            factors: vec![factor("debt_ratio", 0.5), factor("sentiment", 0.3)],
        };
        match ensure_valid(&config) {
            Err(ScoringError::Configuration(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_weight() {
        let config = ScoringConfig {
            factors: vec![factor("a", 1.5), factor("b", -0.5)],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("scoring.factors[0].weight"));
        assert!(errors[1].contains("scoring.factors[1].weight"));
    }

    #[test]
    fn test_duplicate_and_empty_names() {
        let config = ScoringConfig {
            factors: vec![factor("a", 0.5), factor("a", 0.25), factor(" ", 0.25)],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("duplicate factor 'a'"));
        assert!(errors[1].contains("scoring.factors[2].name"));
    }

    #[test]
    fn test_invalid_normalization() {
        let mut bad = factor("a", 1.0);
        bad.normalize = "minmax(5, 1)".to_string();
        let config = ScoringConfig { factors: vec![bad] };
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.factors[0].normalize"));
    }

    #[test]
    fn test_non_finite_default() {
        let config = ScoringConfig {
            factors: vec![factor("a", 1.0).with_default(f64::NAN)],
        };
        let errors = validate_scoring(&config).unwrap_err();
        assert!(errors[0].contains("scoring.factors[0].default"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut bad = factor("a", 0.2);
        bad.normalize = "bad".to_string();
        let config = ScoringConfig {
            factors: vec![bad, factor("a", 0.2)],
        };
        let errors = validate_scoring(&config).unwrap_err();
        // bad normalize, duplicate name, weight sum
        assert_eq!(errors.len(), 3);
    }
}

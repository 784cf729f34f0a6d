use chrono::{DateTime, Utc};

use super::config::{FactorConfig, ScoringConfig, SCORE_SCALE};
use super::factors::Normalization;
use super::validation::ensure_valid;
use crate::error::ScoringError;
use crate::model::{
    CreditScore, FactorContribution, FinancialSnapshot, ScoreBreakdown, SentimentSignal, Signal,
    ValueSource,
};

/// Score one entity.
///
/// Pure: the result depends only on the arguments. `computed_at` is stamped
/// on the returned score as-is, which keeps repeated calls identical.
///
/// # Errors
///
/// - [`ScoringError::Configuration`] if `config` fails validation
/// - [`ScoringError::InvalidInput`] if the snapshot and signal name different
///   entities, a ratio is non-finite, the sentiment is NaN, or every
///   snapshot-sourced factor is missing with no default configured
pub fn calculate_score(
    snapshot: &FinancialSnapshot,
    sentiment: &SentimentSignal,
    config: &ScoringConfig,
    computed_at: DateTime<Utc>,
) -> Result<CreditScore, ScoringError> {
    ensure_valid(config)?;
    check_inputs(snapshot, sentiment, config)?;

    let mut rows = Vec::with_capacity(config.factors.len());
    for factor in &config.factors {
        // Validation already proved every normalization parses
        let normalization = Normalization::parse(&factor.normalize)
            .map_err(|e| ScoringError::Configuration(vec![e.to_string()]))?;
        let (raw_value, source) = resolve_raw(factor, &normalization, snapshot, sentiment);
        let normalized = normalization.apply(raw_value, factor.direction);

        rows.push(FactorContribution {
            name: factor.name.clone(),
            raw_value,
            source,
            normalized,
            weight: factor.weight,
            contribution: normalized * factor.weight * SCORE_SCALE,
            signal: Signal::from_normalized(normalized),
        });
    }

    tracing::debug!(
        entity = %snapshot.entity(),
        factors = rows.len(),
        "scored entity"
    );

    Ok(CreditScore::from_breakdown(
        snapshot.entity().clone(),
        computed_at,
        ScoreBreakdown::new(rows),
    ))
}

fn check_inputs(
    snapshot: &FinancialSnapshot,
    sentiment: &SentimentSignal,
    config: &ScoringConfig,
) -> Result<(), ScoringError> {
    if snapshot.entity().is_empty() {
        return Err(ScoringError::InvalidInput(
            "snapshot has an empty entity identifier".to_string(),
        ));
    }
    if snapshot.entity() != sentiment.entity() {
        return Err(ScoringError::InvalidInput(format!(
            "entity mismatch: snapshot is for '{}' but sentiment is for '{}'",
            snapshot.entity(),
            sentiment.entity()
        )));
    }

    if let Some((name, value)) = snapshot.ratios().iter().find(|(_, v)| !v.is_finite()) {
        return Err(ScoringError::InvalidInput(format!(
            "ratio '{}' is not finite ({})",
            name, value
        )));
    }
    if sentiment.value().is_nan() {
        return Err(ScoringError::InvalidInput(
            "sentiment value is NaN".to_string(),
        ));
    }

    let ratio_factors: Vec<&FactorConfig> =
        config.factors.iter().filter(|f| !f.is_sentiment()).collect();
    let all_missing = !ratio_factors.is_empty()
        && ratio_factors
            .iter()
            .all(|f| snapshot.ratio(&f.name).is_none() && f.default.is_none());
    if all_missing {
        let names: Vec<&str> = ratio_factors.iter().map(|f| f.name.as_str()).collect();
        return Err(ScoringError::InvalidInput(format!(
            "snapshot for '{}' has none of the required ratios ({}) and no defaults are configured",
            snapshot.entity(),
            names.join(", ")
        )));
    }

    Ok(())
}

fn resolve_raw(
    factor: &FactorConfig,
    normalization: &Normalization,
    snapshot: &FinancialSnapshot,
    sentiment: &SentimentSignal,
) -> (f64, ValueSource) {
    if factor.is_sentiment() {
        let value = sentiment.value();
        let clamped = value.clamp(SentimentSignal::MIN, SentimentSignal::MAX);
        if clamped != value {
            tracing::debug!(value, clamped, "sentiment outside bounds, clamped");
            return (clamped, ValueSource::Clamped);
        }
        return (value, ValueSource::Observed);
    }

    match (snapshot.ratio(&factor.name), factor.default) {
        (Some(value), _) => (value, ValueSource::Observed),
        (None, Some(default)) => (default, ValueSource::Default),
        (None, None) => (normalization.neutral_raw(), ValueSource::Neutral),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;
    use crate::scoring::{Direction, FactorConfig, SENTIMENT_FACTOR};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap()
    }

    fn snapshot(entity: &str, ratios: &[(&str, f64)]) -> FinancialSnapshot {
        FinancialSnapshot::new(
            entity,
            ts(),
            ratios.iter().map(|(k, v)| (k.to_string(), *v)),
        )
    }

    fn scenario_snapshot() -> FinancialSnapshot {
        snapshot(
            "NVDA",
            &[
                ("debt_to_equity", 1.2),
                ("current_ratio", 1.8),
                ("interest_coverage", 4.0),
            ],
        )
    }

    fn assert_sums(score: &CreditScore) {
        let total: f64 = score
            .breakdown()
            .rows()
            .iter()
            .map(|r| r.contribution)
            .sum();
        assert!((score.score() - total).abs() < 1e-9);
    }

    #[test]
    fn test_reference_scenario() {
        let sentiment = SentimentSignal::new("NVDA", 0.3, 12);
        let result =
            calculate_score(&scenario_snapshot(), &sentiment, &ScoringConfig::default(), ts())
                .unwrap();

        assert_eq!(result.breakdown().len(), 4);
        assert_sums(&result);
        // 0.6*30 + 0.52*20 + 0.4*30 + 0.65*20
        assert!((result.score() - 53.4).abs() < 1e-9);
        assert_eq!(result.entity(), &EntityId::new("NVDA"));
        assert_eq!(result.computed_at(), ts());

        let names: Vec<_> = result
            .breakdown()
            .rows()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "debt_to_equity",
                "sentiment",
                "interest_coverage",
                "current_ratio"
            ]
        );

        let dte = result.breakdown().get("debt_to_equity").unwrap();
        assert_eq!(dte.raw_value, 1.2);
        assert!((dte.normalized - 0.6).abs() < 1e-12);
        assert!((dte.contribution - 18.0).abs() < 1e-9);
        assert_eq!(dte.weight, 0.3);
    }

    #[test]
    fn test_idempotent() {
        let sentiment = SentimentSignal::new("NVDA", 0.3, 12);
        let config = ScoringConfig::default();
        let first = calculate_score(&scenario_snapshot(), &sentiment, &config, ts()).unwrap();
        let second = calculate_score(&scenario_snapshot(), &sentiment, &config, ts()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_ratio_uses_default() {
        let snap = snapshot("NVDA", &[("debt_to_equity", 1.2), ("current_ratio", 1.8)]);
        let sentiment = SentimentSignal::new("NVDA", 0.3, 12);
        let result = calculate_score(&snap, &sentiment, &ScoringConfig::default(), ts()).unwrap();

        let row = result.breakdown().get("interest_coverage").unwrap();
        assert_eq!(row.raw_value, 3.0);
        assert_eq!(row.source, ValueSource::Default);
        assert!((row.contribution - 9.0).abs() < 1e-9);
        assert_sums(&result);
    }

    #[test]
    fn test_missing_ratio_without_default_is_neutral() {
        let config = ScoringConfig {
            factors: vec![
                FactorConfig::new("current_ratio", 0.5, "minmax(0.5, 3)", Direction::HigherIsBetter),
                FactorConfig::new("interest_coverage", 0.5, "minmax(0, 10)", Direction::HigherIsBetter),
            ],
        };
        let snap = snapshot("NVDA", &[("current_ratio", 3.0)]);
        let result =
            calculate_score(&snap, &SentimentSignal::neutral("NVDA"), &config, ts()).unwrap();

        let row = result.breakdown().get("interest_coverage").unwrap();
        assert_eq!(row.source, ValueSource::Neutral);
        assert_eq!(row.raw_value, 5.0);
        assert!((row.normalized - 0.5).abs() < 1e-12);
        assert!((result.score() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_sentiment_clamped_not_rejected() {
        let high = SentimentSignal::new("NVDA", 3.5, 4);
        let result =
            calculate_score(&scenario_snapshot(), &high, &ScoringConfig::default(), ts()).unwrap();
        let row = result.breakdown().get(SENTIMENT_FACTOR).unwrap();
        assert_eq!(row.raw_value, 1.0);
        assert_eq!(row.source, ValueSource::Clamped);
        assert!((row.contribution - 20.0).abs() < 1e-9);

        let low = SentimentSignal::new("NVDA", -7.0, 4);
        let result =
            calculate_score(&scenario_snapshot(), &low, &ScoringConfig::default(), ts()).unwrap();
        let row = result.breakdown().get(SENTIMENT_FACTOR).unwrap();
        assert_eq!(row.raw_value, -1.0);
        assert_eq!(row.contribution, 0.0);
    }

    #[test]
    fn test_boundary_sentiment_is_observed() {
        let edge = SentimentSignal::new("NVDA", -1.0, 4);
        let result =
            calculate_score(&scenario_snapshot(), &edge, &ScoringConfig::default(), ts()).unwrap();
        let row = result.breakdown().get(SENTIMENT_FACTOR).unwrap();
        assert_eq!(row.source, ValueSource::Observed);
    }

    #[test]
    fn test_entity_mismatch() {
        let sentiment = SentimentSignal::new("MSFT", 0.3, 12);
        let err = calculate_score(&scenario_snapshot(), &sentiment, &ScoringConfig::default(), ts())
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(ref m) if m.contains("mismatch")));
    }

    #[test]
    fn test_entity_match_ignores_case() {
        let sentiment = SentimentSignal::new("nvda", 0.3, 12);
        assert!(
            calculate_score(&scenario_snapshot(), &sentiment, &ScoringConfig::default(), ts())
                .is_ok()
        );
    }

    #[test]
    fn test_all_ratios_missing_without_defaults() {
        let config = ScoringConfig {
            factors: vec![
                FactorConfig::new("current_ratio", 0.5, "minmax(0.5, 3)", Direction::HigherIsBetter),
                FactorConfig::new(SENTIMENT_FACTOR, 0.5, "minmax(-1, 1)", Direction::HigherIsBetter),
            ],
        };
        let snap = snapshot("NVDA", &[]);
        let err = calculate_score(&snap, &SentimentSignal::neutral("NVDA"), &config, ts())
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(ref m) if m.contains("current_ratio")));
    }

    #[test]
    fn test_all_ratios_missing_with_defaults_scores() {
        let snap = snapshot("NVDA", &[]);
        let result = calculate_score(
            &snap,
            &SentimentSignal::neutral("NVDA"),
            &ScoringConfig::default(),
            ts(),
        )
        .unwrap();
        assert!(result
            .breakdown()
            .rows()
            .iter()
            .filter(|r| r.name != SENTIMENT_FACTOR)
            .all(|r| r.source == ValueSource::Default));
        assert_sums(&result);
    }

    #[test]
    fn test_non_finite_ratio_rejected() {
        let snap = snapshot("NVDA", &[("debt_to_equity", f64::INFINITY)]);
        let err = calculate_score(
            &snap,
            &SentimentSignal::neutral("NVDA"),
            &ScoringConfig::default(),
            ts(),
        )
        .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(ref m) if m.contains("debt_to_equity")));
    }

    #[test]
    fn test_nan_sentiment_rejected() {
        let sentiment = SentimentSignal::new("NVDA", f64::NAN, 3);
        let err = calculate_score(&scenario_snapshot(), &sentiment, &ScoringConfig::default(), ts())
            .unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_weights_raise_configuration_error() {
        let config = ScoringConfig {
            factors: vec![
                FactorConfig::new("debt_ratio", 0.5, "minmax(0, 3)", Direction::LowerIsBetter),
                FactorConfig::new(SENTIMENT_FACTOR, 0.3, "minmax(-1, 1)", Direction::HigherIsBetter),
            ],
        };
        let snap = snapshot("NVDA", &[("debt_ratio", 1.0)]);
        let err = calculate_score(&snap, &SentimentSignal::neutral("NVDA"), &config, ts())
            .unwrap_err();
        assert!(matches!(err, ScoringError::Configuration(_)));
    }

    #[test]
    fn test_extra_ratios_ignored() {
        let snap = snapshot(
            "NVDA",
            &[
                ("debt_to_equity", 1.2),
                ("current_ratio", 1.8),
                ("interest_coverage", 4.0),
                ("profit_margin", 0.55),
            ],
        );
        let sentiment = SentimentSignal::new("NVDA", 0.3, 12);
        let result = calculate_score(&snap, &sentiment, &ScoringConfig::default(), ts()).unwrap();
        assert_eq!(result.breakdown().len(), 4);
        assert!(result.breakdown().get("profit_margin").is_none());
    }

    #[test]
    fn test_score_bounds() {
        let best = snapshot(
            "NVDA",
            &[
                ("debt_to_equity", 0.0),
                ("current_ratio", 10.0),
                ("interest_coverage", 50.0),
            ],
        );
        let result = calculate_score(
            &best,
            &SentimentSignal::new("NVDA", 1.0, 5),
            &ScoringConfig::default(),
            ts(),
        )
        .unwrap();
        assert!((result.score() - 100.0).abs() < 1e-9);

        let worst = snapshot(
            "NVDA",
            &[
                ("debt_to_equity", 9.0),
                ("current_ratio", 0.1),
                ("interest_coverage", -2.0),
            ],
        );
        let result = calculate_score(
            &worst,
            &SentimentSignal::new("NVDA", -1.0, 5),
            &ScoringConfig::default(),
            ts(),
        )
        .unwrap();
        assert!(result.score().abs() < 1e-9);
    }

    #[test]
    fn test_sigmoid_factor_sums() {
        let config = ScoringConfig {
            factors: vec![
                FactorConfig::new("debt_to_equity", 0.7, "sigmoid(1.5, 2)", Direction::LowerIsBetter),
                FactorConfig::new(SENTIMENT_FACTOR, 0.3, "minmax(-1, 1)", Direction::HigherIsBetter),
            ],
        };
        let snap = snapshot("NVDA", &[("debt_to_equity", 0.4)]);
        let result =
            calculate_score(&snap, &SentimentSignal::new("NVDA", -0.2, 8), &config, ts()).unwrap();
        assert_sums(&result);
        assert_eq!(
            result.breakdown().get("debt_to_equity").unwrap().signal,
            Signal::Positive
        );
    }
}

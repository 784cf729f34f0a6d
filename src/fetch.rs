use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;

use crate::model::{CreditScore, EntityId, FinancialSnapshot, SentimentSignal};
use crate::scoring::{calculate_score, ScoringConfig};
use crate::sources::{SentimentProvider, SnapshotProvider};

/// Tickers fetched at the same time
const MAX_CONCURRENT_TICKERS: usize = 4;

/// Everything gathered and computed for one ticker
#[derive(Debug, Clone)]
pub struct Assessment {
    pub snapshot: FinancialSnapshot,
    pub sentiment: SentimentSignal,
    pub score: CreditScore,
}

/// Result of scoring a batch: the successes plus per-ticker failures
#[derive(Debug)]
pub struct BatchOutcome {
    pub assessments: Vec<Assessment>,
    pub failures: Vec<(EntityId, anyhow::Error)>,
}

/// Fetch both inputs for one entity in parallel and score them.
pub async fn assess<S, N>(
    entity: &EntityId,
    snapshots: &S,
    news: &N,
    scoring: &ScoringConfig,
    now: DateTime<Utc>,
) -> Result<Assessment>
where
    S: SnapshotProvider,
    N: SentimentProvider,
{
    let (snapshot, sentiment) = tokio::try_join!(
        snapshots.fetch_snapshot(entity),
        news.fetch_sentiment(entity)
    )?;
    let score = calculate_score(&snapshot, &sentiment, scoring, now)?;
    Ok(Assessment {
        snapshot,
        sentiment,
        score,
    })
}

/// De-duplicate tickers case-insensitively, keeping first occurrence order.
pub fn unique_entities(tickers: &[String]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    tickers
        .iter()
        .map(EntityId::new)
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Score many tickers with bounded concurrency.
///
/// Individual failures are reported in [`BatchOutcome::failures`]; the call
/// only fails when every ticker failed. Results are sorted by score
/// descending, then ticker ascending.
pub async fn collect_and_score<S, N>(
    tickers: &[String],
    snapshots: &S,
    news: &N,
    scoring: &ScoringConfig,
    now: DateTime<Utc>,
) -> Result<BatchOutcome>
where
    S: SnapshotProvider,
    N: SentimentProvider,
{
    let entities = unique_entities(tickers);
    if entities.is_empty() {
        return Err(anyhow!("No tickers to score"));
    }
    tracing::debug!(count = entities.len(), "scoring tickers");

    let mut futures = FuturesUnordered::new();
    let mut pending = entities.iter();
    let mut assessments = Vec::new();
    let mut failures = Vec::new();

    // Fill initial batch
    for entity in pending.by_ref().take(MAX_CONCURRENT_TICKERS) {
        futures.push(tagged(entity, snapshots, news, scoring, now));
    }

    // Process results and feed new tasks
    while let Some((entity, result)) = futures.next().await {
        match result {
            Ok(assessment) => {
                tracing::info!(%entity, score = assessment.score.score(), "scored");
                assessments.push(assessment);
            }
            Err(e) => {
                tracing::warn!(%entity, error = %e, "ticker failed");
                failures.push((entity, e));
            }
        }
        if let Some(next) = pending.next() {
            futures.push(tagged(next, snapshots, news, scoring, now));
        }
    }

    if assessments.is_empty() {
        let total = failures.len();
        let (_, first) = failures.swap_remove(0);
        return Err(first.context(format!("All {} tickers failed", total)));
    }

    assessments.sort_by(|a, b| {
        b.score
            .score()
            .partial_cmp(&a.score.score())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.score.entity().cmp(b.score.entity()))
    });

    Ok(BatchOutcome {
        assessments,
        failures,
    })
}

async fn tagged<S, N>(
    entity: &EntityId,
    snapshots: &S,
    news: &N,
    scoring: &ScoringConfig,
    now: DateTime<Utc>,
) -> (EntityId, Result<Assessment>)
where
    S: SnapshotProvider,
    N: SentimentProvider,
{
    (
        entity.clone(),
        assess(entity, snapshots, news, scoring, now).await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;
    use crate::sources::FixtureProvider;
    use chrono::TimeZone;

    const FIXTURE: &str = r#"
snapshots:
  - entity: NVDA
    as_of: "2025-08-20T00:00:00Z"
    ratios: { debt_to_equity: 0.4, current_ratio: 4.4, interest_coverage: 30.0 }
  - entity: F
    as_of: "2025-08-20T00:00:00Z"
    ratios: { debt_to_equity: 3.5, current_ratio: 1.1, interest_coverage: 1.5 }
  - entity: ACME
    as_of: "2025-08-20T00:00:00Z"
    ratios: { debt_to_equity: 1.2, current_ratio: 1.8, interest_coverage: 4.0 }
sentiment:
  - entity: NVDA
    value: 0.4
    headline_count: 20
  - entity: F
    value: -0.3
    headline_count: 15
  - entity: ACME
    value: 0.3
    headline_count: 12
"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 20, 12, 0, 0).unwrap()
    }

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unique_entities() {
        let ids = unique_entities(&tickers(&["nvda", "MSFT", " NVDA", "", "msft"]));
        assert_eq!(ids, vec![EntityId::new("NVDA"), EntityId::new("MSFT")]);
    }

    #[tokio::test]
    async fn test_assess_single() {
        let provider = FixtureProvider::parse(FIXTURE).unwrap();
        let assessment = assess(
            &EntityId::new("ACME"),
            &provider,
            &provider,
            &ScoringConfig::default(),
            now(),
        )
        .await
        .unwrap();
        assert!((assessment.score.score() - 53.4).abs() < 1e-9);
        assert_eq!(assessment.sentiment.headline_count(), 12);
    }

    #[tokio::test]
    async fn test_collect_sorts_by_score_descending() {
        let provider = FixtureProvider::parse(FIXTURE).unwrap();
        let outcome = collect_and_score(
            &tickers(&["f", "acme", "nvda"]),
            &provider,
            &provider,
            &ScoringConfig::default(),
            now(),
        )
        .await
        .unwrap();

        let order: Vec<_> = outcome
            .assessments
            .iter()
            .map(|a| a.score.entity().as_str().to_string())
            .collect();
        assert_eq!(order, vec!["NVDA", "ACME", "F"]);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_collect_partial_failure() {
        let provider = FixtureProvider::parse(FIXTURE).unwrap();
        let outcome = collect_and_score(
            &tickers(&["NVDA", "UNKNOWN"]),
            &provider,
            &provider,
            &ScoringConfig::default(),
            now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.assessments.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, EntityId::new("UNKNOWN"));
    }

    #[tokio::test]
    async fn test_collect_all_failed() {
        let provider = FixtureProvider::parse(FIXTURE).unwrap();
        let err = collect_and_score(
            &tickers(&["AAA", "BBB"]),
            &provider,
            &provider,
            &ScoringConfig::default(),
            now(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("All 2 tickers failed"));
    }

    #[tokio::test]
    async fn test_scoring_error_survives_batch_failure() {
        let provider = FixtureProvider::parse(FIXTURE).unwrap();
        let bad = ScoringConfig { factors: vec![] };
        let err = collect_and_score(&tickers(&["NVDA"]), &provider, &provider, &bad, now())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScoringError>(),
            Some(ScoringError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_collect_empty_tickers() {
        let provider = FixtureProvider::default();
        let result = collect_and_score(
            &[],
            &provider,
            &provider,
            &ScoringConfig::default(),
            now(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_collect_more_than_concurrency_limit() {
        let provider = FixtureProvider::parse(FIXTURE).unwrap();
        let list = tickers(&["NVDA", "F", "ACME", "X1", "X2", "X3", "X4"]);
        let outcome = collect_and_score(
            &list,
            &provider,
            &provider,
            &ScoringConfig::default(),
            now(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.assessments.len() + outcome.failures.len(), 7);
    }
}

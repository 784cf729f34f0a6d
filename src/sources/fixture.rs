use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{SentimentProvider, SnapshotProvider};
use crate::error::ScoringError;
use crate::model::{EntityId, FinancialSnapshot, SentimentSignal};

/// File layout for offline inputs (YAML or JSON):
///
/// ```yaml
/// snapshots:
///   - entity: NVDA
///     as_of: "2025-08-20T00:00:00Z"
///     ratios: { debt_to_equity: 0.41, current_ratio: 4.4 }
/// sentiment:
///   - entity: NVDA
///     value: 0.3
///     headline_count: 12
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
    #[serde(default)]
    pub snapshots: Vec<FinancialSnapshot>,
    #[serde(default)]
    pub sentiment: Vec<SentimentSignal>,
}

/// Serves snapshots and sentiment from a fixture file instead of live APIs.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    snapshots: HashMap<EntityId, FinancialSnapshot>,
    sentiment: HashMap<EntityId, SentimentSignal>,
}

impl FixtureProvider {
    pub fn from_file(file: FixtureFile) -> Self {
        Self {
            snapshots: file
                .snapshots
                .into_iter()
                .map(|s| (s.entity().clone(), s))
                .collect(),
            sentiment: file
                .sentiment
                .into_iter()
                .map(|s| (s.entity().clone(), s))
                .collect(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let file: FixtureFile = serde_saphyr::from_str(text)?;
        Ok(Self::from_file(file))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file at {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse fixture file at {}", path.display()))
    }

    /// Entities with a snapshot, sorted
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.snapshots.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl SnapshotProvider for FixtureProvider {
    async fn fetch_snapshot(&self, entity: &EntityId) -> Result<FinancialSnapshot> {
        self.snapshots
            .get(entity)
            .cloned()
            .ok_or_else(|| {
                ScoringError::InvalidInput(format!("no fixture snapshot for {}", entity)).into()
            })
    }
}

impl SentimentProvider for FixtureProvider {
    /// A ticker without a sentiment fixture reads as neutral, like a ticker with no news.
    async fn fetch_sentiment(&self, entity: &EntityId) -> Result<SentimentSignal> {
        Ok(self
            .sentiment
            .get(entity)
            .cloned()
            .unwrap_or_else(|| SentimentSignal::neutral(entity.clone())))
    }
}

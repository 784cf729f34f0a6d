use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{CreditScore, EntityId};

/// Points kept per ticker; older ones are dropped first
pub const MAX_POINTS_PER_TICKER: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreHistory {
    pub version: u32,
    #[serde(default)]
    pub entries: HashMap<String, Vec<HistoryPoint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub computed_at: DateTime<Utc>,
    pub score: f64,
}

impl Default for ScoreHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreHistory {
    /// Create an empty history with version 1
    pub fn new() -> Self {
        Self {
            version: 1,
            entries: HashMap::new(),
        }
    }

    /// Append a score, keeping points in time order and capped per ticker.
    ///
    /// Recording the same `computed_at` twice replaces the earlier point, so
    /// re-running a fixture-driven score does not pile up duplicates.
    pub fn record(&mut self, score: &CreditScore) {
        let points = self
            .entries
            .entry(score.entity().as_str().to_string())
            .or_default();

        let point = HistoryPoint {
            computed_at: score.computed_at(),
            score: score.score(),
        };
        match points.iter_mut().find(|p| p.computed_at == point.computed_at) {
            Some(existing) => *existing = point,
            None => points.push(point),
        }
        points.sort_by_key(|p| p.computed_at);

        if points.len() > MAX_POINTS_PER_TICKER {
            let excess = points.len() - MAX_POINTS_PER_TICKER;
            points.drain(..excess);
        }
    }

    /// The last `n` points for a ticker, oldest first
    pub fn trend(&self, entity: &EntityId, n: usize) -> &[HistoryPoint] {
        match self.entries.get(entity.as_str()) {
            Some(points) => &points[points.len().saturating_sub(n)..],
            None => &[],
        }
    }

    /// Most recent point for a ticker
    pub fn latest(&self, entity: &EntityId) -> Option<&HistoryPoint> {
        self.entries.get(entity.as_str()).and_then(|p| p.last())
    }
}

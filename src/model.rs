use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Entity identifier (ticker symbol), stored trimmed and upper-cased so that
/// "nvda" and " NVDA" name the same company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time financial ratios for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    entity: EntityId,
    as_of: DateTime<Utc>,
    #[serde(default)]
    ratios: BTreeMap<String, f64>,
}

impl FinancialSnapshot {
    pub fn new(
        entity: impl Into<EntityId>,
        as_of: DateTime<Utc>,
        ratios: impl IntoIterator<Item = (String, f64)>,
    ) -> Self {
        Self {
            entity: entity.into(),
            as_of,
            ratios: ratios.into_iter().collect(),
        }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn ratio(&self, name: &str) -> Option<f64> {
        self.ratios.get(name).copied()
    }

    pub fn ratios(&self) -> &BTreeMap<String, f64> {
        &self.ratios
    }
}

/// Aggregated news sentiment for one entity over a lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSignal {
    entity: EntityId,
    value: f64,
    headline_count: u32,
    #[serde(default, with = "humantime_serde_opt")]
    window: Option<Duration>,
    #[serde(default)]
    top_headline: Option<String>,
}

impl SentimentSignal {
    /// Lower bound of the sentiment scale
    pub const MIN: f64 = -1.0;
    /// Upper bound of the sentiment scale
    pub const MAX: f64 = 1.0;

    pub fn new(entity: impl Into<EntityId>, value: f64, headline_count: u32) -> Self {
        Self {
            entity: entity.into(),
            value,
            headline_count,
            window: None,
            top_headline: None,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_top_headline(mut self, headline: impl Into<String>) -> Self {
        self.top_headline = Some(headline.into());
        self
    }

    /// Neutral signal used when no headlines were found
    pub fn neutral(entity: impl Into<EntityId>) -> Self {
        Self::new(entity, 0.0, 0)
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    /// Raw value as supplied; the engine clamps it to [MIN, MAX]
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn headline_count(&self) -> u32 {
        self.headline_count
    }

    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    pub fn top_headline(&self) -> Option<&str> {
        self.top_headline.as_deref()
    }
}

/// Where a breakdown row's raw value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Present in the input
    Observed,
    /// Missing from the input, replaced by the factor's configured default
    Default,
    /// Missing with no default, replaced by the value that normalizes to 0.5
    Neutral,
    /// Present but outside the allowed bound, clamped into it
    Clamped,
}

/// Direction a factor pushed the score relative to a neutral reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Positive,
    Neutral,
    Negative,
}

impl Signal {
    /// Normalized values within this distance of 0.5 read as neutral
    pub const NEUTRAL_BAND: f64 = 0.1;

    pub fn from_normalized(normalized: f64) -> Self {
        if normalized > 0.5 + Self::NEUTRAL_BAND {
            Signal::Positive
        } else if normalized < 0.5 - Self::NEUTRAL_BAND {
            Signal::Negative
        } else {
            Signal::Neutral
        }
    }
}

/// One row of a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub name: String,
    pub raw_value: f64,
    pub source: ValueSource,
    pub normalized: f64, // in [0, 1]
    pub weight: f64,
    pub contribution: f64, // normalized * weight * scale
    pub signal: Signal,
}

/// Itemized contributions, ordered by descending absolute contribution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    rows: Vec<FactorContribution>,
}

impl ScoreBreakdown {
    /// Build a breakdown, sorting rows by descending absolute contribution.
    /// The sort is stable, so ties keep their input order.
    pub fn new(mut rows: Vec<FactorContribution>) -> Self {
        rows.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self { rows }
    }

    pub fn rows(&self) -> &[FactorContribution] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FactorContribution> {
        self.rows.iter().find(|r| r.name == name)
    }

    /// Sum of weighted contributions
    pub fn total(&self) -> f64 {
        // Summing an empty f64 iterator yields -0.0, which renders as "-0.0"
        self.rows.iter().fold(0.0, |acc, r| acc + r.contribution)
    }

    /// Most influential factor
    pub fn top_driver(&self) -> Option<&FactorContribution> {
        self.rows.first()
    }
}

/// Coarse rating derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingBand {
    Strong,
    Moderate,
    Weak,
}

impl RatingBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            RatingBand::Strong
        } else if score >= 40.0 {
            RatingBand::Moderate
        } else {
            RatingBand::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingBand::Strong => "strong",
            RatingBand::Moderate => "moderate",
            RatingBand::Weak => "weak",
        }
    }
}

impl fmt::Display for RatingBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final explainable score for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditScore {
    entity: EntityId,
    score: f64,
    computed_at: DateTime<Utc>,
    breakdown: ScoreBreakdown,
}

impl CreditScore {
    /// Build a score whose value is the breakdown's total.
    pub fn from_breakdown(
        entity: EntityId,
        computed_at: DateTime<Utc>,
        breakdown: ScoreBreakdown,
    ) -> Self {
        Self {
            entity,
            score: breakdown.total(),
            computed_at,
            breakdown,
        }
    }

    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn computed_at(&self) -> DateTime<Utc> {
        self.computed_at
    }

    pub fn breakdown(&self) -> &ScoreBreakdown {
        &self.breakdown
    }

    pub fn band(&self) -> RatingBand {
        RatingBand::from_score(self.score)
    }
}

/// Optional `Duration` as a humantime string ("7d", "12h").
mod humantime_serde_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&humantime::format_duration(*d).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

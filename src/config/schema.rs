use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::scoring::ScoringConfig;

fn default_cache_ttl() -> String {
    "10m".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Default watchlist scored when no tickers are given
    #[serde(default)]
    pub tickers: Vec<String>,

    /// How long fetched API responses stay fresh (humantime, e.g. "10m")
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<ScoringConfig>,

    #[serde(default)]
    pub news: NewsConfig,

    #[serde(default, skip_serializing_if = "ApiKeys::is_empty")]
    pub api_keys: ApiKeys,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tickers: Vec::new(),
            cache_ttl: default_cache_ttl(),
            scoring: None,
            news: NewsConfig::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Parsed cache TTL; falls back to 10 minutes on a malformed value
    pub fn cache_ttl(&self) -> Duration {
        humantime::parse_duration(&self.cache_ttl).unwrap_or(Duration::from_secs(600))
    }

    /// Scoring config in effect (configured or built-in defaults)
    pub fn effective_scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NewsConfig {
    /// Headlines fetched per ticker (NewsAPI caps this at 100)
    #[serde(default = "NewsConfig::default_page_size")]
    pub page_size: u32,

    #[serde(default = "NewsConfig::default_language")]
    pub language: String,

    /// How far back headlines are considered (humantime, e.g. "7d")
    #[serde(default = "NewsConfig::default_lookback")]
    pub lookback: String,
}

impl NewsConfig {
    fn default_page_size() -> u32 {
        20
    }

    fn default_language() -> String {
        "en".to_string()
    }

    fn default_lookback() -> String {
        "7d".to_string()
    }

    pub fn lookback(&self) -> Duration {
        humantime::parse_duration(&self.lookback).unwrap_or(Duration::from_secs(7 * 86400))
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
            language: Self::default_language(),
            lookback: Self::default_lookback(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_vantage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_api: Option<String>,
}

impl ApiKeys {
    pub fn is_empty(&self) -> bool {
        self.alpha_vantage.is_none() && self.news_api.is_none()
    }
}

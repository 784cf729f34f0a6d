use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use super::client::HttpFetcher;
use super::sentiment::HeadlineSentiment;
use super::SentimentProvider;
use crate::config::NewsConfig;
use crate::model::{EntityId, SentimentSignal};

const BASE_URL: &str = "https://newsapi.org/v2/everything";

/// Placeholder title NewsAPI uses for withdrawn articles
const REMOVED_TITLE: &str = "[Removed]";

/// A single news headline
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub title: String,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlesResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

pub struct NewsApiClient {
    fetcher: HttpFetcher,
    api_key: String,
    base_url: String,
    settings: NewsConfig,
    analyzer: HeadlineSentiment,
}

impl NewsApiClient {
    pub fn new(fetcher: HttpFetcher, api_key: String, settings: NewsConfig) -> Self {
        Self {
            fetcher,
            api_key,
            base_url: BASE_URL.to_string(),
            settings,
            analyzer: HeadlineSentiment::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn everything_url(&self, entity: &EntityId, now: DateTime<Utc>) -> Result<Url> {
        let lookback = chrono::Duration::from_std(self.settings.lookback())
            .context("News lookback window is too large")?;
        // Day granularity keeps the URL (and its cache key) stable within a day
        let from = (now - lookback).format("%Y-%m-%d").to_string();
        let page_size = self.settings.page_size.to_string();

        Url::parse_with_params(
            &self.base_url,
            &[
                ("q", entity.as_str()),
                ("sortBy", "publishedAt"),
                ("language", self.settings.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("from", from.as_str()),
                ("apiKey", self.api_key.as_str()),
            ],
        )
        .context("Invalid NewsAPI base URL")
    }

    /// Fetch recent headlines mentioning the entity
    pub async fn fetch_headlines(&self, entity: &EntityId) -> Result<Vec<Headline>> {
        let url = self.everything_url(entity, Utc::now())?;
        self.fetcher.get_parsed(url, parse_articles).await
    }
}

impl SentimentProvider for NewsApiClient {
    async fn fetch_sentiment(&self, entity: &EntityId) -> Result<SentimentSignal> {
        let headlines = self.fetch_headlines(entity).await?;
        if headlines.is_empty() {
            tracing::warn!(%entity, "no recent news articles found, using neutral sentiment");
        }
        let titles: Vec<&str> = headlines.iter().map(|h| h.title.as_str()).collect();
        Ok(self
            .analyzer
            .aggregate(entity, &titles, self.settings.lookback()))
    }
}

/// Extract headlines from a NewsAPI `everything` payload.
pub fn parse_articles(body: &Value) -> Result<Vec<Headline>> {
    let response: ArticlesResponse =
        serde_json::from_value(body.clone()).context("Unexpected NewsAPI response shape")?;

    if response.status != "ok" {
        bail!(
            "NewsAPI error ({}): {}",
            response.code.as_deref().unwrap_or("unknown"),
            response.message.as_deref().unwrap_or("no message")
        );
    }

    Ok(response
        .articles
        .into_iter()
        .filter_map(|article| {
            let title = article.title?.trim().to_string();
            if title.is_empty() || title == REMOVED_TITLE {
                return None;
            }
            Some(Headline {
                title,
                source: article.source.and_then(|s| s.name),
                published_at: article.published_at,
            })
        })
        .collect())
}

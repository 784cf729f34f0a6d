pub mod alpha_vantage;
pub mod cache;
pub mod client;
pub mod fixture;
pub mod news;
pub mod sentiment;

pub use alpha_vantage::AlphaVantageClient;
pub use cache::{clear_cache, get_cache_path, ResponseCache};
pub use client::HttpFetcher;
pub use fixture::FixtureProvider;
pub use news::{Headline, NewsApiClient};
pub use sentiment::HeadlineSentiment;

use anyhow::Result;

use crate::model::{EntityId, FinancialSnapshot, SentimentSignal};

/// Produces the financial snapshot for an entity.
///
/// The scoring engine does not care whether this hits a live API, a cache
/// or a fixture file.
#[allow(async_fn_in_trait)]
pub trait SnapshotProvider {
    async fn fetch_snapshot(&self, entity: &EntityId) -> Result<FinancialSnapshot>;
}

/// Produces the aggregated news sentiment for an entity.
#[allow(async_fn_in_trait)]
pub trait SentimentProvider {
    async fn fetch_sentiment(&self, entity: &EntityId) -> Result<SentimentSignal>;
}

//! Alpha Vantage `OVERVIEW` integration for financial ratios.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Url;
use serde_json::Value;

use super::client::HttpFetcher;
use super::SnapshotProvider;
use crate::model::{EntityId, FinancialSnapshot};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Overview field -> ratio name
const FIELD_MAP: &[(&str, &str)] = &[
    ("DebtToEquity", "debt_to_equity"),
    ("CurrentRatio", "current_ratio"),
    ("InterestCoverage", "interest_coverage"),
    ("ReturnOnEquityTTM", "return_on_equity"),
    ("ProfitMargin", "profit_margin"),
];

pub struct AlphaVantageClient {
    fetcher: HttpFetcher,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(fetcher: HttpFetcher, api_key: String) -> Self {
        Self {
            fetcher,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client somewhere else (mirrors, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn overview_url(&self, entity: &EntityId) -> Result<Url> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("function", "OVERVIEW"),
                ("symbol", entity.as_str()),
                ("apikey", self.api_key.as_str()),
            ],
        )
        .context("Invalid Alpha Vantage base URL")
    }
}

impl SnapshotProvider for AlphaVantageClient {
    async fn fetch_snapshot(&self, entity: &EntityId) -> Result<FinancialSnapshot> {
        let url = self.overview_url(entity)?;
        self.fetcher
            .get_parsed(url, |body| parse_overview(entity, body, Utc::now()))
            .await
    }
}

/// Build a snapshot from an `OVERVIEW` payload.
///
/// Missing or unparseable ratios are left out so the scoring defaults apply.
/// The snapshot is dated by `LatestQuarter` when present, else `fetched_at`.
pub fn parse_overview(
    entity: &EntityId,
    body: &Value,
    fetched_at: DateTime<Utc>,
) -> Result<FinancialSnapshot> {
    let Some(fields) = body.as_object() else {
        bail!("Unexpected Alpha Vantage response for {}: not a JSON object", entity);
    };

    if let Some(msg) = fields.get("Error Message").and_then(Value::as_str) {
        bail!("Alpha Vantage rejected {}: {}", entity, msg);
    }
    // Rate-limit and premium notices come back as 200s
    for notice in ["Note", "Information"] {
        if let Some(msg) = fields.get(notice).and_then(Value::as_str) {
            bail!("Alpha Vantage returned no data for {}: {}", entity, msg);
        }
    }
    if fields.is_empty() {
        bail!("Alpha Vantage has no overview for {} (unknown symbol?)", entity);
    }

    let mut ratios = Vec::new();
    for (field, ratio) in FIELD_MAP {
        match fields.get(*field).and_then(parse_number) {
            Some(value) => ratios.push((ratio.to_string(), value)),
            None => tracing::debug!(%entity, field, "ratio not available"),
        }
    }

    let as_of = fields
        .get("LatestQuarter")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(fetched_at);

    Ok(FinancialSnapshot::new(entity.clone(), as_of, ratios))
}

/// Alpha Vantage sends numbers as strings and uses "None" / "-" for gaps
fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

use anyhow::{anyhow, Context, Result};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, RetryIf};

use super::cache::{cache_key, ResponseCache};

const USER_AGENT: &str = concat!("cred-score/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared HTTP access for the data sources: retries, timeouts and the response cache.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    cache: ResponseCache,
}

impl HttpFetcher {
    pub fn new(cache: ResponseCache) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, cache })
    }

    /// GET a JSON document and parse it, serving it from the cache while fresh.
    ///
    /// A body is only cached once `parse` accepts it, so error payloads sent
    /// with a 200 status (rate-limit notices) are never replayed from disk.
    pub async fn get_parsed<T, F>(&self, url: Url, parse: F) -> Result<T>
    where
        F: FnOnce(&serde_json::Value) -> Result<T>,
    {
        let key = cache_key(&url);
        if let Some(body) = self.cache.get(&key) {
            tracing::debug!(url = %key, "cache hit");
            return parse(&body);
        }

        // Retry strategy: exponential backoff, up to 3 retries on transient failures
        let retry_strategy = ExponentialBackoff::from_millis(100)
            .max_delay(Duration::from_secs(5))
            .take(3);

        let http = &self.http;
        let body = RetryIf::spawn(
            retry_strategy,
            || {
                let request = http.get(url.clone());
                async move {
                    request
                        .send()
                        .await?
                        .error_for_status()?
                        .json::<serde_json::Value>()
                        .await
                }
            },
            is_transient,
        )
        .await
        .map_err(|e| describe_error(&key, e))?;

        tracing::debug!(url = %key, "fetched");
        let parsed = parse(&body)?;
        if let Err(e) = self.cache.put(&key, &body) {
            tracing::warn!(error = %e, "failed to write response cache");
        }

        Ok(parsed)
    }
}

/// Client errors (bad key, rate limit) will not change on an immediate retry
fn is_transient(e: &reqwest::Error) -> bool {
    e.status().map_or(true, is_transient_status)
}

fn is_transient_status(status: StatusCode) -> bool {
    !status.is_client_error()
}

/// Turn transport errors into messages a user can act on. The key-stripped
/// URL is used so secrets never reach the logs.
fn describe_error(url: &str, e: reqwest::Error) -> anyhow::Error {
    match e.status() {
        Some(status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)) => {
            anyhow!("API key rejected by {} (HTTP {})", host_of(url), status.as_u16())
        }
        Some(StatusCode::TOO_MANY_REQUESTS) => {
            anyhow!("Rate limit exceeded at {}. Wait a minute and try again.", host_of(url))
        }
        Some(status) => anyhow!("HTTP {} from {}", status, url),
        None if e.is_timeout() => anyhow!("Request to {} timed out", host_of(url)),
        None if e.is_decode() => anyhow!("Response from {} was not valid JSON", host_of(url)),
        None => anyhow!("Network error talking to {}: {}", host_of(url), e.without_url()),
    }
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

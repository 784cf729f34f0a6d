use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Query parameters that carry API keys and must never reach a cache key
const SECRET_PARAMS: &[&str] = &["apikey", "api_key", "token"];

/// Get the platform-appropriate cache directory for cred-score
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("cred-score/http-cache"))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/.cache/cred-score/http-cache",
                std::env::var("HOME").unwrap_or_default()
            ))
        })
}

/// Clear the HTTP cache directory
pub fn clear_cache(cache_path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(cache_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

/// Cache key for a request URL, with API key parameters removed
pub fn cache_key(url: &Url) -> String {
    let mut keyed = url.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !SECRET_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        keyed.set_query(None);
    } else {
        keyed.query_pairs_mut().clear().extend_pairs(kept);
    }
    keyed.to_string()
}

/// On-disk entry: the parsed JSON body and when it was fetched
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    fetched_at: DateTime<Utc>,
    body: serde_json::Value,
}

/// TTL-bounded response cache backed by cacache.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    cache_path: PathBuf,
    ttl: Duration,
    enabled: bool,
}

impl ResponseCache {
    pub fn new(cache_path: PathBuf, ttl: Duration) -> Self {
        Self {
            cache_path,
            ttl,
            enabled: true,
        }
    }

    /// A cache that never hits and never writes (--no-cache)
    pub fn disabled() -> Self {
        Self {
            cache_path: PathBuf::new(),
            ttl: Duration::ZERO,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return a cached body if present and younger than the TTL
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.get_at(key, Utc::now())
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<serde_json::Value> {
        if !self.enabled {
            return None;
        }
        let bytes = cacache::read_sync(&self.cache_path, key).ok()?;
        let entry: CachedResponse = serde_json::from_slice(&bytes).ok()?;
        if is_fresh(entry.fetched_at, now, self.ttl) {
            Some(entry.body)
        } else {
            tracing::debug!(key, "cache entry expired");
            None
        }
    }

    pub fn put(&self, key: &str, body: &serde_json::Value) -> Result<()> {
        self.put_at(key, body, Utc::now())
    }

    fn put_at(&self, key: &str, body: &serde_json::Value, now: DateTime<Utc>) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let entry = CachedResponse {
            fetched_at: now,
            body: body.clone(),
        };
        let json = serde_json::to_vec(&entry)?;
        cacache::write_sync(&self.cache_path, key, &json)
            .with_context(|| format!("Failed to write cache entry {}", key))?;
        Ok(())
    }
}

fn is_fresh(fetched_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - fetched_at).to_std() {
        Ok(age) => age < ttl,
        // fetched_at in the future: clock moved backwards, treat as stale
        Err(_) => false,
    }
}

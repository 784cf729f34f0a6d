pub mod prompt;

use std::fmt;
use thiserror::Error;

use crate::config::ApiKeys;

/// Environment variable holding the Alpha Vantage API key
pub const ENV_ALPHA_VANTAGE_KEY: &str = "CRED_SCORE_ALPHA_VANTAGE_KEY";
/// Environment variable holding the NewsAPI key
pub const ENV_NEWS_API_KEY: &str = "CRED_SCORE_NEWS_API_KEY";

pub use prompt::{prompt_for_key, resolve_credentials};

/// Upstream data services that need a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    AlphaVantage,
    NewsApi,
}

impl Service {
    pub fn env_var(&self) -> &'static str {
        match self {
            Service::AlphaVantage => ENV_ALPHA_VANTAGE_KEY,
            Service::NewsApi => ENV_NEWS_API_KEY,
        }
    }

    pub fn signup_url(&self) -> &'static str {
        match self {
            Service::AlphaVantage => "https://www.alphavantage.co/support/#api-key",
            Service::NewsApi => "https://newsapi.org/register",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::AlphaVantage => f.write_str("Alpha Vantage"),
            Service::NewsApi => f.write_str("NewsAPI"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0} API key not found (set {env} or api_keys in the config file)", env = .0.env_var())]
    Missing(Service),
    #[error("failed to read {0} API key: {1}")]
    Prompt(Service, String),
}

/// Resolved API keys. Debug output never shows the key material.
#[derive(Clone)]
pub struct ApiCredentials {
    pub alpha_vantage: String,
    pub news_api: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("alpha_vantage", &"<redacted>")
            .field("news_api", &"<redacted>")
            .finish()
    }
}

/// Read a key from the environment. Returns None when unset or blank.
pub fn get_key_from_env(service: Service) -> Option<String> {
    non_blank(std::env::var(service.env_var()).ok())
}

/// Environment first, then the config file
pub fn lookup_key(service: Service, configured: &ApiKeys) -> Option<String> {
    get_key_from_env(service).or_else(|| {
        let from_config = match service {
            Service::AlphaVantage => configured.alpha_vantage.clone(),
            Service::NewsApi => configured.news_api.clone(),
        };
        non_blank(from_config)
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  key ".to_string())), Some("key".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_lookup_key_falls_back_to_config() {
        // The NewsAPI variable is left alone here so the test does not race the env
        let configured = ApiKeys {
            alpha_vantage: None,
            news_api: Some(" from-config ".to_string()),
        };
        if get_key_from_env(Service::NewsApi).is_none() {
            assert_eq!(
                lookup_key(Service::NewsApi, &configured),
                Some("from-config".to_string())
            );
        }
    }

    #[test]
    fn test_missing_error_names_env_var() {
        let err = CredentialError::Missing(Service::AlphaVantage);
        let msg = err.to_string();
        assert!(msg.contains("Alpha Vantage"));
        assert!(msg.contains(ENV_ALPHA_VANTAGE_KEY));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let creds = ApiCredentials {
            alpha_vantage: "secret-av".to_string(),
            news_api: "secret-news".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("secret"));
    }
}

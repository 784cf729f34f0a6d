pub mod init;
mod schema;

pub use schema::{ApiKeys, Config, NewsConfig};

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::scoring::validate_scoring;

/// Get the config directory path (~/.config/cred-score/)
pub fn get_config_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".config").join("cred-score"))
        .unwrap_or_else(|| PathBuf::from(".cred-score"))
}

/// Get the default config file path (~/.config/cred-score/config.yaml)
pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.yaml")
}

/// Load configuration from a YAML file
///
/// # Arguments
///
/// * `path` - Optional path to config file. If None, uses the default path
///   (~/.config/cred-score/config.yaml), and a missing default file yields
///   the built-in defaults.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly given config file does not exist
/// - The config file cannot be read
/// - The YAML cannot be parsed
pub fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let explicit = path.is_some();
    let config_path = path.unwrap_or_else(get_config_path);

    if !config_path.exists() {
        if explicit {
            anyhow::bail!("Config file not found at {}", config_path.display());
        }
        tracing::debug!(path = %config_path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let config_content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;

    parse_config(&config_content)
        .with_context(|| format!("Failed to parse config: invalid YAML in {}", config_path.display()))
}

/// Parse configuration from YAML text
pub fn parse_config(yaml: &str) -> Result<Config> {
    let config: Config = serde_saphyr::from_str(yaml)?;
    Ok(config)
}

/// Validate the whole config: scoring weights plus the duration and news settings.
/// Returns all validation errors at once.
pub fn validate_config(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if let Err(scoring_errors) = validate_scoring(&config.effective_scoring()) {
        errors.extend(scoring_errors);
    }

    if let Err(e) = humantime::parse_duration(&config.cache_ttl) {
        errors.push(format!("cache_ttl: invalid duration '{}' - {}", config.cache_ttl, e));
    }
    if let Err(e) = humantime::parse_duration(&config.news.lookback) {
        errors.push(format!(
            "news.lookback: invalid duration '{}' - {}",
            config.news.lookback, e
        ));
    }
    if !(1..=100).contains(&config.news.page_size) {
        errors.push(format!(
            "news.page_size: {} is outside 1..=100",
            config.news.page_size
        ));
    }
    for (i, ticker) in config.tickers.iter().enumerate() {
        if ticker.trim().is_empty() {
            errors.push(format!("tickers[{}]: must not be empty", i));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("{}").unwrap();
        assert!(config.tickers.is_empty());
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.news.page_size, 20);
        assert_eq!(config.news.lookback(), Duration::from_secs(7 * 86400));
        assert_eq!(config.effective_scoring(), crate::scoring::ScoringConfig::default());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_full_config_parse() {
        let yaml = r#"
tickers: [NVDA, msft]
cache_ttl: 30m
scoring:
  factors:
    - name: debt_to_equity
      weight: 0.5
      normalize: "minmax(0, 3)"
      direction: lower_is_better
      default: 1.0
    - name: sentiment
      weight: 0.5
      normalize: "minmax(-1, 1)"
news:
  page_size: 50
  language: de
  lookback: 3d
api_keys:
  alpha_vantage: av-key
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.tickers, vec!["NVDA", "msft"]);
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.effective_scoring().factors.len(), 2);
        assert_eq!(config.news.language, "de");
        assert_eq!(config.api_keys.alpha_vantage.as_deref(), Some("av-key"));
        assert!(config.api_keys.news_api.is_none());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        assert!(parse_config("queries: []").is_err());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let yaml = r#"
tickers: ["  "]
cache_ttl: soon
scoring:
  factors:
    - name: debt_ratio
      weight: 0.5
      normalize: "minmax(0, 3)"
    - name: sentiment
      weight: 0.3
      normalize: "minmax(-1, 1)"
news:
  page_size: 0
  lookback: forever
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("weights sum"));
        assert!(errors.iter().any(|e| e.starts_with("cache_ttl")));
        assert!(errors.iter().any(|e| e.starts_with("news.lookback")));
        assert!(errors.iter().any(|e| e.starts_with("news.page_size")));
        assert!(errors.iter().any(|e| e.starts_with("tickers[0]")));
    }

    #[test]
    fn test_load_missing_explicit_path_errors() {
        let missing = std::env::temp_dir().join("cred_score_test_missing_config.yaml");
        let _ = std::fs::remove_file(&missing);
        assert!(load_config(Some(missing)).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join("cred_score_test_config.yaml");
        std::fs::write(&path, "tickers: [AAPL]\n").unwrap();
        let config = load_config(Some(path.clone())).unwrap();
        assert_eq!(config.tickers, vec!["AAPL"]);
        let _ = std::fs::remove_file(&path);
    }
}

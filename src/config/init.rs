use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::config::{get_config_path, ApiKeys, Config, NewsConfig};
use crate::scoring::{validate_scoring, FactorConfig, Normalization, ScoringConfig};

/// Prompt user with a message and return their trimmed input.
fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut input = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read input")?;
    Ok(input.trim().to_string())
}

/// Prompt user with a message and a default value. Returns default if input is empty.
fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let input = prompt(&format!("{} [{}]: ", message, default))?;
    if input.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(input)
    }
}

/// Prompt user with a yes/no question. Returns bool based on input and default.
fn prompt_yes_no(message: &str, default_yes: bool) -> Result<bool> {
    let hint = if default_yes { "Y/n" } else { "y/N" };
    let input = prompt(&format!("{} [{}]: ", message, hint))?.to_lowercase();
    if input.is_empty() {
        Ok(default_yes)
    } else {
        Ok(input == "y" || input == "yes")
    }
}

/// Split a comma or whitespace separated ticker list, upper-cased
fn parse_ticker_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse a weight answer as either a fraction ("0.3") or a percentage ("30%").
fn parse_weight(input: &str) -> Result<f64, String> {
    let input = input.trim();
    let value = if let Some(pct) = input.strip_suffix('%') {
        pct.trim()
            .parse::<f64>()
            .map(|v| v / 100.0)
            .map_err(|e| e.to_string())?
    } else {
        input.parse::<f64>().map_err(|e| e.to_string())?
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} is outside [0, 1]", value));
    }
    Ok(value)
}

/// Ask for each factor's weight and normalization until the set validates.
fn prompt_factors(defaults: &ScoringConfig) -> Result<ScoringConfig> {
    loop {
        let mut factors = Vec::with_capacity(defaults.factors.len());
        for factor in &defaults.factors {
            println!();
            println!("Factor '{}' ({:?})", factor.name, factor.direction);

            let weight = loop {
                let input = prompt_with_default("  Weight", &factor.weight.to_string())?;
                match parse_weight(&input) {
                    Ok(w) => break w,
                    Err(e) => println!("  Invalid: {}. Try again.", e),
                }
            };

            let normalize = loop {
                let input = prompt_with_default("  Normalization", &factor.normalize)?;
                match Normalization::parse(&input) {
                    Ok(_) => break input,
                    Err(e) => println!("  Invalid: {}. Try again.", e),
                }
            };

            factors.push(FactorConfig {
                weight,
                normalize,
                ..factor.clone()
            });
        }

        let scoring = ScoringConfig { factors };
        match validate_scoring(&scoring) {
            Ok(()) => return Ok(scoring),
            Err(errors) => {
                println!();
                println!("Those weights do not work:");
                for error in errors {
                    println!("  - {}", error);
                }
                println!("Let's go through the factors again.");
            }
        }
    }
}

/// Run the interactive init wizard to create a config file.
///
/// If `default_path` is Some, uses that as the suggested config file path.
pub fn run_init_wizard(default_path: Option<PathBuf>) -> Result<()> {
    println!();
    println!("cred-score configuration wizard");
    println!("===============================");
    println!();

    // 1. Watchlist
    println!("Tickers listed here are scored when you run `cred-score score` with no arguments.");
    let tickers = parse_ticker_list(&prompt_with_default("Watchlist (comma separated)", "NVDA, MSFT, AAPL")?);

    // 2. Scoring
    println!();
    println!("Every score is a weighted sum of normalized factors. Weights must add up to 1.0.");
    let defaults = ScoringConfig::default();
    let scoring = if prompt_yes_no("Customize factor weights? (n accepts defaults)", false)? {
        Some(prompt_factors(&defaults)?)
    } else {
        None
    };

    // 3. News window
    println!();
    let lookback = loop {
        let input = prompt_with_default("News lookback window", "7d")?;
        match humantime::parse_duration(&input) {
            Ok(_) => break input,
            Err(e) => println!("  Invalid: {}. Try again.", e),
        }
    };

    // 4. API keys (env vars are preferred)
    println!();
    println!(
        "API keys can come from {} and {}, or be stored in the config file.",
        crate::credentials::ENV_ALPHA_VANTAGE_KEY,
        crate::credentials::ENV_NEWS_API_KEY
    );
    let api_keys = if prompt_yes_no("Store API keys in the config file?", false)? {
        let alpha_vantage = prompt("  Alpha Vantage key (blank to skip): ")?;
        let news_api = prompt("  NewsAPI key (blank to skip): ")?;
        ApiKeys {
            alpha_vantage: Some(alpha_vantage).filter(|k| !k.is_empty()),
            news_api: Some(news_api).filter(|k| !k.is_empty()),
        }
    } else {
        ApiKeys::default()
    };

    // 5. Config path
    let default_config_path = default_path.unwrap_or_else(get_config_path);
    println!();
    let path_str = prompt_with_default(
        "Where should the config be saved?",
        &default_config_path.display().to_string(),
    )?;
    let config_path = PathBuf::from(&path_str);

    if config_path.exists() {
        let overwrite = prompt_yes_no(
            &format!("Config already exists at {}. Overwrite?", config_path.display()),
            false,
        )?;
        if !overwrite {
            println!("Aborted.");
            return Ok(());
        }
    }

    let config = Config {
        tickers,
        scoring,
        news: NewsConfig {
            lookback,
            ..NewsConfig::default()
        },
        api_keys,
        ..Config::default()
    };

    let yaml = serde_saphyr::to_string(&config)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(&config_path, &yaml)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    println!();
    println!("Config written to {}", config_path.display());
    println!("Run `cred-score score` to get started.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticker_list() {
        assert_eq!(
            parse_ticker_list("nvda, msft  aapl,,"),
            vec!["NVDA", "MSFT", "AAPL"]
        );
        assert!(parse_ticker_list("  ").is_empty());
    }

    #[test]
    fn test_parse_weight_fraction_and_percent() {
        assert_eq!(parse_weight("0.3"), Ok(0.3));
        assert_eq!(parse_weight("25%"), Ok(0.25));
        assert!(parse_weight("1.5").is_err());
        assert!(parse_weight("-10%").is_err());
        assert!(parse_weight("lots").is_err());
    }

    #[test]
    fn test_wizard_config_serializes_and_parses_back() {
        let config = Config {
            tickers: vec!["NVDA".to_string()],
            scoring: Some(ScoringConfig::default()),
            ..Config::default()
        };
        let yaml = serde_saphyr::to_string(&config).unwrap();
        let parsed = crate::config::parse_config(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}

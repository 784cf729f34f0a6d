use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use cred_score::config::Config;
use cred_score::credentials::CredentialError;
use cred_score::error::ScoringError;
use cred_score::fetch::{assess, collect_and_score, Assessment};
use cred_score::model::{CreditScore, EntityId, SentimentSignal};
use cred_score::sources::{
    AlphaVantageClient, FixtureProvider, HttpFetcher, NewsApiClient, ResponseCache,
    SentimentProvider, SnapshotProvider,
};

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_INVALID_INPUT: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score tickers, best first (default if no subcommand)
    Score {
        /// Tickers to score (defaults to the config watchlist)
        tickers: Vec<String>,
    },
    /// Score one ticker and show how every factor contributed
    Explain {
        ticker: String,
    },
    /// Show recorded scores for a ticker
    History {
        ticker: String,
        /// Number of most recent points to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Print the effective weighting configuration
    Weights,
    /// Interactive setup wizard
    Init,
    /// Manage the HTTP response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Remove all cached responses
    Clear,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Tsv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "cred-score")]
#[command(about = "Explainable credit scores from financial ratios and news sentiment", long_about = None)]
#[command(version)]
#[command(after_help = "Exit codes: 0 success, 1 credentials, 2 network or data source \
(HTTP failures, API error payloads), 3 invalid input (bad tickers, fixture gaps, \
unusable ratios), 4 configuration")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/cred-score/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Bypass the HTTP response cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Do not record scores in the history file
    #[arg(long, global = true)]
    no_history: bool,

    /// Read snapshots and sentiment from a YAML/JSON file instead of the live APIs
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// JSON shape for `explain`
#[derive(Serialize)]
struct Explanation<'a> {
    score: &'a CreditScore,
    sentiment: &'a SentimentSignal,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "cred_score=debug,warn" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Map a failure to its exit code by looking through the error chain
fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(scoring) = cause.downcast_ref::<ScoringError>() {
            return match scoring {
                ScoringError::InvalidInput(_) => EXIT_INVALID_INPUT,
                ScoringError::Configuration(_) => EXIT_CONFIG,
            };
        }
        if cause.downcast_ref::<CredentialError>().is_some() {
            return EXIT_AUTH;
        }
    }
    EXIT_NETWORK
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let mut cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.take().unwrap_or(Commands::Score {
        tickers: Vec::new(),
    });
    let config_path = cli.config.clone().map(PathBuf::from);

    // Commands that do not need a valid config
    match &command {
        Commands::Init => {
            if let Err(e) = cred_score::config::init::run_init_wizard(config_path) {
                eprintln!("Init failed: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Cache {
            action: CacheAction::Clear,
        } => {
            let cache_path = cred_score::sources::get_cache_path();
            if let Err(e) = cred_score::sources::clear_cache(&cache_path) {
                eprintln!("Failed to clear cache: {:#}", e);
                std::process::exit(EXIT_CONFIG);
            }
            println!("Cache cleared ({})", cache_path.display());
            std::process::exit(EXIT_SUCCESS);
        }
        _ => {}
    }

    // Load config
    let config = match cred_score::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    // Validate everything (weights included) before any network access
    if let Err(errors) = cred_score::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }
    let scoring = config.effective_scoring();

    match &command {
        Commands::Weights => {
            let output = match cli.format {
                OutputFormat::Json => match cred_score::output::format_json(&scoring) {
                    Ok(json) => json,
                    Err(e) => {
                        eprintln!("{:#}", e);
                        std::process::exit(EXIT_CONFIG);
                    }
                },
                _ => cred_score::output::format_weights(&scoring),
            };
            println!("{}", output);
        }
        Commands::History { ticker, limit } => {
            let entity = EntityId::new(ticker);
            if entity.is_empty() {
                eprintln!("Ticker must not be empty.");
                std::process::exit(EXIT_INVALID_INPUT);
            }
            let history =
                match cred_score::history::load_history(&cred_score::history::get_history_path()) {
                    Ok(h) => h,
                    Err(e) => {
                        eprintln!("History error: {:#}", e);
                        std::process::exit(EXIT_CONFIG);
                    }
                };
            let points = history.trend(&entity, *limit);
            let output = match cli.format {
                OutputFormat::Json => cred_score::output::format_json(points),
                OutputFormat::Tsv => Ok(points
                    .iter()
                    .map(|p| format!("{}\t{:.1}", p.computed_at.to_rfc3339(), p.score))
                    .collect::<Vec<_>>()
                    .join("\n")),
                OutputFormat::Table => Ok(cred_score::output::format_trend(
                    &entity,
                    points,
                    cred_score::output::should_use_colors(),
                )),
            };
            match output {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("{:#}", e);
                    std::process::exit(EXIT_CONFIG);
                }
            }
        }
        Commands::Score { .. } | Commands::Explain { .. } => {
            let code = match &cli.fixtures {
                Some(path) => {
                    let provider = match FixtureProvider::load(path) {
                        Ok(p) => p,
                        Err(e) => {
                            eprintln!("Fixture error: {:#}", e);
                            std::process::exit(EXIT_INVALID_INPUT);
                        }
                    };
                    tracing::debug!(entities = provider.entities().len(), "loaded fixtures");
                    run_scoring(&cli, &command, &config, &provider, &provider).await
                }
                None => {
                    // Resolve credentials (prompts on a terminal when missing)
                    let keys = match cred_score::credentials::resolve_credentials(&config.api_keys)
                    {
                        Ok(k) => k,
                        Err(e) => {
                            eprintln!("Credential error: {}", e);
                            std::process::exit(EXIT_AUTH);
                        }
                    };

                    let cache = if cli.no_cache {
                        ResponseCache::disabled()
                    } else {
                        ResponseCache::new(cred_score::sources::get_cache_path(), config.cache_ttl())
                    };
                    let fetcher = match HttpFetcher::new(cache) {
                        Ok(f) => f,
                        Err(e) => {
                            eprintln!("Failed to create HTTP client: {:#}", e);
                            std::process::exit(EXIT_NETWORK);
                        }
                    };

                    let snapshots = AlphaVantageClient::new(fetcher.clone(), keys.alpha_vantage);
                    let news = NewsApiClient::new(fetcher, keys.news_api, config.news.clone());
                    run_scoring(&cli, &command, &config, &snapshots, &news).await
                }
            };
            std::process::exit(code);
        }
        // Handled before the config was loaded
        Commands::Init | Commands::Cache { .. } => {}
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Score the requested tickers with the given providers, print, and record history.
/// Returns the process exit code.
async fn run_scoring<S, N>(
    cli: &Cli,
    command: &Commands,
    config: &Config,
    snapshots: &S,
    news: &N,
) -> i32
where
    S: SnapshotProvider,
    N: SentimentProvider,
{
    let start_time = Instant::now();
    let scoring = config.effective_scoring();
    let use_colors = cred_score::output::should_use_colors();
    let now = Utc::now();

    let assessments: Vec<Assessment> = match command {
        Commands::Explain { ticker } => {
            let entity = EntityId::new(ticker);
            if entity.is_empty() {
                eprintln!("Ticker must not be empty.");
                return EXIT_INVALID_INPUT;
            }
            match assess(&entity, snapshots, news, &scoring, now).await {
                Ok(a) => vec![a],
                Err(e) => {
                    eprintln!("Failed to score {}: {:#}", entity, e);
                    return exit_code_for(&e);
                }
            }
        }
        Commands::Score { tickers } => {
            let tickers = if tickers.is_empty() {
                config.tickers.clone()
            } else {
                tickers.clone()
            };
            if tickers.is_empty() {
                eprintln!("No tickers given and no watchlist configured.");
                eprintln!("Pass tickers (cred-score score NVDA MSFT) or add them to ~/.config/cred-score/config.yaml:");
                eprintln!("  tickers: [NVDA, MSFT]");
                return EXIT_CONFIG;
            }

            match collect_and_score(&tickers, snapshots, news, &scoring, now).await {
                Ok(outcome) => {
                    // Partial failure: report and keep going
                    for (entity, e) in &outcome.failures {
                        eprintln!("Failed to score {}: {:#}", entity, e);
                    }
                    outcome.assessments
                }
                Err(e) => {
                    eprintln!("{:#}", e);
                    return exit_code_for(&e);
                }
            }
        }
        _ => return EXIT_SUCCESS,
    };

    let output = match (command, cli.format) {
        (Commands::Explain { .. }, OutputFormat::Json) => {
            let a = &assessments[0];
            cred_score::output::format_json(&Explanation {
                score: &a.score,
                sentiment: &a.sentiment,
            })
        }
        (Commands::Explain { .. }, OutputFormat::Table) => {
            let a = &assessments[0];
            Ok(cred_score::output::format_breakdown(
                &a.score,
                &a.sentiment,
                use_colors,
            ))
        }
        (_, format) => {
            let scores: Vec<&CreditScore> = assessments.iter().map(|a| &a.score).collect();
            match format {
                OutputFormat::Json => cred_score::output::format_json(&scores),
                OutputFormat::Tsv => Ok(cred_score::output::format_tsv(&scores)),
                OutputFormat::Table => Ok(cred_score::output::format_score_table(
                    &scores, use_colors,
                )),
            }
        }
    };

    match output {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_CONFIG;
        }
    }

    if !cli.no_history {
        record_history(&assessments);
    }

    tracing::info!(
        count = assessments.len(),
        elapsed = ?start_time.elapsed(),
        "done"
    );
    EXIT_SUCCESS
}

/// Append scores to the history file. Failures are logged, never fatal.
fn record_history(assessments: &[Assessment]) {
    let path = cred_score::history::get_history_path();
    let mut history = match cred_score::history::load_history(&path) {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "not recording history");
            return;
        }
    };
    for assessment in assessments {
        history.record(&assessment.score);
    }
    if let Err(e) = cred_score::history::save_history(&path, &history) {
        tracing::warn!(error = %format!("{:#}", e), "failed to save history");
    }
}

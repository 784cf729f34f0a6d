use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::IsTerminal;
use terminal_size::{terminal_size, Width};

use crate::history::HistoryPoint;
use crate::model::{CreditScore, EntityId, RatingBand, SentimentSignal, Signal, ValueSource};
use crate::scoring::{Direction, ScoringConfig};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Scores are shown with one decimal
pub fn format_score(score: f64) -> String {
    format!("{:.1}", score)
}

fn signal_marker(signal: Signal) -> &'static str {
    match signal {
        Signal::Positive => "+",
        Signal::Neutral => "=",
        Signal::Negative => "-",
    }
}

fn source_marker(source: ValueSource) -> &'static str {
    match source {
        ValueSource::Observed => "",
        ValueSource::Default => "(default)",
        ValueSource::Neutral => "(neutral)",
        ValueSource::Clamped => "(clamped)",
    }
}

fn colored_band(band: RatingBand, text: &str) -> String {
    match band {
        RatingBand::Strong => text.green().to_string(),
        RatingBand::Moderate => text.yellow().to_string(),
        RatingBand::Weak => text.red().to_string(),
    }
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate text to fit available width, accounting for Unicode
fn truncate(text: &str, max_width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_width {
        text.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format scores as a table: index, ticker, score, band, top driver.
/// No headers. Rows are printed in the order given.
pub fn format_score_table(scores: &[&CreditScore], use_colors: bool) -> String {
    if scores.is_empty() {
        return "No scores to show.".to_string();
    }

    let ticker_width = scores
        .iter()
        .map(|s| s.entity().as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max(6);
    let score_width = 5;
    let band_width = 8;
    let separator = "  ";
    let fixed_width = 3 + 1 + ticker_width + score_width + band_width + separator.len() * 3;
    let term_width = get_terminal_width();

    scores
        .iter()
        .enumerate()
        .map(|(idx, score)| {
            let index_str = format!("{:>2}.", idx + 1);
            let ticker = format!("{:<width$}", score.entity(), width = ticker_width);
            let score_str = format!("{:>width$}", format_score(score.score()), width = score_width);
            let band = score.band();
            let band_str = format!("{:<width$}", band.as_str(), width = band_width);

            let driver = match score.breakdown().top_driver() {
                Some(row) => format!(
                    "{} {} ({})",
                    signal_marker(row.signal),
                    row.name,
                    format_score(row.contribution)
                ),
                None => String::new(),
            };
            let driver = match term_width {
                Some(width) if width > fixed_width + 10 => truncate(&driver, width - fixed_width),
                Some(_) => truncate(&driver, 20),
                None => driver,
            };

            let line = if use_colors {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str.dimmed(),
                    ticker.cyan(),
                    separator,
                    score_str.bold(),
                    separator,
                    colored_band(band, &band_str),
                    separator,
                    driver.dimmed()
                )
            } else {
                format!(
                    "{} {}{}{}{}{}{}{}",
                    index_str, ticker, separator, score_str, separator, band_str, separator, driver
                )
            };
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the full explanation for one score.
pub fn format_breakdown(
    score: &CreditScore,
    sentiment: &SentimentSignal,
    use_colors: bool,
) -> String {
    let mut lines = Vec::new();

    let header = format!("{}  {}", score.entity(), format_score(score.score()));
    let band = format!("({})", score.band());
    if use_colors {
        lines.push(format!(
            "{}  {}",
            header.bold(),
            colored_band(score.band(), &band)
        ));
    } else {
        lines.push(format!("{}  {}", header, band));
    }
    lines.push(format!("  as of {}", score.computed_at().format("%Y-%m-%d %H:%M UTC")));
    lines.push(String::new());

    let name_width = score
        .breakdown()
        .rows()
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(6);

    let column_header = format!(
        "    {:<nw$}  {:>9} {:<9}  {:>5}  {:>6}  {:>7}",
        "factor",
        "raw",
        "",
        "norm",
        "weight",
        "contrib",
        nw = name_width
    );
    if use_colors {
        lines.push(column_header.dimmed().to_string());
    } else {
        lines.push(column_header);
    }

    for row in score.breakdown().rows() {
        let marker = signal_marker(row.signal);
        let marker = if use_colors {
            match row.signal {
                Signal::Positive => marker.green().to_string(),
                Signal::Negative => marker.red().to_string(),
                Signal::Neutral => marker.dimmed().to_string(),
            }
        } else {
            marker.to_string()
        };
        lines.push(format!(
            "  {} {:<nw$}  {:>9.2} {:<9}  {:>5.2}  {:>5.0}%  {:>7.1}",
            marker,
            row.name,
            row.raw_value,
            source_marker(row.source),
            row.normalized,
            row.weight * 100.0,
            row.contribution,
            nw = name_width
        ));
    }

    lines.push(format!(
        "    {:<nw$}  {:>9} {:<9}  {:>5}  {:>6}  {:>7.1}",
        "total",
        "",
        "",
        "",
        "",
        score.breakdown().total(),
        nw = name_width
    ));
    lines.push(String::new());

    if sentiment.headline_count() == 0 {
        lines.push("Sentiment: no recent headlines".to_string());
    } else {
        let window = sentiment
            .window()
            .map(|w| format!(" over {}", humantime::format_duration(w)))
            .unwrap_or_default();
        lines.push(format!(
            "Sentiment: {:+.2} from {} headline{}{}",
            sentiment.value(),
            sentiment.headline_count(),
            if sentiment.headline_count() == 1 { "" } else { "s" },
            window
        ));
    }
    if let Some(headline) = sentiment.top_headline() {
        lines.push(format!("Top headline: {}", headline));
    }

    lines.join("\n")
}

/// Tab-separated `ticker score band` for scripting (no headers, no colors)
pub fn format_tsv(scores: &[&CreditScore]) -> String {
    scores
        .iter()
        .map(|s| format!("{}\t{}\t{}", s.entity(), format_score(s.score()), s.band()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty JSON of anything serializable (scores, breakdowns, configs)
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output as JSON")
}

/// Format a score trend, oldest first, with the change from the previous point
pub fn format_trend(entity: &EntityId, points: &[HistoryPoint], use_colors: bool) -> String {
    if points.is_empty() {
        return format!("No score history for {}.", entity);
    }

    let mut lines = vec![format!(
        "{} score trend ({} point{})",
        entity,
        points.len(),
        if points.len() == 1 { "" } else { "s" }
    )];

    let mut previous: Option<f64> = None;
    for point in points {
        let when = point.computed_at.format("%Y-%m-%d %H:%M");
        let score = format!("{:>5}", format_score(point.score));
        let delta = match previous {
            Some(prev) => {
                let change = point.score - prev;
                let text = format!("{:+.1}", change);
                if !use_colors || change.abs() < 0.05 {
                    text
                } else if change > 0.0 {
                    text.green().to_string()
                } else {
                    text.red().to_string()
                }
            }
            None => String::new(),
        };
        lines.push(format!("  {}  {}  {}", when, score, delta).trim_end().to_string());
        previous = Some(point.score);
    }

    lines.join("\n")
}

/// Format the effective weighting configuration
pub fn format_weights(config: &ScoringConfig) -> String {
    let name_width = config
        .factors
        .iter()
        .map(|f| f.name.chars().count())
        .max()
        .unwrap_or(0)
        .max(6);

    let mut lines: Vec<String> = config
        .factors
        .iter()
        .map(|f| {
            let direction = match f.direction {
                Direction::HigherIsBetter => "higher is better",
                Direction::LowerIsBetter => "lower is better",
            };
            let default = f
                .default
                .map(|d| format!("  default {}", d))
                .unwrap_or_default();
            format!(
                "{:<nw$}  {:>5.1}%  {:<16}  {}{}",
                f.name,
                f.weight * 100.0,
                f.normalize,
                direction,
                default,
                nw = name_width
            )
        })
        .collect();
    lines.push(format!(
        "{:<nw$}  {:>5.1}%",
        "total",
        config.weight_sum() * 100.0,
        nw = name_width
    ));
    lines.join("\n")
}

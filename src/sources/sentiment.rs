//! Lexicon-based headline sentiment.
//!
//! Each headline is scored by averaging the polarity of the words it shares
//! with a small finance lexicon. A negator ("not", "no", "never") flips and
//! damps the next scored word, and an intensifier ("sharply", "very") scales
//! it. The per-entity signal is the mean over all headlines, including those
//! that matched nothing.

use std::collections::HashMap;
use std::time::Duration;

use crate::model::{EntityId, SentimentSignal};

/// Multiplier applied to a word preceded by a negator
const NEGATION_FACTOR: f64 = -0.5;

const LEXICON: &[(&str, f64)] = &[
    // positive
    ("beat", 0.6),
    ("beats", 0.6),
    ("boost", 0.5),
    ("boosts", 0.5),
    ("breakthrough", 0.7),
    ("bullish", 0.7),
    ("exceed", 0.6),
    ("exceeds", 0.6),
    ("expand", 0.4),
    ("expands", 0.4),
    ("expansion", 0.4),
    ("gain", 0.5),
    ("gains", 0.5),
    ("good", 0.7),
    ("great", 0.8),
    ("growth", 0.5),
    ("jump", 0.5),
    ("jumps", 0.5),
    ("optimistic", 0.6),
    ("outperform", 0.6),
    ("positive", 0.5),
    ("profit", 0.5),
    ("profitable", 0.6),
    ("profits", 0.5),
    ("rallies", 0.6),
    ("rally", 0.6),
    ("record", 0.5),
    ("rise", 0.4),
    ("rises", 0.4),
    ("robust", 0.6),
    ("soar", 0.8),
    ("soars", 0.8),
    ("strong", 0.6),
    ("success", 0.7),
    ("successful", 0.7),
    ("surge", 0.7),
    ("surges", 0.7),
    ("upgrade", 0.6),
    ("upgraded", 0.6),
    ("win", 0.6),
    ("wins", 0.6),
    // negative
    ("bad", -0.7),
    ("bankrupt", -1.0),
    ("bankruptcy", -1.0),
    ("bearish", -0.7),
    ("concern", -0.4),
    ("concerns", -0.4),
    ("crash", -0.9),
    ("crashes", -0.9),
    ("cut", -0.4),
    ("cuts", -0.4),
    ("decline", -0.5),
    ("declines", -0.5),
    ("default", -0.9),
    ("defaults", -0.9),
    ("delay", -0.4),
    ("delays", -0.4),
    ("downgrade", -0.6),
    ("downgraded", -0.6),
    ("drop", -0.5),
    ("drops", -0.5),
    ("fall", -0.5),
    ("falls", -0.5),
    ("fear", -0.6),
    ("fears", -0.6),
    ("fined", -0.6),
    ("fraud", -1.0),
    ("halt", -0.5),
    ("halts", -0.5),
    ("investigation", -0.5),
    ("lawsuit", -0.6),
    ("layoff", -0.6),
    ("layoffs", -0.6),
    ("loss", -0.6),
    ("losses", -0.6),
    ("miss", -0.6),
    ("misses", -0.6),
    ("negative", -0.5),
    ("penalty", -0.6),
    ("plunge", -0.8),
    ("plunges", -0.8),
    ("poor", -0.6),
    ("probe", -0.5),
    ("recall", -0.5),
    ("risk", -0.3),
    ("risks", -0.3),
    ("scandal", -0.9),
    ("sink", -0.6),
    ("sinks", -0.6),
    ("slowdown", -0.5),
    ("slump", -0.7),
    ("slumps", -0.7),
    ("sues", -0.6),
    ("tumble", -0.7),
    ("tumbles", -0.7),
    ("volatile", -0.3),
    ("warn", -0.5),
    ("warning", -0.5),
    ("warns", -0.5),
    ("weak", -0.6),
    ("worst", -1.0),
];

const NEGATORS: &[&str] = &["not", "no", "never", "without", "isn't", "won't", "can't", "didn't", "doesn't"];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("sharply", 1.5),
    ("very", 1.3),
    ("strongly", 1.3),
    ("significantly", 1.3),
    ("slightly", 0.5),
    ("somewhat", 0.7),
];

/// Score of a single headline
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineScore {
    pub headline: String,
    pub polarity: f64,
}

/// Finance-oriented lexicon sentiment analyzer.
#[derive(Debug, Clone)]
pub struct HeadlineSentiment {
    lexicon: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
}

impl Default for HeadlineSentiment {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlineSentiment {
    pub fn new() -> Self {
        Self {
            lexicon: LEXICON.iter().copied().collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
        }
    }

    /// Polarity of one headline in [-1, 1]; 0.0 when no lexicon word matches.
    pub fn polarity(&self, headline: &str) -> f64 {
        let mut scores = Vec::new();
        let mut negate = false;
        let mut intensity = 1.0;

        for word in tokenize(headline) {
            if NEGATORS.contains(&word.as_str()) {
                negate = true;
                continue;
            }
            if let Some(&scale) = self.intensifiers.get(word.as_str()) {
                intensity *= scale;
                continue;
            }
            if let Some(&polarity) = self.lexicon.get(word.as_str()) {
                let mut value = polarity * intensity;
                if negate {
                    value *= NEGATION_FACTOR;
                }
                scores.push(value.clamp(-1.0, 1.0));
            }
            // Modifiers only reach the next word
            negate = false;
            intensity = 1.0;
        }

        if scores.is_empty() {
            0.0
        } else {
            (scores.iter().sum::<f64>() / scores.len() as f64).clamp(-1.0, 1.0)
        }
    }

    pub fn score_headlines<S: AsRef<str>>(&self, headlines: &[S]) -> Vec<HeadlineScore> {
        headlines
            .iter()
            .map(|h| HeadlineScore {
                headline: h.as_ref().to_string(),
                polarity: self.polarity(h.as_ref()),
            })
            .collect()
    }

    /// Aggregate headlines into a signal. No headlines give a neutral signal.
    pub fn aggregate<S: AsRef<str>>(
        &self,
        entity: &EntityId,
        headlines: &[S],
        window: Duration,
    ) -> SentimentSignal {
        let scored = self.score_headlines(headlines);
        if scored.is_empty() {
            return SentimentSignal::neutral(entity.clone()).with_window(window);
        }

        let mean = scored.iter().map(|s| s.polarity).sum::<f64>() / scored.len() as f64;

        // First headline wins ties
        let mut top = &scored[0];
        for candidate in &scored[1..] {
            if candidate.polarity.abs() > top.polarity.abs() {
                top = candidate;
            }
        }

        SentimentSignal::new(entity.clone(), mean, scored.len() as u32)
            .with_window(window)
            .with_top_headline(top.headline.clone())
    }
}

/// Lower-cased words, keeping inner apostrophes ("isn't")
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
}

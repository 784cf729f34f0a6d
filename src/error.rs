use thiserror::Error;

/// Errors surfaced by the scoring engine.
///
/// Both variants are returned to the caller as-is. Scoring is deterministic,
/// so nothing here is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Malformed or mismatched input entities
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Weighting configuration failed validation (all problems, not just the first)
    #[error("invalid weighting configuration: {}", .0.join("; "))]
    Configuration(Vec<String>),
}

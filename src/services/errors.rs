// Error Taxonomy
// Call-level failures surfaced by the analysis core and the boundary layer.
// Per-provider failures live in providers.rs and never escape the engine.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShieldError {
    #[error("Unknown detection strategy: {0}")]
    UnknownStrategy(String),
    #[error("Invalid weights for strategy '{strategy}': {reason}")]
    InvalidStrategyWeights { strategy: String, reason: String },
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Boundary-layer request validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content is required and must be a string")]
    Empty,
    #[error("Content must be {max} characters or less")]
    TooLong { max: usize },
    #[error("Content must be at least {min} characters long for meaningful analysis")]
    TooShort { min: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationError::TooLong { max: 5000 }.to_string(),
            "Content must be 5000 characters or less"
        );
        assert_eq!(
            ValidationError::TooShort { min: 10 }.to_string(),
            "Content must be at least 10 characters long for meaningful analysis"
        );
    }
}

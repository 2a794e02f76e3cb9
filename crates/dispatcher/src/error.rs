//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Blacklist pattern that does not compile
    #[error("invalid blacklist pattern '{pattern}' for collector '{collector}': {source}")]
    InvalidPattern {
        collector: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl DispatcherError {
    /// Create an invalid pattern error
    pub fn invalid_pattern(
        collector: impl Into<String>,
        pattern: impl Into<String>,
        source: regex::Error,
    ) -> Self {
        Self::InvalidPattern {
            collector: collector.into(),
            pattern: pattern.into(),
            source,
        }
    }
}

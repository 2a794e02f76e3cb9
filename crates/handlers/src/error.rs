//! Handler error types

use thiserror::Error;

/// Handler-specific errors
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler creation error
    #[error("failed to create handler '{name}': {message}")]
    Creation { name: String, message: String },
}

impl HandlerError {
    /// Create a handler creation error
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Creation {
            name: name.into(),
            message: message.into(),
        }
    }
}

//! Layered error definitions
//!
//! Categorized by source: config / collector / handler

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Collector Errors =====
    /// Unknown collector kind
    #[error("unknown collector kind '{kind}' for collector '{name}'")]
    UnknownCollector { name: String, kind: String },

    /// Collector construction error
    #[error("collector '{name}' setup error: {message}")]
    CollectorSetup { name: String, message: String },

    // ===== Handler Errors =====
    /// Handler write error
    #[error("handler '{handler}' write error: {message}")]
    HandlerWrite { handler: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create collector setup error
    pub fn collector_setup(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CollectorSetup {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create handler write error
    pub fn handler_write(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerWrite {
            handler: handler.into(),
            message: message.into(),
        }
    }
}

//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// HTTP listener could not be bound
    #[error("Failed to listen on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Handler could not be created
    #[error("Failed to start handler: {0}")]
    Handler(#[from] handlers::HandlerError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn listen(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Listen {
            addr: addr.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CliError::config_not_found("agent.toml");
        assert_eq!(err.to_string(), "Configuration file not found: agent.toml");

        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err = CliError::listen("127.0.0.1:19090", io);
        assert!(err.to_string().contains("127.0.0.1:19090"));
    }
}

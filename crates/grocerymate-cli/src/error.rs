//! Error types for the CLI

use grocerymate_e2e::E2eError;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Smoke probe failed against the storefront
    #[error("Smoke check failed: {message}")]
    SmokeFailed {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Suite library error
    #[error("Suite error: {0}")]
    Suite(#[from] E2eError),

    /// Output serialization error
    #[error("Output error: {message}")]
    Output {
        /// Error message
        message: String,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a smoke failure
    #[must_use]
    pub fn smoke_failed(message: impl Into<String>) -> Self {
        Self::SmokeFailed {
            message: message.into(),
        }
    }

    /// Create an output error
    #[must_use]
    pub fn output(message: impl Into<String>) -> Self {
        Self::Output {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::output(e.to_string())
    }
}

impl From<serde_yaml_ng::Error> for CliError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::output(e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_smoke_failed_error() {
        let err = CliError::smoke_failed("no h1");
        assert_eq!(err.to_string(), "Smoke check failed: no h1");
    }

    #[test]
    fn test_suite_error_from() {
        let err: CliError = E2eError::config("base_url must be an http(s) URL").into();
        assert!(matches!(err, CliError::Suite(_)));
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(cli_err.to_string().contains("I/O"));
    }

    #[test]
    fn test_json_error_becomes_output() {
        let json_err = serde_json::from_str::<u32>("x").unwrap_err();
        assert!(matches!(CliError::from(json_err), CliError::Output { .. }));
    }
}

//! Result and error types for the GroceryMate suite.

use std::time::Duration;
use thiserror::Error;

/// Result type for suite operations
pub type E2eResult<T> = Result<T, E2eError>;

/// Errors raised by waits, page objects and drivers
#[derive(Debug, Error)]
pub enum E2eError {
    /// A wait never saw its predicate satisfied
    #[error("Timed out after {}ms waiting for {description} (last outcome: {last_outcome})", .elapsed.as_millis())]
    Timeout {
        /// What was being waited for
        description: String,
        /// Time spent polling
        elapsed: Duration,
        /// Outcome of the final predicate evaluation
        last_outcome: String,
    },

    /// DOM text did not have the expected shape
    #[error("Could not parse {what} from {raw:?}")]
    Parse {
        /// Value being extracted
        what: &'static str,
        /// Raw observed text
        raw: String,
    },

    /// Caller passed an out-of-range argument
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message
        message: String,
    },

    /// The UI rejected the action by a business rule
    #[error("Not allowed: {message}")]
    NotAllowed {
        /// Error message
        message: String,
    },

    /// Element detached or went stale between lookup and action
    #[error("Transient interaction failure on {target}: {message}")]
    TransientInteraction {
        /// Locator name
        target: String,
        /// Error message
        message: String,
    },

    /// A transient failure that outlived its retry budget
    #[error("Interaction with {target} failed after {attempts} attempts: {message}")]
    InteractionFailed {
        /// Locator name
        target: String,
        /// Attempts made
        attempts: u32,
        /// Last error message
        message: String,
    },

    /// Browser or automation-server launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Driver-level protocol error
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Settings could not be resolved
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// No locator registered under the requested name
    #[error("No locator named {name:?} for page {page}")]
    MissingLocator {
        /// Page scope
        page: String,
        /// Locator name
        name: String,
    },

    /// Cart clearing hit its pass or time bound
    #[error("Cart cleanup gave up after {passes} passes with {remaining} items left")]
    CleanupExhausted {
        /// Passes attempted
        passes: u32,
        /// Remove controls still present
        remaining: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl E2eError {
    /// Create a parse error
    #[must_use]
    pub fn parse(what: &'static str, raw: impl Into<String>) -> Self {
        Self::Parse {
            what,
            raw: raw.into(),
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a not-allowed error
    #[must_use]
    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::NotAllowed {
            message: message.into(),
        }
    }

    /// Create a transient interaction error
    #[must_use]
    pub fn transient(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientInteraction {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether a polling loop may treat this as "not yet satisfied"
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::TransientInteraction { .. })
    }

    /// Whether this is a wait timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_carries_last_outcome() {
        let err = E2eError::Timeout {
            description: "toast".to_string(),
            elapsed: Duration::from_millis(1500),
            last_outcome: "not satisfied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1500ms"));
        assert!(msg.contains("toast"));
        assert!(msg.contains("not satisfied"));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_parse_error_shows_raw_text() {
        let err = E2eError::parse("review count", "42 reviews");
        assert_eq!(
            err.to_string(),
            "Could not parse review count from \"42 reviews\""
        );
    }

    #[test]
    fn test_only_transient_interaction_is_transient() {
        assert!(E2eError::transient("cart.remove", "detached").is_transient());
        assert!(!E2eError::not_allowed("already reviewed").is_transient());
        assert!(!E2eError::invalid_input("0 stars").is_transient());
        assert!(!E2eError::driver("socket closed").is_transient());
    }
}

//! Result and error types for Pagehand.

use thiserror::Error;

/// Result type for Pagehand operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while dispatching, locating or waiting
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Neither the driver nor any registered candidate supports the operation
    #[error("No driver or page object supports operation `{operation}`")]
    CapabilityNotFound {
        /// Requested operation name
        operation: String,
    },

    /// More than one candidate supports the operation (strict resolution only)
    #[error("Operation `{operation}` is ambiguous between: {}", candidates.join(", "))]
    AmbiguousCapability {
        /// Requested operation name
        operation: String,
        /// Matching candidates, in registration order
        candidates: Vec<String>,
    },

    /// A polled target did not become ready in time
    #[error("Timed out after {elapsed_ms}ms waiting for {target}")]
    WaitTimeout {
        /// Description of the awaited target
        target: String,
        /// Time spent polling
        elapsed_ms: u64,
        /// Last retryable error seen while polling, if the final attempts
        /// failed rather than reporting "not ready"
        last_error: Option<String>,
    },

    /// A wait target was neither an operation nor a locator
    #[error("Unsupported wait target: {target}")]
    UnsupportedWaitTarget {
        /// Description of the rejected target
        target: String,
    },

    /// Lookup returned no elements
    #[error("No element found by {by} `{value}`")]
    ElementNotFound {
        /// Identifier kind
        by: String,
        /// Identifier value
        value: String,
    },

    /// Duplicate-index lookup was outside the result set
    #[error("Index {index} out of range for {len} matching elements")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of elements found
        len: usize,
    },

    /// Operation was called with arguments it cannot use
    #[error("Invalid arguments for `{operation}`: {message}")]
    InvalidArguments {
        /// Operation name
        operation: String,
        /// Error message
        message: String,
    },

    /// A value had a different shape than the caller required
    #[error("Expected {expected}, got {found}")]
    UnexpectedValue {
        /// Expected shape
        expected: &'static str,
        /// Actual value kind
        found: String,
    },

    /// A candidate page object could not be built
    #[error("Failed to build page object {candidate}: {message}")]
    CandidateConstruction {
        /// Candidate type name
        candidate: String,
        /// Error message
        message: String,
    },

    /// Error reported by the underlying driver
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Harness configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
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

    /// Create a capability-not-found error
    #[must_use]
    pub fn not_found(operation: impl Into<String>) -> Self {
        Self::CapabilityNotFound {
            operation: operation.into(),
        }
    }

    /// Whether a poll loop should treat this error as "not ready yet"
    /// rather than a failure of the step.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::IndexOutOfRange { .. } | Self::Driver { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_not_found_names_operation() {
        let err = HarnessError::not_found("card_body");
        assert_eq!(
            err.to_string(),
            "No driver or page object supports operation `card_body`"
        );
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = HarnessError::AmbiguousCapability {
            operation: "submit".to_string(),
            candidates: vec!["LoginPage".to_string(), "SignupPage".to_string()],
        };
        assert!(err.to_string().contains("LoginPage, SignupPage"));
    }

    #[test]
    fn test_wait_timeout_message() {
        let err = HarnessError::WaitTimeout {
            target: "operation `banner`".to_string(),
            elapsed_ms: 120,
            last_error: None,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 120ms waiting for operation `banner`"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HarnessError::ElementNotFound {
            by: "id".to_string(),
            value: "x".to_string()
        }
        .is_retryable());
        assert!(HarnessError::IndexOutOfRange { index: 2, len: 1 }.is_retryable());
        assert!(HarnessError::driver("stale element").is_retryable());
        assert!(!HarnessError::not_found("x").is_retryable());
        assert!(!HarnessError::config("bad").is_retryable());
    }

    #[test]
    fn test_io_conversion() {
        let err: HarnessError = std::io::Error::other("disk full").into();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}

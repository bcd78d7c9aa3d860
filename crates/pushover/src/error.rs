//! Error types for Pushover API operations.
//!
//! Errors are categorized so callers can tell "the API said no" apart from
//! "the API could not be asked". Only network failures are considered
//! retryable; this crate itself never retries.

use std::fmt;

/// Result type alias for Pushover operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Pushover errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The API answered with a non-success status.
    Rejected,
    /// The round trip could not be completed.
    Network,
    /// The API answered with something that is not a Pushover response.
    Format,
    /// The request was malformed before it was sent.
    Request,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Rejected => "Rejected by Pushover",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected response format",
            Self::Request => "Invalid request",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Rejected => "Check the API token and keys named in the error messages",
            Self::Network => "Check your internet connection and try again",
            Self::Format => "The API may be degraded, try again later",
            Self::Request => "Fix the request arguments and try again",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the Pushover API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The API returned `status != 1`.
    #[error("pushover API error: {}", join_errors(.errors))]
    Rejected {
        /// Raw status value reported by the API.
        status: i64,
        /// Request identifier, when the API returned one.
        request: Option<String>,
        /// Diagnostic messages, verbatim.
        errors: Vec<String>,
    },

    /// HTTP round trip failed.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Request arguments were rejected locally.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn join_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        "no diagnostic messages returned".to_string()
    } else {
        errors.join("; ")
    }
}

impl Error {
    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Rejected { .. } => ErrorCategory::Rejected,
            Error::Http { .. } => ErrorCategory::Network,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::InvalidRequest(_) => ErrorCategory::Request,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Diagnostic messages reported by the API, if this is a rejection.
    #[must_use]
    pub fn remote_messages(&self) -> &[String] {
        match self {
            Error::Rejected { errors, .. } => errors,
            _ => &[],
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Http {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Http {
                message: other.to_string(),
                status: None,
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

//! Error types for Smallstep API operations.
//!
//! Errors are categorized so callers can decide whether an operation is
//! worth retrying and what to tell the user.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for Smallstep API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (transient, retryable).
    Network,
    /// Credentials rejected or token exchange failed.
    Auth,
    /// Invalid provider configuration.
    Config,
    /// Malformed request or response payload.
    Format,
    /// Other/unknown errors.
    Other,
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
            Self::Network => "Network connectivity issue",
            Self::Auth => "Authentication failed",
            Self::Config => "Invalid configuration",
            Self::Format => "Invalid payload",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check connectivity to the Smallstep API and try again",
            Self::Auth => "Verify the API token or client certificate and team ID",
            Self::Config => "Review the provider configuration",
            Self::Format => "The API returned an unexpected payload, check the API version",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the Smallstep API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message.
        message: String,
        /// HTTP status code if available.
        status: Option<u16>,
    },

    /// Server URL could not be parsed.
    #[error("invalid server URL {url:?}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// Team ID is not a UUID.
    #[error("invalid team ID {0:?}: must be a UUID")]
    InvalidTeamId(String),

    /// Client certificate or key could not be loaded.
    #[error("invalid client certificate: {0}")]
    InvalidCertificate(String),

    /// Token exchange was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Invalid response from API.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Request payload could not be encoded.
    #[error("failed to encode {what}: {message}")]
    Encoding {
        /// What was being encoded.
        what: String,
        /// Encoder message.
        message: String,
    },

    /// IO error during file operations.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }

    /// Create an encoding error.
    pub fn encoding(what: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Encoding {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Http { .. } => ErrorCategory::Network,
            Error::InvalidUrl { .. } => ErrorCategory::Config,
            Error::InvalidTeamId(_) => ErrorCategory::Config,
            Error::InvalidCertificate(_) => ErrorCategory::Config,
            Error::Auth(_) => ErrorCategory::Auth,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Encoding { .. } => ErrorCategory::Format,
            Error::Io { .. } => ErrorCategory::Other,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
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

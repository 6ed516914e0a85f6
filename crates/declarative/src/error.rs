//! Error types for value conversion and state bookkeeping.

use crate::value::{AttrPath, PathStep};

/// Result type alias for declarative operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while converting or navigating attribute values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value had a different kind than the model expected.
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Where the mismatch happened.
        path: AttrPath,
        /// Kind the model expected.
        expected: &'static str,
        /// Kind that was found.
        found: &'static str,
    },

    /// A null value reached a position that cannot hold null.
    #[error("{path}: unexpected null value")]
    UnexpectedNull {
        /// Where the null was found.
        path: AttrPath,
    },

    /// An unknown value reached a position that cannot hold unknown.
    #[error("{path}: unexpected unknown value")]
    UnexpectedUnknown {
        /// Where the unknown was found.
        path: AttrPath,
    },

    /// A path could not be written.
    #[error("cannot set {path}: {reason}")]
    InvalidPath {
        /// Target path.
        path: AttrPath,
        /// Why the write failed.
        reason: String,
    },

    /// Private state bytes must be valid JSON.
    #[error("private state for key {key:?} is not valid JSON: {source}")]
    InvalidPrivateState {
        /// Private state key.
        key: String,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Prefix the error path with a parent step.
    ///
    /// Conversions report errors relative to the value being converted;
    /// object conversions call this to turn them into absolute paths.
    #[must_use]
    pub fn within(self, step: PathStep) -> Self {
        match self {
            Self::TypeMismatch {
                path,
                expected,
                found,
            } => Self::TypeMismatch {
                path: path.prefixed(step),
                expected,
                found,
            },
            Self::UnexpectedNull { path } => Self::UnexpectedNull {
                path: path.prefixed(step),
            },
            Self::UnexpectedUnknown { path } => Self::UnexpectedUnknown {
                path: path.prefixed(step),
            },
            Self::InvalidPath { path, reason } => Self::InvalidPath {
                path: path.prefixed(step),
                reason,
            },
            other @ Self::InvalidPrivateState { .. } => other,
        }
    }

    /// The attribute path this error refers to, if any.
    pub fn path(&self) -> Option<&AttrPath> {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::UnexpectedNull { path }
            | Self::UnexpectedUnknown { path }
            | Self::InvalidPath { path, .. } => Some(path),
            Self::InvalidPrivateState { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_prefixes_path() {
        let err = Error::UnexpectedNull {
            path: AttrPath::root("common_name"),
        }
        .within(PathStep::Attr("x509".to_string()))
        .within(PathStep::Attr("certificate".to_string()));

        assert_eq!(
            err.path().map(ToString::to_string).as_deref(),
            Some("certificate.x509.common_name")
        );
    }

    #[test]
    fn test_display_mentions_kinds() {
        let err = Error::TypeMismatch {
            path: AttrPath::root("name"),
            expected: "string",
            found: "bool",
        };
        let display = err.to_string();
        assert!(display.contains("name"));
        assert!(display.contains("string"));
        assert!(display.contains("bool"));
    }
}

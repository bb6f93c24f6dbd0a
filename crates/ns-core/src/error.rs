//! Core error types for node-session

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the node-session ecosystem
#[derive(Error, Debug)]
pub enum NsError {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Catalog error
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised at the command transport boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The node reported a domain-specific failure
    #[error("Node error {code}: {message}")]
    Node { code: i64, message: String },

    /// Non-success HTTP status without a structured node error body
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The node answered with something that could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The command did not complete in time
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// A command was issued before the node was started
    #[error("Node has not been started")]
    NotStarted,

    /// Any other failure (connection refused, I/O, ...)
    #[error("{0}")]
    Other(String),
}

/// A failure carrying enough detail to render a user-facing message.
///
/// Produced from startup and fetch failures. Node-reported errors keep their
/// code and message; everything else collapses into a generic description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedError {
    /// Domain-specific failure reported by the node
    #[error("{full_description}")]
    StructuredNode {
        code: i64,
        message: String,
        full_description: String,
    },

    /// System-level, decode-level, or unexpected failure
    #[error("{description}")]
    Generic { description: String },
}

impl ClassifiedError {
    /// Build a structured node error, deriving the full description
    pub fn structured(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let full_description = format!("{} (node error code {})", message, code);
        Self::StructuredNode {
            code,
            message,
            full_description,
        }
    }

    /// Build a generic error
    pub fn generic(description: impl Into<String>) -> Self {
        Self::Generic {
            description: description.into(),
        }
    }

    /// Text suitable for showing to the user
    pub fn description(&self) -> &str {
        match self {
            Self::StructuredNode {
                full_description, ..
            } => full_description,
            Self::Generic { description } => description,
        }
    }

    /// Whether this error was reported by the node itself
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::StructuredNode { .. })
    }
}

impl From<TransportError> for ClassifiedError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Node { code, message } => Self::structured(code, message),
            other => Self::generic(other.to_string()),
        }
    }
}

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Operation attempted before the session reached Ready
    #[error("Node session is not ready")]
    NotReady,

    /// `start()` was called more than once
    #[error("Node session has already been started")]
    AlreadyStarted,

    /// Startup failed; the session is terminal
    #[error("Node session failed: {0}")]
    Failed(ClassifiedError),
}

/// Errors returned synchronously when triggering a fetch
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    /// Node session is not ready
    #[error("Node session is not ready")]
    NotReady,

    /// Another fetch is still outstanding
    #[error("A fetch is already in progress")]
    Busy,

    /// There is nothing to fetch
    #[error("Catalog is empty")]
    EmptyCatalog,
}

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog file not found
    #[error("Catalog file not found: {0}")]
    NotFound(PathBuf),

    /// Catalog file could not be read
    #[error("Failed to read catalog: {0}")]
    Read(#[from] std::io::Error),

    /// JSON parse error
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_classified_as_structured() {
        let err = TransportError::Node {
            code: 0,
            message: "merkledag: not found".to_string(),
        };
        let classified = ClassifiedError::from(err);

        assert!(classified.is_structured());
        match &classified {
            ClassifiedError::StructuredNode {
                code,
                message,
                full_description,
            } => {
                assert_eq!(*code, 0);
                assert_eq!(message, "merkledag: not found");
                assert!(full_description.contains("merkledag: not found"));
                assert!(full_description.contains("code 0"));
            }
            other => panic!("unexpected classification: {:?}", other),
        }
    }

    #[test]
    fn test_other_errors_classified_as_generic() {
        let classified = ClassifiedError::from(TransportError::Other(
            "connection refused".to_string(),
        ));
        assert_eq!(
            classified,
            ClassifiedError::generic("connection refused")
        );

        let classified = ClassifiedError::from(TransportError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        });
        assert!(!classified.is_structured());
        assert!(classified.description().contains("502"));
    }

    #[test]
    fn test_classified_display_matches_description() {
        let err = ClassifiedError::structured(3, "context deadline exceeded");
        assert_eq!(err.to_string(), err.description());
    }
}

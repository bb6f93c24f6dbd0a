//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ClassifiedError;

/// Opaque content identifier addressing a piece of content on the node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    /// Create a new content ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of the started node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Peer ID reported by the node's `id` command
    pub peer_id: String,
}

impl Identity {
    /// Create a new identity
    pub fn new(peer_id: impl Into<String>) -> Self {
        Self {
            peer_id: peer_id.into(),
        }
    }
}

/// Number of peers the node is currently connected to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerCount {
    pub count: u64,
}

impl PeerCount {
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

impl fmt::Display for PeerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count)
    }
}

/// Lifecycle of a node session.
///
/// Moves strictly forward: `Uninitialized -> Starting -> Ready | Failed`.
/// Both `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// `start()` has not been called
    #[default]
    Uninitialized,
    /// Node startup and identity retrieval are in progress
    Starting,
    /// Node is running; carries the identity retrieved at startup
    Ready(Identity),
    /// Startup failed
    Failed(ClassifiedError),
}

impl SessionState {
    /// Whether the session reached Ready
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Ready(_) | SessionState::Failed(_))
    }

    /// Identity, if Ready
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Ready(identity) => Some(identity),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Ready(_) => write!(f, "ready"),
            SessionState::Failed(_) => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_terminal() {
        assert!(!SessionState::Uninitialized.is_terminal());
        assert!(!SessionState::Starting.is_terminal());
        assert!(SessionState::Ready(Identity::new("Qm123")).is_terminal());
        assert!(SessionState::Failed(ClassifiedError::generic("boom")).is_terminal());
    }

    #[test]
    fn test_session_state_identity() {
        let state = SessionState::Ready(Identity::new("Qm123"));
        assert!(state.is_ready());
        assert_eq!(state.identity().map(|i| i.peer_id.as_str()), Some("Qm123"));
        assert_eq!(SessionState::Starting.identity(), None);
    }

    #[test]
    fn test_content_id_serializes_transparently() {
        let cid = ContentId::new("QmXYZ");
        assert_eq!(serde_json::to_string(&cid).unwrap(), r#""QmXYZ""#);
        assert_eq!(format!("{}", cid), "QmXYZ");
    }
}

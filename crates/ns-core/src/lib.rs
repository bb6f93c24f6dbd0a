//! ns-core: Core abstractions and configuration for node-session
//!
//! This crate provides shared types, the error taxonomy, the command
//! transport boundary, catalog loading, and configuration structures used by
//! the session orchestrator and the CLI.

pub mod catalog;
pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use catalog::{Catalog, CatalogEntry};
pub use error::{
    CatalogError, ClassifiedError, ConfigError, FetchError, NsError, SessionError, TransportError,
};
pub use traits::{parse_identity, parse_peer_count, CommandTransport, NodeCommand};
pub use types::{ContentId, Identity, PeerCount, SessionState};

//! Core trait definitions

mod transport;

pub use transport::{parse_identity, parse_peer_count, CommandTransport, NodeCommand};

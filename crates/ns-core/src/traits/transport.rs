//! Command transport boundary

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use std::fmt;

use crate::error::TransportError;
use crate::types::{ContentId, Identity};

/// Commands issued against the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeCommand {
    /// Node identity (`ID`, addresses, ...)
    Id,
    /// Currently connected peers
    SwarmPeers,
    /// Node version, used as a liveness probe
    Version,
    /// Raw content addressed by a content identifier
    Cat(ContentId),
}

impl NodeCommand {
    /// Command name as understood by the node's RPC surface
    pub fn name(&self) -> &'static str {
        match self {
            NodeCommand::Id => "id",
            NodeCommand::SwarmPeers => "swarm/peers",
            NodeCommand::Version => "version",
            NodeCommand::Cat(_) => "cat",
        }
    }

    /// Query arguments for the command
    pub fn args(&self) -> Vec<(&'static str, String)> {
        match self {
            NodeCommand::Cat(cid) => vec![("arg", cid.to_string())],
            _ => vec![],
        }
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for (i, (key, value)) in self.args().iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}

/// Executes commands against an embedded or local node.
///
/// Implementations must be safe to call from several tasks at once; the
/// session orchestrator issues peer-count queries and content fetches
/// concurrently.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Bring the node up. Called exactly once per process.
    async fn start(&self) -> Result<(), TransportError>;

    /// Run a command and decode its key/value result
    async fn command_json(&self, command: &NodeCommand) -> Result<Value, TransportError>;

    /// Run a command and return its raw output
    async fn command_raw(&self, command: &NodeCommand) -> Result<Bytes, TransportError>;
}

/// Extract the node identity from an `id` command result
pub fn parse_identity(value: &Value) -> Result<Identity, TransportError> {
    value
        .get("ID")
        .and_then(Value::as_str)
        .map(Identity::new)
        .ok_or_else(|| {
            TransportError::InvalidResponse("identity response is missing the ID field".to_string())
        })
}

/// Extract a peer count from a connectivity query result.
///
/// Accepts either a bare integer or an object with a `Peers` array; a null
/// `Peers` entry (no connections) counts as zero.
pub fn parse_peer_count(value: &Value) -> Result<u64, TransportError> {
    if let Some(count) = value.as_u64() {
        return Ok(count);
    }

    match value.get("Peers") {
        Some(Value::Array(peers)) => Ok(peers.len() as u64),
        Some(Value::Null) => Ok(0),
        _ => Err(TransportError::InvalidResponse(format!(
            "unexpected peer count response: {}",
            value
        ))),
    }
}

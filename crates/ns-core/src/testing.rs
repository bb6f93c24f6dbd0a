//! Scriptable in-memory transport for tests
//!
//! Only available in tests or with the `test-utils` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::error::TransportError;
use crate::traits::{CommandTransport, NodeCommand};
use crate::types::ContentId;

#[derive(Default, Clone, Copy)]
struct CallStats {
    total: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// A `CommandTransport` whose answers are scripted up front.
///
/// Commands issued before `start()` fail with `TransportError::NotStarted`.
/// Every call is counted per command name together with the highest number
/// of concurrent calls observed.
pub struct ScriptedTransport {
    start_result: Result<(), TransportError>,
    start_delay: Duration,
    identity: Result<Value, TransportError>,
    peer_default: Result<u64, TransportError>,
    peer_script: Mutex<VecDeque<Result<u64, TransportError>>>,
    peer_delay: Duration,
    content: HashMap<ContentId, Result<Bytes, TransportError>>,
    cat_delay: Duration,
    started: AtomicBool,
    stats: Mutex<HashMap<&'static str, CallStats>>,
}

impl ScriptedTransport {
    /// A transport that starts, reports identity `QmTestPeer`, and sees no peers
    pub fn new() -> Self {
        Self {
            start_result: Ok(()),
            start_delay: Duration::ZERO,
            identity: Ok(json!({ "ID": "QmTestPeer" })),
            peer_default: Ok(0),
            peer_script: Mutex::new(VecDeque::new()),
            peer_delay: Duration::ZERO,
            content: HashMap::new(),
            cat_delay: Duration::ZERO,
            started: AtomicBool::new(false),
            stats: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_identity(mut self, peer_id: &str) -> Self {
        self.identity = Ok(json!({ "ID": peer_id, "Addresses": [] }));
        self
    }

    pub fn with_identity_response(mut self, response: Result<Value, TransportError>) -> Self {
        self.identity = response;
        self
    }

    pub fn with_start_error(mut self, err: TransportError) -> Self {
        self.start_result = Err(err);
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Peer count returned once the scripted responses run out
    pub fn with_peer_count(mut self, count: u64) -> Self {
        self.peer_default = Ok(count);
        self
    }

    /// Queue a one-off peer query answer
    pub fn push_peer_response(self, response: Result<u64, TransportError>) -> Self {
        if let Ok(mut script) = self.peer_script.lock() {
            script.push_back(response);
        }
        self
    }

    pub fn with_peer_delay(mut self, delay: Duration) -> Self {
        self.peer_delay = delay;
        self
    }

    pub fn with_content(mut self, cid: &str, bytes: impl Into<Bytes>) -> Self {
        self.content.insert(ContentId::new(cid), Ok(bytes.into()));
        self
    }

    pub fn with_content_error(mut self, cid: &str, err: TransportError) -> Self {
        self.content.insert(ContentId::new(cid), Err(err));
        self
    }

    pub fn with_cat_delay(mut self, delay: Duration) -> Self {
        self.cat_delay = delay;
        self
    }

    /// Total calls issued for a command name (e.g. `"swarm/peers"`)
    pub fn calls(&self, name: &str) -> usize {
        self.stat(name).total
    }

    /// Highest number of simultaneous calls seen for a command name
    pub fn max_in_flight(&self, name: &str) -> usize {
        self.stat(name).max_in_flight
    }

    /// Whether `start()` has completed successfully
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    fn stat(&self, name: &str) -> CallStats {
        self.stats
            .lock()
            .ok()
            .and_then(|stats| stats.get(name).copied())
            .unwrap_or_default()
    }

    fn enter(&self, name: &'static str) -> InFlight<'_> {
        if let Ok(mut stats) = self.stats.lock() {
            let entry = stats.entry(name).or_default();
            entry.total += 1;
            entry.in_flight += 1;
            entry.max_in_flight = entry.max_in_flight.max(entry.in_flight);
        }
        InFlight {
            transport: self,
            name,
        }
    }

    fn ensure_started(&self) -> Result<(), TransportError> {
        if self.is_started() {
            Ok(())
        } else {
            Err(TransportError::NotStarted)
        }
    }

    fn next_peer_response(&self) -> Result<u64, TransportError> {
        self.peer_script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.peer_default.clone())
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when a call finishes or is dropped
struct InFlight<'a> {
    transport: &'a ScriptedTransport,
    name: &'static str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut stats) = self.transport.stats.lock() {
            if let Some(entry) = stats.get_mut(self.name) {
                entry.in_flight = entry.in_flight.saturating_sub(1);
            }
        }
    }
}

#[async_trait]
impl CommandTransport for ScriptedTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let _call = self.enter("start");
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        self.start_result.clone()?;
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn command_json(&self, command: &NodeCommand) -> Result<Value, TransportError> {
        let _call = self.enter(command.name());
        self.ensure_started()?;

        match command {
            NodeCommand::Id => self.identity.clone(),
            NodeCommand::Version => Ok(json!({ "Version": "0.0.0-scripted" })),
            NodeCommand::SwarmPeers => {
                if !self.peer_delay.is_zero() {
                    tokio::time::sleep(self.peer_delay).await;
                }
                let count = self.next_peer_response()?;
                let peers: Vec<Value> = (0..count)
                    .map(|i| json!({ "Peer": format!("peer-{}", i) }))
                    .collect();
                Ok(json!({ "Peers": peers }))
            }
            NodeCommand::Cat(_) => Err(TransportError::InvalidResponse(
                "cat returns raw bytes".to_string(),
            )),
        }
    }

    async fn command_raw(&self, command: &NodeCommand) -> Result<Bytes, TransportError> {
        let _call = self.enter(command.name());
        self.ensure_started()?;

        match command {
            NodeCommand::Cat(cid) => {
                if !self.cat_delay.is_zero() {
                    tokio::time::sleep(self.cat_delay).await;
                }
                self.content.get(cid).cloned().unwrap_or_else(|| {
                    Err(TransportError::Node {
                        code: 0,
                        message: format!("merkledag: not found ({})", cid),
                    })
                })
            }
            other => Err(TransportError::InvalidResponse(format!(
                "{} has no raw output",
                other
            ))),
        }
    }
}

//! Node session state
//!
//! `NodeSession` owns one controller, one poller, and one fetch coordinator
//! wired to the same transport. It is constructed once per process and
//! handed to the consumer; there is no global instance.

use std::sync::Arc;

use ns_core::config::SessionConfig;
use ns_core::{Catalog, CommandTransport};

use crate::controller::SessionController;
use crate::fetch::FetchCoordinator;
use crate::poller::PeerCountPoller;

/// Everything a consumer needs to drive a node session
pub struct NodeSession {
    /// Configuration
    pub config: SessionConfig,
    /// Startup, identity, and lifecycle state
    pub controller: SessionController,
    /// Peer count telemetry
    pub peers: PeerCountPoller,
    /// Content fetches
    pub fetcher: FetchCoordinator,
}

impl NodeSession {
    /// Create an unstarted session
    pub fn new(config: SessionConfig, transport: Arc<dyn CommandTransport>, catalog: Catalog) -> Self {
        let controller = SessionController::new(transport);
        let peers = PeerCountPoller::from_config(controller.clone(), &config);
        let fetcher = FetchCoordinator::new(controller.clone(), catalog);

        Self {
            config,
            controller,
            peers,
            fetcher,
        }
    }

    /// Get the session controller
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Get the peer count poller
    pub fn peers(&self) -> &PeerCountPoller {
        &self.peers
    }

    /// Get the fetch coordinator
    pub fn fetcher(&self) -> &FetchCoordinator {
        &self.fetcher
    }
}

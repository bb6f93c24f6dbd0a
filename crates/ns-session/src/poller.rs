//! Peer count poller
//!
//! While observing, a background task queries the node's connectivity count on
//! a fixed period and publishes each result to subscribers.
//!
//! # Serialization
//!
//! The query runs inline in the tick loop, so at most one query is ever in
//! flight. Ticks that come due while a query is outstanding are skipped, not
//! queued (`MissedTickBehavior::Skip`).
//!
//! # Failures
//!
//! Peer count is best-effort telemetry: a failed or timed-out query drops that
//! tick and is only logged. Nothing is published for it and the poller keeps
//! running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use ns_core::config::SessionConfig;
use ns_core::{
    parse_peer_count, CommandTransport, NodeCommand, PeerCount, SessionError, TransportError,
};

use crate::controller::SessionController;

/// Subscriber buffer. Updates a slow subscriber has not read are overwritten
/// by newer ones rather than queued without bound.
const PEER_COUNT_CHANNEL_CAPACITY: usize = 16;

/// Whether the poller is currently ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Observing,
}

/// Periodically publishes the node's peer count while observed
pub struct PeerCountPoller {
    session: SessionController,
    interval: Duration,
    query_timeout: Duration,
    updates: broadcast::Sender<PeerCount>,
    latest: Arc<AtomicU64>,
    /// Cancellation for the running tick loop; `None` while idle
    task: Mutex<Option<CancellationToken>>,
}

impl PeerCountPoller {
    /// Create an idle poller
    pub fn new(session: SessionController, interval: Duration, query_timeout: Duration) -> Self {
        let (updates, _) = broadcast::channel(PEER_COUNT_CHANNEL_CAPACITY);
        Self {
            session,
            interval,
            query_timeout,
            updates,
            latest: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Create an idle poller using the configured interval and timeout
    pub fn from_config(session: SessionController, config: &SessionConfig) -> Self {
        Self::new(session, config.poll_interval, config.query_timeout)
    }

    /// Receive future peer count updates
    pub fn subscribe(&self) -> broadcast::Receiver<PeerCount> {
        self.updates.subscribe()
    }

    /// Most recently published count (zero before the first successful tick)
    pub fn latest(&self) -> PeerCount {
        PeerCount::new(self.latest.load(Ordering::Acquire))
    }

    /// Tick period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollerState {
        if self.lock_task().is_some() {
            PollerState::Observing
        } else {
            PollerState::Idle
        }
    }

    /// Begin observing.
    ///
    /// No-op if already observing. Returns `NotReady` without polling if the
    /// session has not reached Ready; callers that treat observation as
    /// optional may ignore the error.
    pub fn start(&self) -> Result<(), SessionError> {
        if !self.session.is_ready() {
            tracing::debug!("Not starting peer count poller: session is not ready");
            return Err(SessionError::NotReady);
        }

        let mut task = self.lock_task();
        if task.is_some() {
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let ticker = TickLoop {
            transport: Arc::clone(self.session.transport()),
            interval: self.interval,
            query_timeout: self.query_timeout,
            updates: self.updates.clone(),
            latest: Arc::clone(&self.latest),
        };
        tokio::spawn(ticker.run(cancel.clone()));
        *task = Some(cancel);

        tracing::info!(
            "Peer count poller started (interval: {:?}, query timeout: {:?})",
            self.interval,
            self.query_timeout
        );
        Ok(())
    }

    /// Stop observing. Idempotent.
    ///
    /// Future ticks are cancelled; an in-flight query is abandoned and its
    /// result discarded.
    pub fn stop(&self) {
        if let Some(cancel) = self.lock_task().take() {
            cancel.cancel();
            tracing::info!("Peer count poller stopping");
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PeerCountPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State owned by the background tick loop
struct TickLoop {
    transport: Arc<dyn CommandTransport>,
    interval: Duration,
    query_timeout: Duration,
    updates: broadcast::Sender<PeerCount>,
    latest: Arc<AtomicU64>,
}

impl TickLoop {
    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Discarding in-flight peer count query");
                    break;
                }
                result = tokio::time::timeout(self.query_timeout, query_peer_count(self.transport.as_ref())) => result,
            };

            match result {
                Ok(Ok(count)) => {
                    self.latest.store(count.count, Ordering::Release);
                    // No subscribers is fine
                    let _ = self.updates.send(count);
                    tracing::trace!("Peer count: {}", count);
                }
                Ok(Err(e)) => {
                    tracing::debug!("Peer count query failed, dropping tick: {}", e);
                }
                Err(_) => {
                    tracing::debug!(
                        "Peer count query timed out after {:?}, dropping tick",
                        self.query_timeout
                    );
                }
            }

            let elapsed = started.elapsed();
            if elapsed > self.interval {
                tracing::trace!(
                    "Peer count query took {:?}, skipping {} tick(s)",
                    elapsed,
                    elapsed.as_nanos() / self.interval.as_nanos().max(1)
                );
            }
        }

        tracing::info!("Peer count poller stopped");
    }
}

async fn query_peer_count(transport: &dyn CommandTransport) -> Result<PeerCount, TransportError> {
    let response = transport.command_json(&NodeCommand::SwarmPeers).await?;
    parse_peer_count(&response).map(PeerCount::new)
}

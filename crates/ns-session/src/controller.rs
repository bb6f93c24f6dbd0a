//! Node session controller
//!
//! Owns node startup, identity retrieval, and the session lifecycle state.
//! The state lives in a `watch` channel: the controller is the single writer,
//! while the poller, the fetch coordinator, and any consumer read consistent
//! snapshots of it from their own tasks.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --start()--> Starting --+--> Ready(identity)
//!                                       +--> Failed(error)
//! ```
//!
//! The claim `Uninitialized -> Starting` is a check-and-set on the channel
//! value, so concurrent `start()` calls cannot both proceed. `Ready` and
//! `Failed` are terminal; there is no stop and no automatic retry.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use ns_core::{
    parse_identity, ClassifiedError, CommandTransport, Identity, NodeCommand, SessionError,
    SessionState,
};

/// Handle to the node session, cheap to clone and share between components
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    transport: Arc<dyn CommandTransport>,
    state: watch::Sender<SessionState>,
}

/// Completion of an asynchronous startup.
///
/// Resolves exactly once, to the node identity or to the classified failure.
pub struct StartHandle {
    rx: oneshot::Receiver<Result<Identity, ClassifiedError>>,
}

impl StartHandle {
    /// Wait for startup to finish
    pub async fn wait(self) -> Result<Identity, ClassifiedError> {
        self.rx.await.unwrap_or_else(|_| {
            Err(ClassifiedError::generic(
                "node startup ended without reporting a result",
            ))
        })
    }
}

impl SessionController {
    /// Create a controller for a node reachable through `transport`
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            inner: Arc::new(ControllerInner { transport, state }),
        }
    }

    /// Start the node and retrieve its identity.
    ///
    /// Transitions to `Starting` before returning; the node start and the
    /// `id` command then run on a spawned task. Must be called from within a
    /// Tokio runtime. Fails with `AlreadyStarted` on every call after the
    /// first.
    pub fn start(&self) -> Result<StartHandle, SessionError> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Uninitialized {
                *state = SessionState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(SessionError::AlreadyStarted);
        }

        tracing::info!("Starting node session");

        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let bring_up = tokio::spawn({
                let inner = Arc::clone(&inner);
                async move { inner.bring_up().await }
            });

            let result = match bring_up.await {
                Ok(result) => result,
                Err(e) => Err(ClassifiedError::generic(format!(
                    "node startup task failed: {}",
                    e
                ))),
            };

            let next = match &result {
                Ok(identity) => {
                    tracing::info!("Node session ready (peer ID: {})", identity.peer_id);
                    SessionState::Ready(identity.clone())
                }
                Err(err) => {
                    tracing::error!("Node session failed to start: {}", err);
                    SessionState::Failed(err.clone())
                }
            };
            inner.state.send_replace(next);

            if tx.send(result).is_err() {
                tracing::debug!("Start handle dropped before startup completed");
            }
        });

        Ok(StartHandle { rx })
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Whether the session reached Ready
    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().is_ready()
    }

    /// Node identity; `NotReady` unless the session is Ready
    pub fn identity(&self) -> Result<Identity, SessionError> {
        self.inner
            .state
            .borrow()
            .identity()
            .cloned()
            .ok_or(SessionError::NotReady)
    }

    /// Receiver observing every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the session is Ready or Failed.
    ///
    /// Does not start the session; waits indefinitely if nobody calls `start()`.
    pub async fn wait_ready(&self) -> Result<Identity, SessionError> {
        let mut rx = self.subscribe_state();
        let state = rx
            .wait_for(SessionState::is_terminal)
            .await
            .map_err(|_| SessionError::NotReady)?;

        match &*state {
            SessionState::Ready(identity) => Ok(identity.clone()),
            SessionState::Failed(err) => Err(SessionError::Failed(err.clone())),
            _ => Err(SessionError::NotReady),
        }
    }

    /// Transport used to reach the node
    pub(crate) fn transport(&self) -> &Arc<dyn CommandTransport> {
        &self.inner.transport
    }
}

impl ControllerInner {
    async fn bring_up(&self) -> Result<Identity, ClassifiedError> {
        self.transport.start().await?;
        tracing::debug!("Node started, querying identity");

        let response = self.transport.command_json(&NodeCommand::Id).await?;
        let identity = parse_identity(&response)?;
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns_core::testing::ScriptedTransport;
    use ns_core::TransportError;
    use serde_json::json;
    use std::time::Duration;

    fn controller(transport: ScriptedTransport) -> SessionController {
        SessionController::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_start_reaches_ready() {
        let session = controller(ScriptedTransport::new().with_identity("Qm123"));
        assert_eq!(session.state(), SessionState::Uninitialized);

        let identity = session.start().unwrap().wait().await.unwrap();

        assert_eq!(identity.peer_id, "Qm123");
        assert!(session.is_ready());
        assert_eq!(session.identity().unwrap(), Identity::new("Qm123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_synchronously_starting() {
        let session = controller(
            ScriptedTransport::new().with_start_delay(Duration::from_secs(5)),
        );

        let handle = session.start().unwrap();
        assert_eq!(session.state(), SessionState::Starting);
        assert_eq!(session.identity(), Err(SessionError::NotReady));

        handle.wait().await.unwrap();
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_start_only_once() {
        let session = controller(ScriptedTransport::new());

        let handle = session.start().unwrap();
        assert!(matches!(session.start(), Err(SessionError::AlreadyStarted)));

        handle.wait().await.unwrap();
        assert!(matches!(session.start(), Err(SessionError::AlreadyStarted)));
    }

    #[tokio::test]
    async fn test_node_error_is_structured_failure() {
        let session = controller(ScriptedTransport::new().with_start_error(TransportError::Node {
            code: 1,
            message: "repo is locked".to_string(),
        }));

        let err = session.start().unwrap().wait().await.unwrap_err();

        assert!(err.is_structured());
        assert!(err.description().contains("repo is locked"));
        assert_eq!(session.state(), SessionState::Failed(err));
        assert_eq!(session.identity(), Err(SessionError::NotReady));
    }

    #[tokio::test]
    async fn test_missing_peer_id_is_generic_failure() {
        let session = controller(
            ScriptedTransport::new().with_identity_response(Ok(json!({ "Addresses": [] }))),
        );

        let err = session.start().unwrap().wait().await.unwrap_err();

        assert!(!err.is_structured());
        assert!(err.description().contains("ID"));
        assert!(matches!(session.state(), SessionState::Failed(_)));
    }

    #[tokio::test]
    async fn test_wait_ready_reports_outcome() {
        let session = controller(ScriptedTransport::new().with_identity("QmWait"));
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_ready().await })
        };

        let _handle = session.start().unwrap();
        let identity = waiter.await.unwrap().unwrap();
        assert_eq!(identity.peer_id, "QmWait");

        let failing = controller(
            ScriptedTransport::new().with_start_error(TransportError::Other("no repo".into())),
        );
        let _handle = failing.start().unwrap();
        assert!(matches!(
            failing.wait_ready().await,
            Err(SessionError::Failed(ClassifiedError::Generic { .. }))
        ));
    }

    #[tokio::test]
    async fn test_state_subscribers_see_forward_transitions() {
        let session = controller(ScriptedTransport::new());
        let mut rx = session.subscribe_state();

        let handle = session.start().unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Starting);

        handle.wait().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_ready());
    }
}

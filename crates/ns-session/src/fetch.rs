//! On-demand content fetches
//!
//! The `FetchCoordinator` runs at most one fetch at a time. A trigger claims
//! the coordinator with a compare-and-swap before any asynchronous work starts,
//! so concurrent triggers see `Busy` rather than queueing up. The claim is
//! released right before the outcome is delivered, which lets the consumer
//! trigger the next fetch as soon as it receives one.
//!
//! Each accepted trigger:
//! 1. picks a catalog entry uniformly at random,
//! 2. runs `cat` for the entry's content ID on a spawned task,
//! 3. decodes the returned bytes on the blocking pool,
//! 4. delivers exactly one `FetchOutcome` through its `FetchTicket`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::time::Instant;

use ns_core::time::{current_time_millis, elapsed_duration};
use ns_core::{Catalog, CatalogEntry, ClassifiedError, FetchError, NodeCommand};

use crate::controller::SessionController;
use crate::decode::{ImageDecoder, ImageInfo, PayloadDecoder};

/// A fetch that has been accepted and is in flight
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Entry being fetched
    pub entry: CatalogEntry,
    /// Unix timestamp (ms) at which the fetch was triggered
    pub started_at: u64,
}

impl FetchRequest {
    /// Time since the fetch was triggered
    pub fn elapsed(&self) -> Duration {
        elapsed_duration(self.started_at)
    }
}

/// A successfully fetched and decoded payload
#[derive(Debug, Clone)]
pub struct FetchedContent {
    /// Display title, e.g. `614. Designated Drivers`
    pub title: String,
    pub entry: CatalogEntry,
    /// Raw payload bytes as returned by the node
    pub payload: Bytes,
    pub image: ImageInfo,
    /// Time spent fetching and decoding
    pub elapsed: Duration,
}

/// Result of one fetch, delivered exactly once
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchedContent),
    Failure(ClassifiedError),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    pub fn content(&self) -> Option<&FetchedContent> {
        match self {
            FetchOutcome::Success(content) => Some(content),
            FetchOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure(err) => Some(err),
        }
    }
}

/// Pending outcome of an accepted fetch
pub struct FetchTicket {
    request: FetchRequest,
    rx: oneshot::Receiver<FetchOutcome>,
}

impl FetchTicket {
    /// The accepted request
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    /// Wait for the outcome
    pub async fn outcome(self) -> FetchOutcome {
        self.rx.await.unwrap_or_else(|_| {
            FetchOutcome::Failure(ClassifiedError::generic(
                "fetch ended without reporting an outcome",
            ))
        })
    }
}

/// Runs single-outstanding content fetches against a catalog
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<FetchInner>,
}

struct FetchInner {
    session: SessionController,
    catalog: Catalog,
    decoder: Arc<dyn PayloadDecoder>,
    busy: AtomicBool,
}

/// Releases the coordinator when a fetch finishes, including by panic
struct BusyGuard {
    inner: Arc<FetchInner>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.inner.busy.store(false, Ordering::Release);
    }
}

impl FetchCoordinator {
    /// Create a coordinator decoding payloads as images
    pub fn new(session: SessionController, catalog: Catalog) -> Self {
        Self::with_decoder(session, catalog, Arc::new(ImageDecoder))
    }

    /// Create a coordinator with a custom payload decoder
    pub fn with_decoder(
        session: SessionController,
        catalog: Catalog,
        decoder: Arc<dyn PayloadDecoder>,
    ) -> Self {
        Self {
            inner: Arc::new(FetchInner {
                session,
                catalog,
                decoder,
                busy: AtomicBool::new(false),
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Whether a fetch is outstanding
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Trigger a fetch of a random catalog entry.
    ///
    /// Fails with `NotReady` before the session is Ready, `EmptyCatalog` when
    /// there is nothing to fetch, and `Busy` while another fetch is
    /// outstanding. Must be called from within a Tokio runtime.
    pub fn trigger_fetch(&self) -> Result<FetchTicket, FetchError> {
        if !self.inner.session.is_ready() {
            return Err(FetchError::NotReady);
        }
        if self.inner.catalog.is_empty() {
            return Err(FetchError::EmptyCatalog);
        }
        if self
            .inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Fetch rejected: another fetch is in progress");
            return Err(FetchError::Busy);
        }
        let guard = BusyGuard {
            inner: Arc::clone(&self.inner),
        };

        let entry = self
            .inner
            .catalog
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(FetchError::EmptyCatalog)?;

        let request = FetchRequest {
            entry: entry.clone(),
            started_at: current_time_millis(),
        };
        tracing::info!("Fetching \"{}\" ({})", entry.title(), entry.content_id);

        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = match inner.fetch(&entry).await {
                Ok((payload, image)) => {
                    tracing::info!(
                        "Fetched \"{}\": {} bytes, {} {}x{}",
                        entry.title(),
                        payload.len(),
                        image.mime_type,
                        image.width,
                        image.height
                    );
                    FetchOutcome::Success(FetchedContent {
                        title: entry.title(),
                        entry,
                        payload,
                        image,
                        elapsed: started.elapsed(),
                    })
                }
                Err(err) => {
                    tracing::warn!("Fetch of {} failed: {}", entry.content_id, err);
                    FetchOutcome::Failure(err)
                }
            };

            // Fetching -> Idle happens before delivery
            drop(guard);
            if tx.send(outcome).is_err() {
                tracing::debug!("Fetch ticket dropped, discarding outcome");
            }
        });

        Ok(FetchTicket { request, rx })
    }
}

impl FetchInner {
    async fn fetch(&self, entry: &CatalogEntry) -> Result<(Bytes, ImageInfo), ClassifiedError> {
        let payload = self
            .session
            .transport()
            .command_raw(&NodeCommand::Cat(entry.content_id.clone()))
            .await?;
        tracing::debug!("Received {} bytes for {}", payload.len(), entry.content_id);

        let decoder = Arc::clone(&self.decoder);
        let bytes = payload.clone();
        let image = tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| ClassifiedError::generic(format!("payload decoding failed: {}", e)))??;

        Ok((payload, image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::png_fixture;
    use ns_core::testing::ScriptedTransport;
    use ns_core::{CommandTransport, TransportError};

    fn designated_drivers() -> Catalog {
        Catalog::new(vec![CatalogEntry::new(614, "Designated Drivers", "QmXYZ")])
    }

    async fn ready_session(transport: ScriptedTransport) -> SessionController {
        let session = SessionController::new(Arc::new(transport) as Arc<dyn CommandTransport>);
        session.start().unwrap().wait().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let png = png_fixture(8, 6);
        let session = ready_session(ScriptedTransport::new().with_content("QmXYZ", png.clone())).await;
        let fetcher = FetchCoordinator::new(session, designated_drivers());

        let ticket = fetcher.trigger_fetch().unwrap();
        assert_eq!(ticket.request().entry.episode, 614);

        let content = match ticket.outcome().await {
            FetchOutcome::Success(content) => content,
            FetchOutcome::Failure(err) => panic!("fetch failed: {}", err),
        };
        assert_eq!(content.title, "614. Designated Drivers");
        assert_eq!(&content.payload[..], &png[..]);
        assert_eq!((content.image.width, content.image.height), (8, 6));
        assert!(!fetcher.is_busy());
    }

    #[tokio::test]
    async fn test_fetch_requires_ready_session() {
        let session = SessionController::new(Arc::new(ScriptedTransport::new()));
        let fetcher = FetchCoordinator::new(session, designated_drivers());

        assert!(matches!(fetcher.trigger_fetch(), Err(FetchError::NotReady)));
        assert!(!fetcher.is_busy());
    }

    #[tokio::test]
    async fn test_empty_catalog_fails_fast() {
        let session = ready_session(ScriptedTransport::new()).await;
        let fetcher = FetchCoordinator::new(session, Catalog::default());

        assert!(matches!(fetcher.trigger_fetch(), Err(FetchError::EmptyCatalog)));
        assert!(!fetcher.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_trigger_is_busy() {
        let session = ready_session(
            ScriptedTransport::new()
                .with_content("QmXYZ", png_fixture(2, 2))
                .with_cat_delay(Duration::from_secs(5)),
        )
        .await;
        let fetcher = FetchCoordinator::new(session, designated_drivers());

        let ticket = fetcher.trigger_fetch().unwrap();
        assert!(fetcher.is_busy());
        assert!(matches!(fetcher.trigger_fetch(), Err(FetchError::Busy)));
        assert!(matches!(fetcher.trigger_fetch(), Err(FetchError::Busy)));

        assert!(ticket.outcome().await.is_success());
        assert!(!fetcher.is_busy());

        let again = fetcher.trigger_fetch().unwrap();
        assert!(again.outcome().await.is_success());
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_failure() {
        let session = ready_session(
            ScriptedTransport::new().with_content("QmXYZ", &b"definitely not an image"[..]),
        )
        .await;
        let fetcher = FetchCoordinator::new(session, designated_drivers());

        let outcome = fetcher.trigger_fetch().unwrap().outcome().await;

        let err = outcome.error().expect("undecodable payload must fail");
        assert!(matches!(err, ClassifiedError::Generic { .. }));
        assert!(!err.description().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_classified() {
        let session = ready_session(ScriptedTransport::new().with_content_error(
            "QmXYZ",
            TransportError::Node {
                code: 0,
                message: "context canceled".to_string(),
            },
        ))
        .await;
        let fetcher = FetchCoordinator::new(session, designated_drivers());

        let outcome = fetcher.trigger_fetch().unwrap().outcome().await;

        let err = outcome.error().unwrap();
        assert!(err.is_structured());
        assert!(err.description().contains("context canceled"));
        assert!(!fetcher.is_busy());
    }

    #[tokio::test]
    async fn test_dropped_ticket_still_releases() {
        let session = ready_session(
            ScriptedTransport::new().with_content("QmXYZ", png_fixture(1, 1)),
        )
        .await;
        let fetcher = FetchCoordinator::new(session, designated_drivers());

        drop(fetcher.trigger_fetch().unwrap());
        while fetcher.is_busy() {
            tokio::task::yield_now().await;
        }
        assert!(fetcher.trigger_fetch().is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_triggers_accept_one() {
        let session = ready_session(
            ScriptedTransport::new()
                .with_content("QmXYZ", png_fixture(1, 1))
                .with_cat_delay(Duration::from_millis(200)),
        )
        .await;
        let fetcher = FetchCoordinator::new(session, designated_drivers());
        let barrier = Arc::new(tokio::sync::Barrier::new(16));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let fetcher = fetcher.clone();
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                fetcher.trigger_fetch()
            }));
        }

        let mut tickets = Vec::new();
        let mut busy = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(ticket) => tickets.push(ticket),
                Err(FetchError::Busy) => busy += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(tickets.len(), 1);
        assert_eq!(busy, 15);
        for ticket in tickets {
            assert!(ticket.outcome().await.is_success());
        }
    }
}

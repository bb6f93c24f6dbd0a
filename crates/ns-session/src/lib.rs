//! ns-session: Node session orchestrator
//!
//! Coordinates a client with a local content-addressed-storage node: starts
//! the node and retrieves its identity, polls peer connectivity while
//! observed, and runs single-outstanding content fetches against a catalog.
//!
//! All slow work runs on spawned Tokio tasks. Results come back to the
//! consumer through one-shot handles (`StartHandle`, `FetchTicket`) and a
//! broadcast channel of peer counts; whichever task awaits them is the
//! delivery context and is never blocked by node I/O.

pub mod controller;
pub mod decode;
pub mod fetch;
pub mod poller;
pub mod state;

pub use controller::{SessionController, StartHandle};
pub use decode::{ImageDecoder, ImageInfo, PayloadDecoder};
pub use fetch::{FetchCoordinator, FetchOutcome, FetchRequest, FetchTicket, FetchedContent};
pub use poller::{PeerCountPoller, PollerState};
pub use state::NodeSession;

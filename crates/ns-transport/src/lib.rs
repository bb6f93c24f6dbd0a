//! ns-transport: HTTP RPC transport for node-session
//!
//! Implements the `CommandTransport` boundary against a node exposing the
//! `/api/v0/<command>` HTTP RPC surface.

pub mod http;
pub mod response;

pub use http::HttpTransport;

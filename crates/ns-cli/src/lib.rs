//! node-session CLI
//!
//! Terminal consumer of a node session: it starts the node, reports peers,
//! and drives fetches from the catalog.

pub mod commands;
pub mod output;

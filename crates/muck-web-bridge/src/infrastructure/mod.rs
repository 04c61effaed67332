//! Infrastructure layer for muck-web-bridge.
//!
//! Handles all I/O: the HTTP listener and WebSocket upgrade on the browser
//! side, and the TCP connection on the MUCK side.
//!
//! # What does NOT belong here?
//!
//! - Pump loops and shutdown coordination (application layer)
//! - Frame, error, and config types (domain layer)
//! - CLI parsing (done in `main.rs`)

pub mod muck_conn;
pub mod ws_server;

pub use ws_server::{build_router, run_server, BridgeServer};

//! muck-web-bridge library crate.
//!
//! This crate lets a browser, which can only speak WebSocket, play on a MUCK
//! server, which only speaks raw telnet over TCP.  Each WebSocket session is
//! paired with its own TCP connection and bytes are pumped both ways,
//! optionally re-encoded between UTF-8 and GBK.
//!
//! # Architecture
//!
//! ```text
//! Browser (WebSocket text frames)
//!         ↕
//! [muck-web-bridge]
//!   ├── domain/           Pure types: BridgeConfig, ClientFrame, SessionError
//!   ├── application/      The relay: two pumps + once-only shutdown
//!   └── infrastructure/
//!         ├── ws_server/  axum router, upgrade, per-session handler
//!         └── muck_conn/  TCP connection to the MUCK
//!         ↕
//! MUCK (raw telnet bytes over TCP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` is generic over `Stream`/`Sink` and
//!   `AsyncRead`/`AsyncWrite`; it never names a socket type, which is what
//!   lets its tests run on in-memory channels.
//! - `infrastructure` plugs real sockets into the application layer.

/// Domain layer: configuration, frames, errors (no I/O).
pub mod domain;

/// Application layer: relay pumps and endpoint teardown.
pub mod application;

/// Infrastructure layer: HTTP/WebSocket server and MUCK TCP connection.
pub mod infrastructure;

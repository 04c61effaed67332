//! Coordinated teardown of a session's two connections.
//!
//! Only the write halves matter here: closing the WebSocket sink sends the
//! close handshake, and shutting down the TCP write half sends FIN.  The read
//! halves are owned by the pumps and are dropped when they finish.

use std::fmt::Display;

use futures_util::{Sink, SinkExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::domain::ClientFrame;

/// What happened when one side was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// The close was attempted and failed; the connection is dropped anyway.
    Failed(String),
    /// The side was never opened, or its pump panicked and took it down.
    Absent,
}

/// Outcome of [`EndpointPair::release`] for both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseReport {
    pub client: CloseOutcome,
    pub backend: CloseOutcome,
}

/// The closable halves of a browser connection (`CW`) and a MUCK
/// connection (`BW`).
///
/// [`EndpointPair::release`] takes `self` by value, so each side is closed
/// at most once.  A pair dropped without `release` still drops both halves,
/// which closes the sockets without the polite close handshake.
pub struct EndpointPair<CW, BW> {
    client: Option<CW>,
    backend: Option<BW>,
}

impl<CW, BW> EndpointPair<CW, BW> {
    pub fn new(client: CW, backend: BW) -> Self {
        Self::from_parts(Some(client), Some(backend))
    }

    /// A pair whose MUCK side never opened (the dial failed).
    pub fn client_only(client: CW) -> Self {
        Self::from_parts(Some(client), None)
    }

    pub fn from_parts(client: Option<CW>, backend: Option<BW>) -> Self {
        Self { client, backend }
    }
}

impl<CW, BW> EndpointPair<CW, BW>
where
    CW: Sink<ClientFrame> + Unpin,
    CW::Error: Display,
    BW: AsyncWrite + Unpin,
{
    /// Closes both sides.
    ///
    /// The two closes are independent: a failure on one is logged and the
    /// other is still attempted.
    pub async fn release(self) -> ReleaseReport {
        let client = match self.client {
            Some(mut sink) => match sink.close().await {
                Ok(()) => CloseOutcome::Closed,
                Err(e) => {
                    warn!("closing websocket failed: {e}");
                    CloseOutcome::Failed(e.to_string())
                }
            },
            None => CloseOutcome::Absent,
        };

        let backend = match self.backend {
            Some(mut write) => match write.shutdown().await {
                Ok(()) => CloseOutcome::Closed,
                Err(e) => {
                    warn!("closing muck connection failed: {e}");
                    CloseOutcome::Failed(e.to_string())
                }
            },
            None => CloseOutcome::Absent,
        };

        debug!(?client, ?backend, "endpoints released");
        ReleaseReport { client, backend }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

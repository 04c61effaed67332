//! The relay: two directional pumps and their once-only shutdown.
//!
//! ```text
//!             ┌──────── inbound pump ────────┐
//!  browser ──▶│ frame → to_backend → write_all│──▶ MUCK
//!             └───────────────────────────────┘
//!             ┌──────── outbound pump ───────┐
//!  browser ◀──│ send ← to_client ← read 1 KiB │◀── MUCK
//!             └───────────────────────────────┘
//! ```
//!
//! Each pump runs in its own Tokio task and loops until something goes
//! wrong: a read or write error, a transcode error, or the remote side
//! closing.  The first pump to stop fires the session's [`ShutdownSignal`];
//! the other pump is waiting on that signal next to its own I/O and leaves
//! its loop as well.  [`Relay::run`] returns only after *both* tasks have
//! finished, handing back the write halves so the caller can close them.
//!
//! There are no timeouts.  A MUCK that neither sends nor closes keeps the
//! session open for as long as the browser does.

use std::fmt::Display;
use std::net::SocketAddr;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use muck_core::Transcoder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, info, trace, warn, Instrument};

use crate::application::endpoints::{EndpointPair, ReleaseReport};
use crate::application::shutdown::{RelayState, ShutdownSignal};
use crate::domain::{ClientFrame, Direction, SessionError};

/// Maximum number of bytes taken from the MUCK per read.
pub const READ_CHUNK_SIZE: usize = 1024;

/// How a pump left its loop.
#[derive(Debug)]
pub enum PumpExit {
    /// The pump hit `error`.  `triggered` is `true` if this failure was the
    /// one that fired the shutdown signal.
    Failed {
        error: SessionError,
        triggered: bool,
    },
    /// The other pump fired the shutdown signal first.
    Cancelled,
    /// The pump task panicked; its write half was dropped with it.
    Aborted(String),
}

impl PumpExit {
    /// `true` if this pump's failure started the shutdown.
    pub fn is_trigger(&self) -> bool {
        matches!(self, PumpExit::Failed { triggered: true, .. })
    }
}

/// Runs the two pumps of one session.
pub struct Relay {
    transcoder: Transcoder,
    peer: SocketAddr,
    signal: ShutdownSignal,
}

impl Relay {
    /// Creates an idle relay for the browser at `peer`.
    pub fn new(transcoder: Transcoder, peer: SocketAddr) -> Self {
        Self {
            transcoder,
            peer,
            signal: ShutdownSignal::new(),
        }
    }

    /// Subscribes to the relay's state transitions.
    pub fn state(&self) -> watch::Receiver<RelayState> {
        self.signal.subscribe()
    }

    /// Spawns both pumps and waits until both have stopped.
    ///
    /// - `client_rx` / `client_tx`: the browser's frame stream and sink.
    /// - `backend_rx` / `backend_tx`: the MUCK's byte stream halves.
    ///
    /// The returned [`RelayOutcome`] owns whatever write halves survived;
    /// call [`RelayOutcome::release`] to close them.
    pub async fn run<CR, CE, CW, BR, BW>(
        self,
        client_rx: CR,
        client_tx: CW,
        backend_rx: BR,
        backend_tx: BW,
    ) -> RelayOutcome<CW, BW>
    where
        CR: Stream<Item = Result<ClientFrame, CE>> + Send + Unpin + 'static,
        CE: Display + Send + 'static,
        CW: Sink<ClientFrame> + Send + Unpin + 'static,
        CW::Error: Display + Send,
        BR: AsyncRead + Send + Unpin + 'static,
        BW: AsyncWrite + Send + Unpin + 'static,
    {
        self.signal.set_state(RelayState::Running);

        let inbound = tokio::spawn(pump_inbound(
            client_rx,
            backend_tx,
            self.transcoder,
            self.signal.clone(),
            self.peer,
        )
        .in_current_span());
        let outbound = tokio::spawn(pump_outbound(
            backend_rx,
            client_tx,
            self.transcoder,
            self.signal.clone(),
            self.peer,
        )
        .in_current_span());

        // Join both, not just the first: nothing may still be using a
        // channel when the caller closes it.
        let (inbound, outbound) = tokio::join!(inbound, outbound);
        let (backend_tx, inbound) = unpack(inbound);
        let (client_tx, outbound) = unpack(outbound);

        RelayOutcome {
            trigger: self.signal.trigger(),
            inbound,
            outbound,
            endpoints: EndpointPair::from_parts(client_tx, backend_tx),
            signal: self.signal,
        }
    }
}

fn unpack<W>(joined: Result<(W, PumpExit), JoinError>) -> (Option<W>, PumpExit) {
    match joined {
        Ok((write, exit)) => (Some(write), exit),
        Err(e) => (None, PumpExit::Aborted(e.to_string())),
    }
}

/// Result of a finished [`Relay::run`].
pub struct RelayOutcome<CW, BW> {
    /// The direction whose failure ended the session.
    pub trigger: Option<Direction>,
    pub inbound: PumpExit,
    pub outbound: PumpExit,
    endpoints: EndpointPair<CW, BW>,
    signal: ShutdownSignal,
}

impl<CW, BW> RelayOutcome<CW, BW>
where
    CW: Sink<ClientFrame> + Unpin,
    CW::Error: Display,
    BW: AsyncWrite + Unpin,
{
    /// Closes both channels and moves the relay to [`RelayState::Closed`].
    pub async fn release(self) -> ReleaseReport {
        let report = self.endpoints.release().await;
        self.signal.set_state(RelayState::Closed);
        report
    }
}

/// Records a pump failure: fires the signal and logs at a level that
/// reflects whether this failure is the one that ended the session.
fn fail(signal: &ShutdownSignal, peer: SocketAddr, direction: Direction, error: SessionError) -> PumpExit {
    let triggered = signal.fire(direction);
    match (&error, triggered) {
        (SessionError::Closed { .. }, true) => info!(%peer, "{error}"),
        (_, true) => warn!(%peer, "{error}"),
        (_, false) => debug!(%peer, "{error} (session already shutting down)"),
    }
    PumpExit::Failed { error, triggered }
}

/// Browser → MUCK.
async fn pump_inbound<CR, CE, BW>(
    mut client_rx: CR,
    mut backend_tx: BW,
    transcoder: Transcoder,
    signal: ShutdownSignal,
    peer: SocketAddr,
) -> (BW, PumpExit)
where
    CR: Stream<Item = Result<ClientFrame, CE>> + Unpin,
    CE: Display,
    BW: AsyncWrite + Unpin,
{
    let direction = Direction::Inbound;
    let _guard = signal.fire_on_drop(direction);

    let error = loop {
        let next = tokio::select! {
            biased;
            _ = signal.fired() => None,
            next = client_rx.next() => Some(next),
        };
        let Some(next) = next else {
            return (backend_tx, PumpExit::Cancelled);
        };

        let payload = match next {
            Some(Ok(frame)) => match frame.into_payload() {
                Some(payload) => payload,
                None => break SessionError::Closed { direction },
            },
            Some(Err(e)) => {
                break SessionError::Read {
                    direction,
                    reason: e.to_string(),
                }
            }
            None => break SessionError::Closed { direction },
        };

        let bytes = match transcoder.to_backend(&payload) {
            Ok(bytes) => bytes,
            Err(source) => break SessionError::Transcode { direction, source },
        };

        // `write_all` loops over short writes until every byte is accepted.
        let written = tokio::select! {
            biased;
            _ = signal.fired() => None,
            result = backend_tx.write_all(&bytes) => Some(result),
        };
        match written {
            None => return (backend_tx, PumpExit::Cancelled),
            Some(Err(e)) => {
                break SessionError::Write {
                    direction,
                    reason: e.to_string(),
                }
            }
            Some(Ok(())) => trace!(bytes = bytes.len(), "{direction}: forwarded"),
        }
    };

    let exit = fail(&signal, peer, direction, error);
    (backend_tx, exit)
}

/// MUCK → Browser.
async fn pump_outbound<BR, CW>(
    mut backend_rx: BR,
    mut client_tx: CW,
    transcoder: Transcoder,
    signal: ShutdownSignal,
    peer: SocketAddr,
) -> (CW, PumpExit)
where
    BR: AsyncRead + Unpin,
    CW: Sink<ClientFrame> + Unpin,
    CW::Error: Display,
{
    let direction = Direction::Outbound;
    let _guard = signal.fire_on_drop(direction);

    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    // Bytes of a character whose remainder has not arrived yet.
    let mut carry: Vec<u8> = Vec::new();

    let error = loop {
        let read = tokio::select! {
            biased;
            _ = signal.fired() => None,
            result = backend_rx.read(&mut buf) => Some(result),
        };
        let n = match read {
            None => return (client_tx, PumpExit::Cancelled),
            Some(Ok(0)) => {
                // Nothing can complete the held-back tail any more, so pass
                // it on as it is if it converts at all.
                let Some(frame) = tail_frame(transcoder, &mut carry) else {
                    break SessionError::Closed { direction };
                };
                match send_frame(&signal, &mut client_tx, frame).await {
                    None => return (client_tx, PumpExit::Cancelled),
                    Some(Err(e)) => {
                        break SessionError::Write {
                            direction,
                            reason: e.to_string(),
                        }
                    }
                    Some(Ok(())) => break SessionError::Closed { direction },
                }
            }
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                break SessionError::Read {
                    direction,
                    reason: e.to_string(),
                }
            }
        };

        carry.extend_from_slice(&buf[..n]);
        let complete = transcoder.complete_prefix_len(&carry);
        if complete == 0 {
            continue;
        }
        let chunk: Vec<u8> = carry.drain(..complete).collect();

        let frame = match transcoder.to_client(&chunk) {
            Ok(bytes) => ClientFrame::from_backend_bytes(bytes.into_owned()),
            Err(source) => break SessionError::Transcode { direction, source },
        };

        match send_frame(&signal, &mut client_tx, frame).await {
            None => return (client_tx, PumpExit::Cancelled),
            Some(Err(e)) => {
                break SessionError::Write {
                    direction,
                    reason: e.to_string(),
                }
            }
            Some(Ok(())) => trace!(bytes = complete, "{direction}: forwarded"),
        }
    };

    let exit = fail(&signal, peer, direction, error);
    (client_tx, exit)
}

/// Sends `frame` unless the shutdown signal fires first (`None`).
async fn send_frame<CW>(
    signal: &ShutdownSignal,
    client_tx: &mut CW,
    frame: ClientFrame,
) -> Option<Result<(), CW::Error>>
where
    CW: Sink<ClientFrame> + Unpin,
{
    tokio::select! {
        biased;
        _ = signal.fired() => None,
        result = client_tx.send(frame) => Some(result),
    }
}

/// Converts whatever is left in `carry` at end of stream.
///
/// An unconvertible tail (a truncated GBK character) is dropped.
fn tail_frame(transcoder: Transcoder, carry: &mut Vec<u8>) -> Option<ClientFrame> {
    if carry.is_empty() {
        return None;
    }
    let frame = transcoder
        .to_client(carry)
        .ok()
        .map(|bytes| ClientFrame::from_backend_bytes(bytes.into_owned()));
    if frame.is_none() {
        debug!(pending = carry.len(), "dropping incomplete trailing character");
    }
    carry.clear();
    frame
}

// ── Tests ─────────────────────────────────────────────────────────────────────

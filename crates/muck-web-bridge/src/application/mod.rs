//! Application layer: the per-session relay and its teardown.
//!
//! Nothing in here knows about axum or TCP sockets.  The relay is generic
//! over a frame `Stream`/`Sink` on the browser side and
//! `AsyncRead`/`AsyncWrite` on the MUCK side, which is what lets the tests
//! drive it with channels and in-memory pipes.

pub mod endpoints;
pub mod relay;
pub mod shutdown;

pub use endpoints::{CloseOutcome, EndpointPair, ReleaseReport};
pub use relay::{PumpExit, Relay, RelayOutcome, READ_CHUNK_SIZE};
pub use shutdown::{RelayState, ShutdownSignal};

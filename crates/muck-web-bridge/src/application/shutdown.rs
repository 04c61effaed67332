//! The once-only shutdown signal shared by the two pumps of a session.
//!
//! ```text
//!  Idle ──spawn pumps──▶ Running ──first failure──▶ Draining ──release──▶ Closed
//! ```
//!
//! Whichever pump fails first calls [`ShutdownSignal::fire`].  That call
//! records which direction failed, moves the state to
//! [`RelayState::Draining`], and cancels the token every pump is waiting on.
//! Any later `fire` is a no-op that returns `false`, so the shutdown action
//! happens exactly once no matter how the two pumps race.

use std::sync::{Arc, OnceLock};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::Direction;

/// Lifecycle of one relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Both endpoints are acquired; no pump is running yet.
    Idle,
    /// Both pumps are moving data.
    Running,
    /// One pump has failed; waiting for both to leave their loops.
    Draining,
    /// Both pumps have stopped and both channels are released.
    Closed,
}

/// Shared handle to a session's one-shot shutdown.  Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    trigger: OnceLock<Direction>,
    token: CancellationToken,
    state: watch::Sender<RelayState>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RelayState::Idle);
        Self {
            inner: Arc::new(Inner {
                trigger: OnceLock::new(),
                token: CancellationToken::new(),
                state,
            }),
        }
    }

    /// Fires the signal on behalf of the pump moving data in `direction`.
    ///
    /// Returns `true` only for the call that actually fired it.
    pub fn fire(&self, direction: Direction) -> bool {
        if self.inner.trigger.set(direction).is_err() {
            return false;
        }
        self.inner.state.send_replace(RelayState::Draining);
        self.inner.token.cancel();
        true
    }

    /// Completes once the signal has fired.  Cancel-safe.
    pub async fn fired(&self) {
        self.inner.token.cancelled().await
    }

    /// The direction whose failure fired the signal.
    pub fn trigger(&self) -> Option<Direction> {
        self.inner.trigger.get().copied()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<RelayState> {
        self.inner.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: RelayState) {
        self.inner.state.send_replace(state);
    }

    /// Returns a guard that fires the signal when dropped.
    ///
    /// A pump holds one for its whole run so that even a panicking pump
    /// releases the other one from its loop.
    pub(crate) fn fire_on_drop(&self, direction: Direction) -> FireOnDrop {
        FireOnDrop {
            signal: self.clone(),
            direction,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct FireOnDrop {
    signal: ShutdownSignal,
    direction: Direction,
}

impl Drop for FireOnDrop {
    fn drop(&mut self) {
        self.signal.fire(self.direction);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

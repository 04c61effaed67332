//! Session identity, pump direction, and the session error taxonomy.

use std::fmt;

use muck_core::TranscodeError;
use thiserror::Error;
use uuid::Uuid;

/// Random identifier attached to every log line of one session.
///
/// It exists only for the lifetime of the session and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which way a relay pump moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Browser → MUCK.
    Inbound,
    /// MUCK → Browser.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => f.write_str("browser→muck"),
            Direction::Outbound => f.write_str("muck→browser"),
        }
    }
}

/// Everything that can end a session.
///
/// Every variant is terminal: nothing in the bridge retries.  The two
/// acquisition failures ([`SessionError::Upgrade`], [`SessionError::Dial`])
/// happen before any pump starts; the rest are produced by a pump and carry
/// its [`Direction`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The WebSocket upgrade could not be completed.
    #[error("websocket upgrade failed: {0}")]
    Upgrade(String),

    /// The TCP connection to the MUCK could not be opened.
    #[error("failed to connect to muck at {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from the pump's source failed.
    #[error("{direction}: read failed: {reason}")]
    Read { direction: Direction, reason: String },

    /// Writing to the pump's destination failed.
    #[error("{direction}: write failed: {reason}")]
    Write { direction: Direction, reason: String },

    /// A chunk could not be converted between charsets.
    #[error("{direction}: {source}")]
    Transcode {
        direction: Direction,
        #[source]
        source: TranscodeError,
    },

    /// The pump's source closed the connection.
    #[error("{direction}: remote closed the connection")]
    Closed { direction: Direction },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Inbound.to_string(), "browser→muck");
        assert_eq!(Direction::Outbound.to_string(), "muck→browser");
    }

    #[test]
    fn test_pump_errors_name_their_direction() {
        let err = SessionError::Transcode {
            direction: Direction::Outbound,
            source: TranscodeError::MalformedGbk,
        };
        assert_eq!(err.to_string(), "muck→browser: input is not well-formed GBK");
    }

    #[test]
    fn test_dial_error_names_the_address() {
        let err = SessionError::Dial {
            addr: "localhost:4021".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert!(err.to_string().starts_with("failed to connect to muck at localhost:4021"));
    }
}

//! The unit of data exchanged with the browser.
//!
//! One WebSocket data frame is one relay unit; the bridge never splits or
//! joins frames.  Control frames (ping/pong) are answered by the WebSocket
//! layer and never become a [`ClientFrame`].

/// A single message on the browser side of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A WebSocket text frame.  This is what browsers send, and what the
    /// bridge sends back whenever the MUCK output is valid UTF-8.
    Text(String),
    /// A WebSocket binary frame.
    Binary(Vec<u8>),
    /// The browser started the close handshake.
    Close,
}

impl ClientFrame {
    /// Wraps MUCK output (already converted for the browser) in a frame.
    ///
    /// Valid UTF-8 becomes a text frame.  Anything else can only come from a
    /// UTF-8 MUCK sending non-UTF-8 bytes; those bytes go out unchanged as a
    /// binary frame rather than being altered.
    pub fn from_backend_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => ClientFrame::Text(text),
            Err(e) => ClientFrame::Binary(e.into_bytes()),
        }
    }

    /// The payload to forward to the MUCK, or `None` for a close frame.
    pub fn into_payload(self) -> Option<Vec<u8>> {
        match self {
            ClientFrame::Text(text) => Some(text.into_bytes()),
            ClientFrame::Binary(bytes) => Some(bytes),
            ClientFrame::Close => None,
        }
    }
}

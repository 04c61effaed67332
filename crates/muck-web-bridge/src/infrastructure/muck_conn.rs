//! TCP connection to the MUCK.
//!
//! Each browser session gets its own TCP connection.  The MUCK sees the
//! bridge as an ordinary telnet client; no telnet option negotiation is done
//! and bytes are passed through as they are.

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::domain::SessionError;

/// An open connection to the MUCK, already split so that each relay pump can
/// own one half.
pub struct MuckConnection {
    /// Read half: owned by the muck→browser pump.
    pub read_half: OwnedReadHalf,
    /// Write half: owned by the browser→muck pump, shut down on release.
    pub write_half: OwnedWriteHalf,
}

impl MuckConnection {
    /// Dials `addr` (`host:port`).  Hostnames are resolved on every call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Dial`] if the name does not resolve or no
    /// resolved address accepts the connection.
    pub async fn connect(addr: &str) -> Result<Self, SessionError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| SessionError::Dial {
                addr: addr.to_string(),
                source,
            })?;

        // Telnet traffic is small and interactive.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY on muck connection: {e}");
        }

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            read_half,
            write_half,
        })
    }
}

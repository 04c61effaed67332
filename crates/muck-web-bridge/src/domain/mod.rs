//! Domain layer for muck-web-bridge.
//!
//! Plain types with no dependencies on sockets, tokio, or axum:
//!
//! - Configuration ([`BridgeConfig`])
//! - The unit of data on the browser side ([`ClientFrame`])
//! - Session identity and pump direction ([`SessionId`], [`Direction`])
//! - The session error taxonomy ([`SessionError`])

pub mod config;
pub mod frame;
pub mod session;

pub use config::{BridgeConfig, ConfigError};
pub use frame::ClientFrame;
pub use session::{Direction, SessionError, SessionId};

//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is built once at startup in `main.rs` (defaults, then an optional TOML
//! file, then CLI flags) and is immutable afterwards: every session reads
//! the same `Arc<BridgeConfig>`.
//!
//! # Config file format
//!
//! ```toml
//! listen_addr = "0.0.0.0:8000"
//! muck_addr   = "muck.example.org:4021"
//! charset     = "gbk"
//! ```
//!
//! Every key is optional; missing keys take the values from
//! [`BridgeConfig::default`].  Unknown keys are rejected so that a typo does
//! not silently fall back to a default.

use std::path::{Path, PathBuf};

use muck_core::{Charset, Transcoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// An address is not of the form `host:port`.
    #[error("invalid {field} '{value}': expected host:port")]
    InvalidAddress { field: &'static str, value: String },
}

/// All runtime configuration for the bridge.
///
/// # Example
///
/// ```rust
/// use muck_web_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.muck_addr, "localhost:4021");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// `host:port` the HTTP/WebSocket listener binds to.
    pub listen_addr: String,

    /// `host:port` of the MUCK's telnet port.  Hostnames are resolved each
    /// time a session dials.
    pub muck_addr: String,

    /// Charset spoken by the MUCK.  [`Charset::Gbk`] turns on re-encoding.
    pub charset: Charset,
}

impl Default for BridgeConfig {
    /// | Field       | Default          |
    /// |-------------|------------------|
    /// | listen_addr | `localhost:8000` |
    /// | muck_addr   | `localhost:4021` |
    /// | charset     | `utf8`           |
    fn default() -> Self {
        Self {
            listen_addr: "localhost:8000".to_string(),
            muck_addr: "localhost:4021".to_string(),
            charset: Charset::Utf8,
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::InvalidAddress`] if an address fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and validates the TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`BridgeConfig::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that both addresses look like `host:port`.
    ///
    /// This does not resolve hostnames; an unresolvable MUCK host shows up
    /// later as a dial failure for the session that tried it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_host_port("listen_addr", &self.listen_addr)?;
        check_host_port("muck_addr", &self.muck_addr)
    }

    /// The transcoder every relay pump of every session uses.
    pub fn transcoder(&self) -> Transcoder {
        Transcoder::new(self.charset)
    }
}

fn check_host_port(field: &'static str, value: &str) -> Result<(), ConfigError> {
    match value.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(ConfigError::InvalidAddress {
            field,
            value: value.to_string(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

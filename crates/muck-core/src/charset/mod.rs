//! Charset mode and byte-level transcoding.
//!
//! The browser side of the bridge is always UTF-8 (WebSocket text frames
//! must be valid UTF-8).  The MUCK side is either UTF-8 as well, in which
//! case nothing needs converting, or GBK.

pub mod transcoder;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use transcoder::{TranscodeError, Transcoder};

/// The charset spoken by the MUCK server.
///
/// This is the "charset mode" flag: [`Charset::Utf8`] means the mode is off
/// and every byte is forwarded untouched; [`Charset::Gbk`] turns on
/// re-encoding in both directions.
///
/// In a TOML config file it is written in lowercase:
///
/// ```rust
/// use muck_core::Charset;
///
/// #[derive(serde::Deserialize)]
/// struct Cfg { charset: Charset }
///
/// let cfg: Cfg = toml::from_str(r#"charset = "gbk""#).unwrap();
/// assert_eq!(cfg.charset, Charset::Gbk);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    /// The MUCK speaks UTF-8; no transcoding.
    #[default]
    #[serde(alias = "utf-8")]
    Utf8,
    /// The MUCK speaks GBK (simplified Chinese double-byte charset).
    Gbk,
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Utf8 => f.write_str("utf8"),
            Charset::Gbk => f.write_str("gbk"),
        }
    }
}

//! Stateless conversion between the browser's UTF-8 and the MUCK's charset.
//!
//! ```text
//! Browser → MUCK:  UTF-8 bytes → MUCK charset     call: Transcoder::to_backend()
//! MUCK → Browser:  MUCK charset → UTF-8 bytes     call: Transcoder::to_client()
//! ```
//!
//! Both functions return a [`Cow`] so the identity case (and pure-ASCII
//! input, which is byte-identical in GBK and UTF-8) borrows the input
//! instead of copying it.
//!
//! # Strictness
//!
//! Conversion never substitutes replacement characters.  Input that cannot
//! be converted is an error, and the caller is expected to give up on the
//! whole session rather than forward mangled text.

use std::borrow::Cow;

use encoding_rs::GBK;
use thiserror::Error;

use super::Charset;

/// Errors produced when a byte sequence cannot be converted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscodeError {
    /// Bytes headed for a GBK MUCK were not valid UTF-8.
    #[error("input is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },

    /// The text contains a character that has no GBK encoding (e.g. emoji).
    #[error("input contains characters that cannot be encoded as GBK")]
    Unmappable,

    /// Bytes from the MUCK were not a well-formed GBK sequence.
    #[error("input is not well-formed GBK")]
    MalformedGbk,
}

/// Converts byte buffers between the browser's and the MUCK's charset.
///
/// A `Transcoder` is just the [`Charset`] it was built for; it is `Copy` and
/// holds no buffers, so each relay direction can own one.
///
/// # Example
///
/// ```rust
/// use muck_core::{Charset, Transcoder};
///
/// let gbk = Transcoder::new(Charset::Gbk);
/// let wire = gbk.to_backend("你好".as_bytes()).unwrap();
/// assert_eq!(&wire[..], &[0xC4, 0xE3, 0xBA, 0xC3]);
/// assert_eq!(&gbk.to_client(&wire).unwrap()[..], "你好".as_bytes());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transcoder {
    charset: Charset,
}

impl Transcoder {
    pub const fn new(charset: Charset) -> Self {
        Self { charset }
    }

    /// The charset this transcoder converts to and from.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Converts bytes received from the browser into the MUCK's charset.
    ///
    /// # Errors
    ///
    /// In GBK mode, returns [`TranscodeError::InvalidUtf8`] if `bytes` is not
    /// UTF-8 and [`TranscodeError::Unmappable`] if a character has no GBK
    /// form.  Never fails in UTF-8 mode.
    pub fn to_backend<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, TranscodeError> {
        match self.charset {
            Charset::Utf8 => Ok(Cow::Borrowed(bytes)),
            Charset::Gbk => {
                let text = std::str::from_utf8(bytes).map_err(|e| TranscodeError::InvalidUtf8 {
                    valid_up_to: e.valid_up_to(),
                })?;
                let (encoded, _, had_errors) = GBK.encode(text);
                if had_errors {
                    return Err(TranscodeError::Unmappable);
                }
                Ok(encoded)
            }
        }
    }

    /// Converts bytes received from the MUCK into UTF-8 for the browser.
    ///
    /// # Errors
    ///
    /// In GBK mode, returns [`TranscodeError::MalformedGbk`] for any invalid
    /// or truncated sequence.  Never fails in UTF-8 mode.
    pub fn to_client<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>, TranscodeError> {
        match self.charset {
            Charset::Utf8 => Ok(Cow::Borrowed(bytes)),
            Charset::Gbk => match GBK.decode_without_bom_handling_and_without_replacement(bytes) {
                Some(Cow::Borrowed(text)) => Ok(Cow::Borrowed(text.as_bytes())),
                Some(Cow::Owned(text)) => Ok(Cow::Owned(text.into_bytes())),
                None => Err(TranscodeError::MalformedGbk),
            },
        }
    }

    /// Returns the length of the longest prefix of MUCK-side `bytes` that
    /// does not stop in the middle of a multi-byte character.
    ///
    /// TCP reads are cut at arbitrary byte offsets, so a double-byte GBK
    /// character (or a multi-byte UTF-8 one) can arrive in two pieces.  The
    /// bytes after the returned length are an incomplete character and
    /// should be kept until the next read completes them.
    ///
    /// Only *incomplete* trailing sequences are held back.  Invalid bytes
    /// count as complete so they reach [`Transcoder::to_client`] and fail
    /// there instead of piling up.
    pub fn complete_prefix_len(&self, bytes: &[u8]) -> usize {
        match self.charset {
            Charset::Utf8 => utf8_complete_prefix_len(bytes),
            Charset::Gbk => gbk_complete_prefix_len(bytes),
        }
    }
}

fn utf8_complete_prefix_len(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        // `error_len() == None` means the input ended mid-character.
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => bytes.len(),
    }
}

fn gbk_complete_prefix_len(bytes: &[u8]) -> usize {
    let mut i = 0;
    while i < bytes.len() {
        let width = match bytes[i] {
            0x81..=0xFE => match bytes.get(i + 1) {
                None => return i,
                // GB18030 four-byte form: lead, digit, lead, digit.
                Some(0x30..=0x39) => 4,
                Some(_) => 2,
            },
            _ => 1,
        };
        if i + width > bytes.len() {
            return i;
        }
        i += width;
    }
    bytes.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

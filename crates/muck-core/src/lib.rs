//! # muck-core
//!
//! Shared library for the MUCK WebSocket bridge containing the charset
//! transcoder that sits between the browser (always UTF-8) and a MUCK server
//! that may speak the legacy GBK double-byte charset.
//!
//! This crate has no dependencies on sockets, async runtimes, or WebSocket
//! libraries.  Every function here is a pure computation over byte slices,
//! which is what lets both relay directions call it concurrently.
//!
//! # Overview
//!
//! - **`charset`** – The [`Charset`] mode flag and the [`Transcoder`] built
//!   from it.  `to_backend` converts browser bytes into the MUCK's charset,
//!   `to_client` converts MUCK bytes back for the browser.  With
//!   [`Charset::Utf8`] both directions are the identity function.

pub mod charset;

pub use charset::{Charset, TranscodeError, Transcoder};

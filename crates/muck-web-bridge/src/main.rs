//! MUCK WebSocket Bridge: entry point.
//!
//! This binary accepts WebSocket connections from web browsers and proxies
//! each one to its own telnet (raw TCP) connection to a MUCK server.  With
//! `--gbk` it also re-encodes text between the browser's UTF-8 and the
//! MUCK's GBK.
//!
//! # Usage
//!
//! ```text
//! muck-web-bridge [OPTIONS]
//!
//! Options:
//!   --addr   <HOST:PORT>  Address to listen on [default: localhost:8000]
//!   --muck   <HOST:PORT>  MUCK telnet address  [default: localhost:4021]
//!   --gbk                 The MUCK speaks GBK; re-encode to and from UTF-8
//!   --config <PATH>       TOML config file
//! ```
//!
//! # Configuration sources
//!
//! Built-in defaults, then the TOML file (if any), then flags.  Each flag can
//! also be given as an environment variable:
//!
//! | Variable             | Flag       |
//! |----------------------|------------|
//! | `MUCK_BRIDGE_ADDR`   | `--addr`   |
//! | `MUCK_BRIDGE_MUCK`   | `--muck`   |
//! | `MUCK_BRIDGE_GBK`    | `--gbk`    |
//! | `MUCK_BRIDGE_CONFIG` | `--config` |
//!
//! `--gbk` can only switch GBK on.  A config file that sets
//! `charset = "gbk"` is not overridden by leaving the flag out.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use muck_core::Charset;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use muck_web_bridge::domain::BridgeConfig;
use muck_web_bridge::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// MUCK WebSocket bridge.
///
/// Lets browsers connect to a telnet-only MUCK over WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "muck-web-bridge",
    about = "WebSocket-to-telnet bridge for MUCK servers",
    version
)]
struct Cli {
    /// `host:port` to accept browser connections on.
    #[arg(long, env = "MUCK_BRIDGE_ADDR")]
    addr: Option<String>,

    /// `host:port` of the MUCK's telnet port.
    #[arg(long, env = "MUCK_BRIDGE_MUCK")]
    muck: Option<String>,

    /// The MUCK speaks GBK: encode browser input to GBK and decode MUCK
    /// output from GBK.
    #[arg(long, env = "MUCK_BRIDGE_GBK")]
    gbk: bool,

    /// Optional TOML config file.  Flags override its values.
    #[arg(long, env = "MUCK_BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges defaults, the config file, and flags into a [`BridgeConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the merged addresses are not `host:port`.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => BridgeConfig::default(),
        };

        if let Some(addr) = self.addr {
            config.listen_addr = addr;
        }
        if let Some(muck) = self.muck {
            config.muck_addr = muck;
        }
        if self.gbk {
            config.charset = Charset::Gbk;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` controls the level; `info` when unset or invalid.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_bridge_config()?;

    info!(
        "MUCK web bridge starting — listen={}, muck={}, charset={}",
        config.listen_addr, config.muck_addr, config.charset
    );

    // Ctrl+C stops accepting new connections.
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C — shutting down"),
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    run_server(config, shutdown).await?;

    info!("MUCK web bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

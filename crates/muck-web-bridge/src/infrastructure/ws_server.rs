//! HTTP listener, WebSocket upgrade, and per-session wiring.
//!
//! This module is responsible for:
//!
//! 1. Binding the HTTP listener on the configured address.
//! 2. Routing: only `GET /` is served.  Any other path is `404 Not found`,
//!    any other method on `/` (`HEAD` included) is `405 Method not allowed`.
//! 3. Upgrading `GET /` to a WebSocket.  A request that cannot be upgraded
//!    is answered `500 Error creating websocket`.
//! 4. Dialing the MUCK for each upgraded session and handing both
//!    connections to a [`Relay`].
//! 5. Releasing both connections once the relay has stopped.
//!
//! Each session runs on its own Tokio task (spawned by hyper for the
//! upgraded connection) inside a `session` tracing span.  Sessions share
//! nothing but the immutable [`BridgeConfig`].

use std::future::{self, Future};
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, Instrument};

use crate::application::{EndpointPair, Relay};
use crate::domain::{BridgeConfig, ClientFrame, SessionError, SessionId};
use crate::infrastructure::muck_conn::MuckConnection;

/// Body of the response to a `GET /` that is not a valid WebSocket upgrade.
pub const UPGRADE_FAILED_BODY: &str = "Error creating websocket\n";

/// Body of the response to any path other than `/`.
pub const NOT_FOUND_BODY: &str = "Not found\n";

/// Body of the response to any method other than `GET` on `/`.
pub const METHOD_NOT_ALLOWED_BODY: &str = "Method not allowed\n";

/// State shared by every request handler.
#[derive(Clone)]
struct AppState {
    config: Arc<BridgeConfig>,
}

/// Builds the bridge's router: a single WebSocket endpoint at `/`.
///
/// axum serves `HEAD` with the `GET` handler when no `HEAD` handler is
/// registered, so `HEAD` gets an explicit 405.
pub fn build_router(config: Arc<BridgeConfig>) -> Router {
    Router::new()
        .route(
            "/",
            get(ws_handler)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .with_state(AppState { config })
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response()
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_BODY).into_response()
}

// ── Server ────────────────────────────────────────────────────────────────────

/// A bound, not yet serving, bridge listener.
///
/// Binding and serving are separate steps so that callers (and tests) can
/// learn the actual local address when binding to port `0`.
pub struct BridgeServer {
    listener: TcpListener,
    router: Router,
}

impl BridgeServer {
    /// Binds `config.listen_addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be resolved or bound (port in
    /// use, missing permission).
    pub async fn bind(config: BridgeConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("failed to bind listener on {}", config.listen_addr))?;

        Ok(Self {
            listener,
            router: build_router(Arc::new(config)),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until `shutdown` completes.
    ///
    /// Once `shutdown` completes no new connections are accepted.  Sessions
    /// that were already upgraded are not waited for.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = self.local_addr().context("listener has no local address")?;
        info!("muck web bridge listening on {local_addr}");

        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")
    }
}

/// Binds `config.listen_addr` and serves until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn run_server<F>(config: BridgeConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    BridgeServer::bind(config).await?.serve(shutdown).await
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `GET /`: upgrade to a WebSocket, then proxy to the MUCK.
///
/// The upgrade extractor is taken as a `Result` so that a failed upgrade is
/// answered with our own `500` instead of axum's default rejection.
async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => {
            let err = SessionError::Upgrade(rejection.to_string());
            error!(%peer, "{err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, UPGRADE_FAILED_BODY).into_response();
        }
    };

    let span = info_span!("session", id = %SessionId::new(), %peer);
    let failed_span = span.clone();

    ws.on_failed_upgrade(move |e: axum::Error| {
        let err = SessionError::Upgrade(e.to_string());
        failed_span.in_scope(|| error!("{err}"));
    })
    .on_upgrade(move |socket| handle_session(socket, peer, state.config).instrument(span))
}

/// Runs one session from the completed upgrade to the released connections.
///
/// Never returns an error: every failure is logged here and ends only this
/// session.
async fn handle_session(socket: WebSocket, peer: SocketAddr, config: Arc<BridgeConfig>) {
    info!("opening a proxy for {peer}");

    let (ws_tx, ws_rx) = socket.split();
    let client_rx = ws_rx.filter_map(|msg| future::ready(client_frame(msg)));
    let client_tx = ws_tx.with(|frame: ClientFrame| {
        future::ready(Ok::<Message, axum::Error>(Message::from(frame)))
    });

    let muck = match MuckConnection::connect(&config.muck_addr).await {
        Ok(muck) => muck,
        Err(e) => {
            error!("{e}");
            EndpointPair::<_, OwnedWriteHalf>::client_only(client_tx)
                .release()
                .await;
            return;
        }
    };

    let transcoder = config.transcoder();
    info!(
        charset = %transcoder.charset(),
        "connection open, proxying {peer} <-> {}", config.muck_addr
    );

    let outcome = Relay::new(transcoder, peer)
        .run(client_rx, client_tx, muck.read_half, muck.write_half)
        .await;
    debug!(inbound = ?outcome.inbound, outbound = ?outcome.outbound, "relay stopped");

    let trigger = outcome.trigger;
    let report = outcome.release().await;
    info!(
        trigger = ?trigger,
        client = ?report.client,
        muck = ?report.backend,
        "proxying completed"
    );
}

// ── Frame adapters ────────────────────────────────────────────────────────────

/// Maps an incoming WebSocket message to a relay frame.
///
/// Ping and pong are handled by the WebSocket layer and are filtered out.
fn client_frame(msg: Result<Message, axum::Error>) -> Option<Result<ClientFrame, axum::Error>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(ClientFrame::Text(text.as_str().to_owned()))),
        Ok(Message::Binary(bytes)) => Some(Ok(ClientFrame::Binary(bytes.to_vec()))),
        Ok(Message::Close(_)) => Some(Ok(ClientFrame::Close)),
        Ok(Message::Ping(_) | Message::Pong(_)) => None,
        Err(e) => Some(Err(e)),
    }
}

impl From<ClientFrame> for Message {
    fn from(frame: ClientFrame) -> Self {
        match frame {
            ClientFrame::Text(text) => Message::Text(text.into()),
            ClientFrame::Binary(bytes) => Message::Binary(bytes.into()),
            ClientFrame::Close => Message::Close(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

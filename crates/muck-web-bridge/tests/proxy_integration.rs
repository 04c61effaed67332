//! End-to-end tests: a real bridge listener, a fake MUCK, and a
//! tokio-tungstenite client playing the browser.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use muck_core::Charset;
use muck_web_bridge::domain::BridgeConfig;
use muck_web_bridge::infrastructure::BridgeServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Browser = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);
const NI_HAO_GBK: [u8; 4] = [0xC4, 0xE3, 0xBA, 0xC3];

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Starts a bridge on an ephemeral port that forwards to `muck_addr`.
async fn start_bridge(muck_addr: String, charset: Charset) -> SocketAddr {
    let config = BridgeConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        muck_addr,
        charset,
    };
    let server = BridgeServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve(std::future::pending()));
    addr
}

/// A listener standing in for the MUCK.
async fn fake_muck() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

async fn connect_browser(bridge: SocketAddr) -> Browser {
    let (ws, _response) = connect_async(format!("ws://{bridge}/")).await.unwrap();
    ws
}

async fn accept_muck(listener: &TcpListener) -> TcpStream {
    tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("bridge should dial the muck")
        .unwrap()
        .0
}

/// Collects text frames until `expected` has been received in full.
async fn read_text(browser: &mut Browser, expected: &str) -> String {
    let mut text = String::new();
    while text.len() < expected.len() {
        let msg = tokio::time::timeout(WAIT, browser.next())
            .await
            .expect("browser should receive muck output")
            .expect("websocket ended early")
            .unwrap();
        match msg {
            Message::Text(chunk) => text.push_str(&chunk),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
    text
}

/// Waits until the browser's WebSocket is closed by the bridge.
async fn expect_closed(browser: &mut Browser) {
    let closed = tokio::time::timeout(WAIT, async {
        loop {
            match browser.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "bridge should close the websocket");
}

/// Sends a raw HTTP request and returns the whole response.
async fn raw_http(bridge: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(bridge).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    tokio::time::timeout(WAIT, stream.read_to_end(&mut response))
        .await
        .expect("server should answer and close")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

// ── Relaying ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_utf8_mode_relays_both_ways_unchanged() {
    // Arrange
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;
    let mut browser = connect_browser(bridge).await;
    let mut muck_side = accept_muck(&muck).await;

    // Act 1: browser → MUCK
    browser
        .send(Message::Text("connect guest guest\n".into()))
        .await
        .unwrap();
    let mut buf = vec![0u8; "connect guest guest\n".len()];
    muck_side.read_exact(&mut buf).await.unwrap();

    // Act 2: MUCK → browser
    muck_side.write_all("Welcome, 游客!\r\n".as_bytes()).await.unwrap();

    // Assert
    assert_eq!(buf, b"connect guest guest\n");
    assert_eq!(
        read_text(&mut browser, "Welcome, 游客!\r\n").await,
        "Welcome, 游客!\r\n"
    );
}

#[tokio::test]
async fn test_gbk_mode_reencodes_both_ways() {
    // Arrange
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Gbk).await;
    let mut browser = connect_browser(bridge).await;
    let mut muck_side = accept_muck(&muck).await;

    // Act 1: the browser's UTF-8 reaches the MUCK as GBK.
    browser.send(Message::Text("你好".into())).await.unwrap();
    let mut buf = [0u8; 4];
    muck_side.read_exact(&mut buf).await.unwrap();

    // Act 2: the MUCK's GBK reaches the browser as UTF-8.
    muck_side.write_all(&NI_HAO_GBK).await.unwrap();

    // Assert
    assert_eq!(buf, NI_HAO_GBK);
    assert_eq!(read_text(&mut browser, "你好").await, "你好");
}

#[tokio::test]
async fn test_gbk_mode_unmappable_input_ends_session() {
    // Arrange
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Gbk).await;
    let mut browser = connect_browser(bridge).await;
    let mut muck_side = accept_muck(&muck).await;

    // Act: an emoji has no GBK encoding.
    browser.send(Message::Text("😀".into())).await.unwrap();

    // Assert: nothing reaches the MUCK and both sides are closed.
    let mut rest = Vec::new();
    let n = tokio::time::timeout(WAIT, muck_side.read_to_end(&mut rest))
        .await
        .expect("bridge should close the muck connection")
        .unwrap();
    assert_eq!(n, 0);
    expect_closed(&mut browser).await;
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_muck_closing_closes_websocket() {
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;
    let mut browser = connect_browser(bridge).await;
    let muck_side = accept_muck(&muck).await;

    drop(muck_side);

    expect_closed(&mut browser).await;
}

#[tokio::test]
async fn test_browser_closing_closes_muck_connection() {
    // Arrange
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;
    let mut browser = connect_browser(bridge).await;
    let mut muck_side = accept_muck(&muck).await;

    // Act
    browser.close(None).await.unwrap();

    // Assert: the MUCK sees EOF.
    let mut rest = Vec::new();
    let n = tokio::time::timeout(WAIT, muck_side.read_to_end(&mut rest))
        .await
        .expect("bridge should close the muck connection")
        .unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_unreachable_muck_closes_websocket() {
    // Arrange: a port nothing listens on.
    let (muck, muck_addr) = fake_muck().await;
    drop(muck);
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;

    // Act: the upgrade itself succeeds; the dial happens afterwards.
    let mut browser = connect_browser(bridge).await;

    // Assert
    expect_closed(&mut browser).await;
}

#[tokio::test]
async fn test_sessions_are_independent() {
    // Arrange: two browsers, two MUCK connections.
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;
    let mut first = connect_browser(bridge).await;
    let first_muck = accept_muck(&muck).await;
    let mut second = connect_browser(bridge).await;
    let mut second_muck = accept_muck(&muck).await;

    // Act: the first session's MUCK connection goes away.
    drop(first_muck);
    expect_closed(&mut first).await;

    // Assert: the second session still relays.
    second.send(Message::Text("look\n".into())).await.unwrap();
    let mut buf = [0u8; 5];
    second_muck.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"look\n");

    second_muck.write_all(b"You see a room.\r\n").await.unwrap();
    assert_eq!(
        read_text(&mut second, "You see a room.\r\n").await,
        "You see a room.\r\n"
    );
}

// ── HTTP surface ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_path_is_404_and_never_dials() {
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;

    let response = raw_http(
        bridge,
        "GET /other HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 404"), "got: {response}");
    assert!(response.ends_with("Not found\n"), "got: {response}");
    let dialed = tokio::time::timeout(Duration::from_millis(200), muck.accept()).await;
    assert!(dialed.is_err(), "no muck connection may be opened");
}

#[tokio::test]
async fn test_post_root_is_405_and_never_dials() {
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;

    let response = raw_http(
        bridge,
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 405"), "got: {response}");
    assert!(response.ends_with("Method not allowed\n"), "got: {response}");
    let dialed = tokio::time::timeout(Duration::from_millis(200), muck.accept()).await;
    assert!(dialed.is_err(), "no muck connection may be opened");
}

#[tokio::test]
async fn test_head_root_is_405_and_never_dials() {
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;

    let response = raw_http(
        bridge,
        "HEAD / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 405"), "got: {response}");
    let dialed = tokio::time::timeout(Duration::from_millis(200), muck.accept()).await;
    assert!(dialed.is_err(), "no muck connection may be opened");
}

#[tokio::test]
async fn test_plain_get_root_is_500_and_never_dials() {
    let (muck, muck_addr) = fake_muck().await;
    let bridge = start_bridge(muck_addr, Charset::Utf8).await;

    let response = raw_http(
        bridge,
        "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 500"), "got: {response}");
    assert!(response.ends_with("Error creating websocket\n"), "got: {response}");
    let dialed = tokio::time::timeout(Duration::from_millis(200), muck.accept()).await;
    assert!(dialed.is_err(), "no muck connection may be opened");
}

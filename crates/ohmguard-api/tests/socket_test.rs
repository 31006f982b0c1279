#![allow(clippy::unwrap_used)]
// Integration tests for `SocketHandle` against an in-process WebSocket
// server speaking the Engine.IO / Socket.IO handshake.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use ohmguard_api::{ReconnectConfig, SocketHandle, SocketState};

const OPEN: &str =
    r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
const WAIT: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

async fn listen() -> (TcpListener, Url) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let url = Url::parse(&format!(
        "ws://{addr}/api/socket.io/?EIO=4&transport=websocket"
    ))
    .unwrap();
    (listener, url)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn send(ws: &mut WebSocketStream<TcpStream>, text: &str) {
    ws.send(Message::Text(text.to_owned().into())).await.unwrap();
}

/// Next text frame from the client, skipping control frames.
async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
            Some(Ok(_)) => {}
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Run the server side of a successful handshake; returns the client's
/// connect packet and join packet.
async fn handshake(ws: &mut WebSocketStream<TcpStream>) -> (String, String) {
    send(ws, OPEN).await;
    let connect = next_text(ws).await;
    send(ws, r#"40{"sid":"ns-1"}"#).await;
    let join = next_text(ws).await;
    (connect, join)
}

fn fast_reconnect(max_retries: u32) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        max_retries: Some(max_retries),
    }
}

fn token() -> SecretString {
    SecretString::from("tok-123".to_owned())
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn joins_room_streams_events_and_leaves_on_shutdown() {
    let (listener, url) = listen().await;

    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let (connect, join) = handshake(&mut ws).await;
        send(&mut ws, r#"42["joined",{"tenant_id":"tenant-1","room":"tenant_tenant-1"}]"#).await;
        send(
            &mut ws,
            r#"42["new_event",{"type":"new_event","event":{"id":"evt-1","type":"FALL"}}]"#,
        )
        .await;
        send(&mut ws, "2").await;
        let pong = next_text(&mut ws).await;
        let leave = next_text(&mut ws).await;
        (connect, join, pong, leave)
    });

    let handle = SocketHandle::connect(
        url,
        "tenant-1".into(),
        token(),
        ReconnectConfig::default(),
        CancellationToken::new(),
    )
    .unwrap();
    let mut frames = handle.subscribe();

    let joined = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
    assert_eq!(joined.name, "joined");
    assert_eq!(joined.payload["room"], "tenant_tenant-1");

    let new_event = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
    assert_eq!(new_event.name, "new_event");
    assert_eq!(new_event.payload["event"]["id"], "evt-1");
    assert_eq!(*handle.state().borrow(), SocketState::Connected);
    assert_eq!(handle.retry_count(), 0);

    // Give the pong a moment to go out before tearing down.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shutdown().await;

    let (connect, join, pong, leave) = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(connect, r#"40{"token":"tok-123"}"#);
    assert_eq!(join, r#"42["join_tenant",{"tenant_id":"tenant-1"}]"#);
    assert_eq!(pong, "3");
    assert_eq!(leave, r#"42["leave_tenant",{"tenant_id":"tenant-1"}]"#);
}

#[tokio::test]
async fn rejoins_room_after_server_drop() {
    let (listener, url) = listen().await;

    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        let (_, first_join) = handshake(&mut first).await;
        first.close(None).await.unwrap();
        drop(first);

        let mut second = accept(&listener).await;
        let (_, second_join) = handshake(&mut second).await;
        send(&mut second, r#"42["new_event",{"type":"new_event","event":{"id":"evt-2"}}]"#).await;
        // Keep the connection open until the client leaves.
        let _ = next_text(&mut second).await;
        (first_join, second_join)
    });

    let handle = SocketHandle::connect(
        url,
        "tenant-1".into(),
        token(),
        fast_reconnect(3),
        CancellationToken::new(),
    )
    .unwrap();
    let mut frames = handle.subscribe();

    let frame = timeout(WAIT, frames.recv()).await.unwrap().unwrap();
    assert_eq!(frame.payload["event"]["id"], "evt-2");
    assert_eq!(*handle.state().borrow(), SocketState::Connected);

    handle.shutdown().await;
    let (first_join, second_join) = timeout(WAIT, server).await.unwrap().unwrap();
    assert_eq!(first_join, second_join);
    assert!(second_join.contains("join_tenant"));
}

#[tokio::test]
async fn connect_error_exhausts_retries_and_disconnects() {
    let (listener, url) = listen().await;

    // Refuse the namespace on every attempt: 1 initial + 2 retries.
    let server = tokio::spawn(async move {
        for _ in 0..3 {
            let mut ws = accept(&listener).await;
            send(&mut ws, OPEN).await;
            let _connect = next_text(&mut ws).await;
            send(&mut ws, r#"44{"message":"Not authorized"}"#).await;
        }
    });

    let handle = SocketHandle::connect(
        url,
        "tenant-1".into(),
        token(),
        fast_reconnect(2),
        CancellationToken::new(),
    )
    .unwrap();
    let mut state = handle.state();

    timeout(WAIT, state.wait_for(|s| *s == SocketState::Disconnected))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handle.retry_count(), 2);

    handle.shutdown().await;
    timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_server_settles_disconnected() {
    // Bind then drop to get a port nobody listens on.
    let (listener, url) = listen().await;
    drop(listener);

    let handle = SocketHandle::connect(
        url,
        "tenant-1".into(),
        token(),
        fast_reconnect(1),
        CancellationToken::new(),
    )
    .unwrap();
    let mut state = handle.state();

    timeout(WAIT, state.wait_for(|s| *s == SocketState::Disconnected))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(handle.retry_count(), 1);
    handle.shutdown().await;
}

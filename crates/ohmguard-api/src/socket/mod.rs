//! Socket.IO live event stream with auto-reconnect.
//!
//! Connects to the backend's Socket.IO endpoint over a raw WebSocket,
//! joins the tenant room, and streams every server event through a
//! [`tokio::sync::broadcast`] channel. Reconnection uses bounded exponential
//! backoff; when the retry budget runs out the handle settles in
//! [`SocketState::Disconnected`] instead of returning an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use ohmguard_api::socket::{ReconnectConfig, SocketHandle};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let url = Url::parse("wss://alerts.example.com/api/socket.io/?EIO=4&transport=websocket")?;
//! let handle = SocketHandle::connect(
//!     url, "tenant-1".into(), token, ReconnectConfig::default(), CancellationToken::new(),
//! )?;
//! let mut rx = handle.subscribe();
//!
//! while let Ok(frame) = rx.recv().await {
//!     println!("{}: {}", frame.name, frame.payload);
//! }
//!
//! handle.shutdown().await;
//! ```

mod packet;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use packet::{OpenInfo, Packet};

// ── Broadcast channel capacity ───────────────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 1024;

// ── PushFrame ────────────────────────────────────────────────────────

/// One server-emitted Socket.IO event, undecoded beyond its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    /// Event name, e.g. `"new_event"`, `"event_updated"`, `"joined"`.
    pub name: String,

    /// First event argument; `Null` when the server sent none.
    pub payload: serde_json::Value,
}

// ── SocketState ──────────────────────────────────────────────────────

/// Link lifecycle as observed by the reconnect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    /// First connection attempt in progress.
    Connecting,
    /// Namespace joined; events are flowing.
    Connected,
    /// Link dropped; waiting before retry number `attempt`.
    Reconnecting { attempt: u32 },
    /// Shut down, or the retry budget is exhausted.
    Disconnected,
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for socket reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s.
    pub max_delay: Duration,

    /// Maximum consecutive reconnection attempts before giving up.
    /// `None` means retry forever. Default: 5.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_retries: Some(5),
        }
    }
}

// ── SocketHandle ─────────────────────────────────────────────────────

/// Handle to a running tenant subscription.
///
/// Call [`shutdown`](Self::shutdown) to leave the room and stop the
/// background task.
pub struct SocketHandle {
    frame_rx: broadcast::Receiver<Arc<PushFrame>>,
    state_rx: watch::Receiver<SocketState>,
    retries: Arc<AtomicU32>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SocketHandle {
    /// Spawn the connection loop for `tenant_id`.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Subscribe before awaiting anything to see every frame.
    pub fn connect(
        url: Url,
        tenant_id: String,
        token: SecretString,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::WebSocketConnect(format!(
                "unsupported socket URL scheme: {}",
                url.scheme()
            )));
        }

        let (frame_tx, frame_rx) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SocketState::Connecting);
        let retries = Arc::new(AtomicU32::new(0));

        let link = Link {
            url,
            tenant_id,
            token,
            reconnect,
            frame_tx,
            state_tx,
            retries: Arc::clone(&retries),
        };
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            socket_loop(link, task_cancel).await;
        });

        Ok(Self {
            frame_rx,
            state_rx,
            retries,
            cancel,
            task,
        })
    }

    /// Get a new broadcast receiver for the frame stream.
    ///
    /// If a consumer falls behind, it receives
    /// [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushFrame>> {
        self.frame_rx.resubscribe()
    }

    /// Watch the link state.
    pub fn state(&self) -> watch::Receiver<SocketState> {
        self.state_rx.clone()
    }

    /// Reconnection attempts made since the link was last connected.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::Relaxed)
    }

    /// Leave the tenant room, close the socket, and wait for the task to end.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "socket task ended abnormally");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

struct Link {
    url: Url,
    tenant_id: String,
    token: SecretString,
    reconnect: ReconnectConfig,
    frame_tx: broadcast::Sender<Arc<PushFrame>>,
    state_tx: watch::Sender<SocketState>,
    retries: Arc<AtomicU32>,
}

impl Link {
    fn set_state(&self, state: SocketState) {
        self.state_tx.send_replace(state);
    }
}

/// Main loop: connect → read → on drop, backoff → reconnect.
async fn socket_loop(link: Link, cancel: CancellationToken) {
    let mut attempt: u32 = 0;

    loop {
        let mut established = false;
        let result = connect_and_read(&link, &cancel, &mut established).await;
        if cancel.is_cancelled() {
            break;
        }

        match result {
            Ok(()) => tracing::info!(tenant_id = %link.tenant_id, "Socket closed by server"),
            Err(e) => tracing::warn!(error = %e, attempt, "Socket error"),
        }

        if established {
            attempt = 0;
        }
        if link.reconnect.max_retries.is_some_and(|max| attempt >= max) {
            tracing::error!(
                max_retries = attempt,
                tenant_id = %link.tenant_id,
                "Socket reconnection limit reached, giving up"
            );
            break;
        }

        let delay = calculate_backoff(attempt, &link.reconnect);
        attempt += 1;
        link.retries.store(attempt, Ordering::Relaxed);
        link.set_state(SocketState::Reconnecting { attempt });
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    link.set_state(SocketState::Disconnected);
    tracing::debug!(tenant_id = %link.tenant_id, "Socket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// What the read loop should do after handling one packet.
enum Flow {
    Continue,
    Closed,
}

/// Establish one WebSocket connection, join the room, and read until it
/// drops. `Ok(())` means a clean close or cancellation.
async fn connect_and_read(
    link: &Link,
    cancel: &CancellationToken,
    established: &mut bool,
) -> Result<(), Error> {
    tracing::info!(url = %link.url, tenant_id = %link.tenant_id, "Connecting to live event socket");

    let uri: tungstenite::http::Uri = link
        .url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;
    let request = ClientRequestBuilder::new(uri).with_header(
        "Authorization",
        format!("Bearer {}", link.token.expose_secret()),
    );

    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => return Ok(()),
        result = tokio_tungstenite::connect_async(request) => {
            result.map_err(|e| Error::WebSocketConnect(e.to_string()))?
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let mut heartbeat = Duration::from_millis(OpenInfo::default().heartbeat_window_ms());
    let mut deadline = Instant::now() + heartbeat;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                if *established {
                    leave_room(&mut write, link).await;
                }
                // Best effort; the peer may already be gone.
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
            () = tokio::time::sleep_until(deadline) => {
                return Err(Error::Protocol(format!(
                    "no traffic from server for {}ms",
                    heartbeat.as_millis()
                )));
            }
            frame = read.next() => {
                deadline = Instant::now() + heartbeat;
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let packet = match packet::decode(&text) {
                            Ok(packet) => packet,
                            Err(e) => {
                                tracing::debug!(error = %e, "Ignoring undecodable socket packet");
                                continue;
                            }
                        };
                        if let Packet::Open(ref info) = packet {
                            heartbeat = Duration::from_millis(info.heartbeat_window_ms());
                            deadline = Instant::now() + heartbeat;
                        }
                        let flow = handle_packet(packet, &mut write, link, established).await?;
                        if let Flow::Closed = flow {
                            return Ok(());
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(cf) => Err(Error::WebSocketClosed {
                                code: u16::from(cf.code),
                                reason: cf.reason.to_string(),
                            }),
                            None => Ok(()),
                        };
                    }
                    Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                    None => {
                        tracing::info!("Socket stream ended");
                        return Ok(());
                    }
                    Some(Ok(_)) => {
                        // Binary, Ping/Pong (tungstenite answers pings), raw frames
                    }
                }
            }
        }
    }
}

async fn handle_packet<S>(
    packet: Packet,
    write: &mut S,
    link: &Link,
    established: &mut bool,
) -> Result<Flow, Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match packet {
        Packet::Open(info) => {
            tracing::debug!(sid = %info.sid, "Engine.IO handshake received");
            send_text(write, packet::encode_connect(link.token.expose_secret())).await?;
        }
        Packet::Ping => send_text(write, packet::PONG.to_owned()).await?,
        Packet::Connect { sid } => {
            tracing::info!(sid = ?sid, tenant_id = %link.tenant_id, "Socket connected");
            *established = true;
            link.retries.store(0, Ordering::Relaxed);
            link.set_state(SocketState::Connected);
            let join = serde_json::json!({ "tenant_id": link.tenant_id });
            send_text(write, packet::encode_event("join_tenant", &join)).await?;
        }
        Packet::ConnectError(message) => {
            return Err(Error::Protocol(format!("namespace connect refused: {message}")));
        }
        Packet::Event { name, payload } => {
            tracing::trace!(event = %name, "Socket event");
            // Ignore send errors -- just means no active subscribers right now
            let _ = link.frame_tx.send(Arc::new(PushFrame { name, payload }));
        }
        Packet::Disconnect | Packet::Close => return Ok(Flow::Closed),
        Packet::Pong | Packet::Noop | Packet::Ack => {}
    }
    Ok(Flow::Continue)
}

async fn leave_room<S>(write: &mut S, link: &Link)
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let leave = serde_json::json!({ "tenant_id": link.tenant_id });
    let sent = async {
        send_text(write, packet::encode_event("leave_tenant", &leave)).await?;
        send_text(write, packet::NAMESPACE_DISCONNECT.to_owned()).await
    };
    match sent.await {
        Ok(()) => tracing::info!(tenant_id = %link.tenant_id, "Left tenant room"),
        Err(e) => tracing::debug!(error = %e, "Could not send leave_tenant"),
    }
}

async fn send_text<S>(write: &mut S, text: String) -> Result<(), Error>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    write
        .send(Message::Text(text.into()))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter, capped at `max_delay`.
///
/// `delay = min(initial * 2^attempt * jitter, max)`
///
/// Jitter is +-25% to spread out reconnection storms from many clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (base * jitter_factor)
        .min(config.max_delay.as_secs_f64())
        .max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────

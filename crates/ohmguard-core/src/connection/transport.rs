// ── Push transport seam ──
//
// `PushTransport` opens one tenant subscription and reports into a
// `LinkSink` owned by the `ConnectionManager`. The production transport
// wraps `ohmguard_api::SocketHandle`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use ohmguard_api::{PushFrame, ReconnectConfig, SocketHandle, SocketState};
use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::ConnectionState;
use crate::error::CoreError;

/// Opens live subscriptions for a tenant.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Start a subscription. Connecting continues in the background;
    /// progress and frames are reported through `sink`.
    async fn open(
        &self,
        tenant_id: &str,
        token: &SecretString,
        sink: LinkSink,
    ) -> Result<Box<dyn PushLink>, CoreError>;
}

/// One open subscription.
#[async_trait]
pub trait PushLink: Send + Sync {
    /// Leave the room and close. Once this returns the link no longer
    /// writes to its sink.
    async fn close(&self);
}

/// Where a link reports frames, state and retry count.
#[derive(Clone)]
pub struct LinkSink {
    frames: broadcast::Sender<Arc<PushFrame>>,
    state: Arc<watch::Sender<ConnectionState>>,
    retries: Arc<AtomicU32>,
}

impl LinkSink {
    pub(crate) fn new(
        frames: broadcast::Sender<Arc<PushFrame>>,
        state: Arc<watch::Sender<ConnectionState>>,
        retries: Arc<AtomicU32>,
    ) -> Self {
        Self {
            frames,
            state,
            retries,
        }
    }

    /// Fan a frame out to every subscriber. Dropped if nobody listens.
    pub fn deliver(&self, frame: Arc<PushFrame>) {
        let _ = self.frames.send(frame);
    }

    /// Publish link state; retry count follows it.
    pub fn set_state(&self, state: ConnectionState) {
        match state {
            ConnectionState::Reconnecting { attempt } => {
                self.retries.store(attempt, Ordering::Relaxed);
            }
            ConnectionState::Connected => self.retries.store(0, Ordering::Relaxed),
            ConnectionState::Connecting | ConnectionState::Disconnected => {}
        }
        self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    pub(crate) fn reset(&self) {
        self.retries.store(0, Ordering::Relaxed);
        self.set_state(ConnectionState::Connecting);
    }
}

impl From<SocketState> for ConnectionState {
    fn from(state: SocketState) -> Self {
        match state {
            SocketState::Connecting => Self::Connecting,
            SocketState::Connected => Self::Connected,
            SocketState::Reconnecting { attempt } => Self::Reconnecting { attempt },
            SocketState::Disconnected => Self::Disconnected,
        }
    }
}

// ── Socket.IO transport ──────────────────────────────────────────────

/// Production transport: Socket.IO over WebSocket.
pub struct SocketTransport {
    url: Url,
    reconnect: ReconnectConfig,
}

impl SocketTransport {
    pub fn new(url: Url, reconnect: ReconnectConfig) -> Self {
        Self { url, reconnect }
    }
}

#[async_trait]
impl PushTransport for SocketTransport {
    async fn open(
        &self,
        tenant_id: &str,
        token: &SecretString,
        sink: LinkSink,
    ) -> Result<Box<dyn PushLink>, CoreError> {
        let handle = SocketHandle::connect(
            self.url.clone(),
            tenant_id.to_owned(),
            token.clone(),
            self.reconnect.clone(),
            CancellationToken::new(),
        )?;
        let frames = handle.subscribe();
        let state = handle.state();
        let forwarder = tokio::spawn(forward(frames, state, sink));

        Ok(Box::new(SocketLink {
            inner: Mutex::new(Some((handle, forwarder))),
        }))
    }
}

struct SocketLink {
    inner: Mutex<Option<(SocketHandle, JoinHandle<()>)>>,
}

#[async_trait]
impl PushLink for SocketLink {
    async fn close(&self) {
        let Some((handle, forwarder)) = self.inner.lock().await.take() else {
            return;
        };
        handle.shutdown().await;
        // The handle's channels are gone now, so the forwarder drains and ends.
        if let Err(e) = forwarder.await {
            warn!(error = %e, "push forwarder ended abnormally");
        }
    }
}

/// Copy frames and state from one socket handle into the manager's sink
/// until the handle shuts down.
async fn forward(
    mut frames: broadcast::Receiver<Arc<PushFrame>>,
    mut state: watch::Receiver<SocketState>,
    sink: LinkSink,
) {
    let mut state_open = true;
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => sink.deliver(frame),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push forwarder lagged behind socket");
                }
                Err(RecvError::Closed) => break,
            },
            changed = state.changed(), if state_open => {
                state_open = changed.is_ok();
                let current = *state.borrow_and_update();
                sink.set_state(current.into());
            }
        }
    }
    sink.set_state((*state.borrow()).into());
    debug!("push forwarder exiting");
}

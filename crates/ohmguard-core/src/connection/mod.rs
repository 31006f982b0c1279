// ── Connection manager ──
//
// Owns at most one live tenant subscription. Subscribers attach to the
// manager's broadcast channel, not to a link, so they survive reconnects
// and tenant switches without re-registering.

mod transport;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use ohmguard_api::PushFrame;
use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

pub use transport::{LinkSink, PushLink, PushTransport, SocketTransport};

const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// Live stream state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Link dropped; waiting before retry number `attempt`.
    Reconnecting { attempt: u32 },
}

struct ActiveLink {
    tenant_id: String,
    link: Box<dyn PushLink>,
}

pub struct ConnectionManager {
    transport: Arc<dyn PushTransport>,
    active: Mutex<Option<ActiveLink>>,
    frames: broadcast::Sender<Arc<PushFrame>>,
    state: Arc<watch::Sender<ConnectionState>>,
    retries: Arc<AtomicU32>,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        let (frames, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            active: Mutex::new(None),
            frames,
            state: Arc::new(state),
            retries: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Subscribe `tenant_id` to the live stream.
    ///
    /// A no-op when that tenant is already connected, connecting or
    /// reconnecting. Any other subscription is closed first. Failures are
    /// logged and leave the manager [`Disconnected`](ConnectionState::Disconnected).
    pub async fn connect(&self, tenant_id: &str, token: &SecretString) {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.tenant_id == tenant_id
                && self.current_state() != ConnectionState::Disconnected
            {
                debug!(tenant_id, "already subscribed, ignoring connect");
                return;
            }
        }

        if let Some(previous) = active.take() {
            info!(from = %previous.tenant_id, to = tenant_id, "closing previous subscription");
            previous.link.close().await;
        }

        let sink = LinkSink::new(
            self.frames.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.retries),
        );
        sink.reset();

        match self.transport.open(tenant_id, token, sink.clone()).await {
            Ok(link) => {
                info!(tenant_id, "live subscription opened");
                *active = Some(ActiveLink {
                    tenant_id: tenant_id.to_owned(),
                    link,
                });
            }
            Err(e) => {
                warn!(tenant_id, error = %e, "could not open live subscription");
                sink.set_state(ConnectionState::Disconnected);
            }
        }
    }

    /// Close the active subscription, if any.
    pub async fn disconnect(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            info!(tenant_id = %previous.tenant_id, "closing live subscription");
            previous.link.close().await;
        }
        self.state.send_if_modified(|s| {
            let changed = *s != ConnectionState::Disconnected;
            *s = ConnectionState::Disconnected;
            changed
        });
    }

    pub fn is_connected(&self) -> bool {
        self.current_state() == ConnectionState::Connected
    }

    /// Reconnection attempts since the link was last up.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Raw frames from whichever link is active.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushFrame>> {
        self.frames.subscribe()
    }

    pub async fn tenant_id(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|a| a.tenant_id.clone())
    }
}

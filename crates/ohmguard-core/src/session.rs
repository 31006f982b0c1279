// ── Session facade ──
//
// Composes the REST backend, the connection manager, and the alert store
// into one authenticated session, and runs the bridge task that drains
// pushed events into the store.

use std::sync::Arc;

use ohmguard_api::{ApiClient, PushFrame, TokenStore};
use secrecy::SecretString;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::AlertBackend;
use crate::config::SessionConfig;
use crate::connection::{ConnectionManager, ConnectionState, PushTransport, SocketTransport};
use crate::error::CoreError;
use crate::model::{Alert, AlertPatch, AlertQuery, User};
use crate::normalize::{PushEvent, normalize};
use crate::store::AlertStore;
use crate::stream::{FilteredAlertStream, StatusFilter, filtered_alerts};

// ── SessionState ─────────────────────────────────────────────────

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    /// Authenticated; the live stream (if enabled) is up.
    Connected,
    /// Live stream dropped; retry number `attempt` is pending.
    Reconnecting { attempt: u32 },
    /// Retries exhausted. Still logged in; call [`Session::reconnect`].
    Disconnected,
}

// ── Session ──────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    backend: Arc<dyn AlertBackend>,
    connection: ConnectionManager,
    store: Arc<AlertStore>,
    state: watch::Sender<SessionState>,
    user: watch::Sender<Option<Arc<User>>>,
    filter: watch::Sender<StatusFilter>,
    cancel: CancellationToken,
    bridge: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Session {
    /// Create an unauthenticated session. Call [`login`](Self::login) or
    /// [`resume`](Self::resume) to start it.
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn AlertBackend>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        let (user, _) = watch::channel(None);
        let (filter, _) = watch::channel(StatusFilter::All);

        Self {
            inner: Arc::new(SessionInner {
                config,
                backend,
                connection: ConnectionManager::new(transport),
                store: Arc::new(AlertStore::new()),
                state,
                user,
                filter,
                cancel: CancellationToken::new(),
                bridge: Mutex::new(None),
            }),
        }
    }

    /// Session over the real REST client and Socket.IO transport.
    pub fn with_api_client(
        config: SessionConfig,
        client: Arc<ApiClient>,
    ) -> Result<Self, CoreError> {
        let transport = SocketTransport::new(config.socket_url()?, (&config.reconnect).into());
        Ok(Self::new(config, client, Arc::new(transport)))
    }

    /// Build the REST client from `config`, then the session over it.
    pub fn from_config(
        config: SessionConfig,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self, CoreError> {
        let client = build_api_client(&config, tokens)?;
        Self::with_api_client(config, Arc::new(client))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.inner.store
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.inner.connection
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Authenticate with credentials and start the session.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Arc<User>, CoreError> {
        self.set_state(SessionState::Authenticating);
        if let Err(e) = self.inner.backend.login(email, password).await {
            self.set_state(SessionState::Unauthenticated);
            return Err(e);
        }
        self.establish().await
    }

    /// Start the session from stored tokens, if any.
    ///
    /// Returns `Ok(None)` when there are no tokens or they have expired.
    pub async fn resume(&self) -> Result<Option<Arc<User>>, CoreError> {
        if !self.inner.backend.has_credentials().await {
            debug!("no stored credentials to resume");
            return Ok(None);
        }
        self.set_state(SessionState::Authenticating);
        match self.establish().await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_auth_failure() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// End the session: close the live stream, forget tokens and alerts.
    pub async fn logout(&self) {
        self.teardown().await;
        if let Err(e) = self.inner.backend.logout().await {
            warn!(error = %e, "logout failed (non-fatal)");
        }
        info!("logged out");
    }

    /// Stop background work without logging out; tokens stay stored.
    /// The session cannot go live again afterwards.
    pub async fn close(&self) {
        self.stop_bridge().await;
        self.inner.connection.disconnect().await;
        self.inner.cancel.cancel();
        debug!("session closed");
    }

    /// Manually reopen the live stream after retries ran out.
    pub async fn reconnect(&self) -> Result<(), CoreError> {
        let user = self.user().ok_or(CoreError::NotAuthenticated)?;
        let Some(tenant_id) = user.tenant_id.clone() else {
            return Err(CoreError::Config {
                message: format!("user {} has no tenant to subscribe to", user.email),
            });
        };
        // The bridge re-fetches once the link reports CONNECTED.
        self.start_live(&tenant_id).await
    }

    // ── Alerts ───────────────────────────────────────────────────

    /// Re-fetch the current filter's alerts and replace the collection.
    ///
    /// On failure the collection is left untouched.
    pub async fn refresh_alerts(&self) -> Result<(), CoreError> {
        let result = self.fetch_into_store().await;
        self.guard(result).await
    }

    /// Change the status filter and re-fetch.
    pub async fn set_filter(&self, filter: StatusFilter) -> Result<(), CoreError> {
        self.inner.filter.send_replace(filter);
        self.refresh_alerts().await
    }

    pub fn filter(&self) -> StatusFilter {
        *self.inner.filter.borrow()
    }

    /// The collection as seen through the current filter.
    pub fn filtered_alerts(&self) -> Vec<Arc<Alert>> {
        filtered_alerts(&self.inner.store.snapshot(), self.filter())
    }

    pub fn subscribe_filtered(&self) -> FilteredAlertStream {
        self.inner
            .store
            .subscribe()
            .filtered_by(self.inner.filter.subscribe())
    }

    /// Fetch one alert and make it the selected alert.
    pub async fn select_alert(&self, id: &str) -> Result<Arc<Alert>, CoreError> {
        let result = self.inner.backend.get_alert(id).await;
        let alert = self.guard(result).await?;
        self.inner.store.select(alert);
        self.inner
            .store
            .selected()
            .ok_or_else(|| CoreError::Internal("selection vanished".into()))
    }

    /// Acknowledge an alert as the current user.
    pub async fn acknowledge(&self, id: &str) -> Result<Arc<Alert>, CoreError> {
        self.ensure_can_modify()?;
        let result = self
            .inner
            .store
            .acknowledge(self.inner.backend.as_ref(), id)
            .await;
        let alert = self.guard(result).await?;
        info!(alert_id = %id, "alert acknowledged");
        Ok(alert)
    }

    /// Assign or annotate an alert; the server's answer is applied as-is.
    pub async fn update_alert(
        &self,
        id: &str,
        patch: &AlertPatch,
    ) -> Result<Arc<Alert>, CoreError> {
        self.ensure_can_modify()?;
        let result = self
            .inner
            .store
            .update(self.inner.backend.as_ref(), id, patch)
            .await;
        self.guard(result).await
    }

    // ── State observation ────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn user(&self) -> Option<Arc<User>> {
        self.inner.user.borrow().clone()
    }

    // ── Private helpers ──────────────────────────────────────────

    /// AUTHENTICATING → CONNECTED: load the user, open the live stream,
    /// fetch the first page.
    async fn establish(&self) -> Result<Arc<User>, CoreError> {
        let user = match self.inner.backend.current_user().await {
            Ok(user) => Arc::new(user),
            Err(e) => {
                self.teardown().await;
                return Err(e);
            }
        };
        info!(email = %user.email, role = %user.role, "authenticated");
        let previous = self.inner.user.send_replace(Some(Arc::clone(&user)));
        if previous.is_some_and(|p| p.id != user.id || p.tenant_id != user.tenant_id) {
            debug!("identity changed, dropping selected alert");
            self.inner.store.clear_selection();
        }

        if self.inner.config.live_updates {
            match user.tenant_id.as_deref() {
                Some(tenant_id) => {
                    if let Err(e) = self.start_live(tenant_id).await {
                        self.teardown().await;
                        return Err(e);
                    }
                }
                None => warn!(email = %user.email, "user has no tenant, live updates disabled"),
            }
        }

        // Live stream first, so pushes during the fetch are not missed.
        if let Err(e) = self.fetch_into_store().await {
            if e.is_auth_failure() {
                self.teardown().await;
                return Err(e);
            }
            warn!(error = %e, "initial alert fetch failed");
        }

        // The bridge may already have reported the link's own state.
        self.inner.state.send_if_modified(|state| {
            if *state != SessionState::Authenticating {
                return false;
            }
            *state = SessionState::Connected;
            true
        });
        Ok(user)
    }

    async fn start_live(&self, tenant_id: &str) -> Result<(), CoreError> {
        let token = self
            .inner
            .backend
            .access_token()
            .await
            .ok_or(CoreError::NotAuthenticated)?;

        {
            let mut bridge = self.inner.bridge.lock().await;
            if bridge.is_none() {
                // Subscribe before connecting so no frame is missed.
                let frames = self.inner.connection.subscribe();
                let states = self.inner.connection.state();
                let cancel = self.inner.cancel.child_token();
                let task = tokio::spawn(bridge_task(self.clone(), frames, states, cancel.clone()));
                *bridge = Some((cancel, task));
            }
        }

        self.inner.connection.connect(tenant_id, &token).await;
        Ok(())
    }

    async fn stop_bridge(&self) {
        let bridge = self.inner.bridge.lock().await.take();
        if let Some((cancel, task)) = bridge {
            cancel.cancel();
            if let Err(e) = task.await {
                warn!(error = %e, "push bridge ended abnormally");
            }
        }
    }

    /// Back to UNAUTHENTICATED with no residual state.
    async fn teardown(&self) {
        self.stop_bridge().await;
        self.inner.connection.disconnect().await;
        self.inner.store.clear();
        self.inner.user.send_replace(None);
        self.inner.filter.send_replace(StatusFilter::All);
        self.set_state(SessionState::Unauthenticated);
    }

    /// Tear the session down when `result` says authentication is gone.
    async fn guard<T>(&self, result: Result<T, CoreError>) -> Result<T, CoreError> {
        if let Err(ref e) = result {
            if e.is_auth_failure() && self.state() != SessionState::Unauthenticated {
                warn!(error = %e, "authentication lost, ending session");
                self.logout().await;
            }
        }
        result
    }

    async fn fetch_into_store(&self) -> Result<(), CoreError> {
        let query = AlertQuery {
            status: self.filter().status(),
            alert_type: self.inner.config.alert_type,
            limit: self.inner.config.page_limit,
            ..AlertQuery::default()
        };
        let alerts = self.inner.backend.list_alerts(&query).await?;
        self.inner.store.replace_all(alerts);
        Ok(())
    }

    fn ensure_can_modify(&self) -> Result<(), CoreError> {
        let user = self.user().ok_or(CoreError::NotAuthenticated)?;
        if user.role.can_acknowledge() {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                role: user.role.to_string(),
            })
        }
    }

    fn set_state(&self, state: SessionState) {
        self.inner.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            debug!(from = ?*current, to = ?state, "session state");
            *current = state;
            true
        });
    }

    fn apply_push(&self, frame: &PushFrame) {
        match normalize(frame) {
            Some(PushEvent::NewAlert(alert)) => {
                let id = alert.id.clone();
                if self.inner.store.insert_if_absent(alert) {
                    info!(alert_id = %id, "new alert");
                }
            }
            Some(PushEvent::AlertUpdated { id, patch }) => {
                if self.inner.store.apply_partial_update(&id, &patch) {
                    debug!(alert_id = %id, "alert updated by push");
                }
            }
            Some(PushEvent::Joined { tenant_id, room }) => {
                info!(tenant_id, room, "joined tenant room");
            }
            None => {}
        }
    }

    /// Re-fetch from inside the bridge. Auth loss is handed to a separate
    /// task because logout waits for the bridge to finish.
    async fn resync(&self) {
        match self.fetch_into_store().await {
            Ok(()) => debug!("alerts resynchronized"),
            Err(e) if e.is_auth_failure() => {
                warn!(error = %e, "authentication lost during resync");
                let session = self.clone();
                tokio::spawn(async move { session.logout().await });
            }
            Err(e) => warn!(error = %e, "resync failed"),
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Drain pushed frames into the store and mirror link state onto the
/// session state.
async fn bridge_task(
    session: Session,
    mut frames: broadcast::Receiver<Arc<PushFrame>>,
    mut states: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
) {
    let mut was_reconnecting = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            frame = frames.recv() => match frame {
                Ok(frame) => session.apply_push(&frame),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push bridge lagged, resynchronizing");
                    session.resync().await;
                }
                Err(RecvError::Closed) => break,
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let link = *states.borrow_and_update();
                match link {
                    ConnectionState::Connected => {
                        session.set_state(SessionState::Connected);
                        if was_reconnecting {
                            info!("live stream restored, refreshing alerts");
                            session.resync().await;
                        }
                        was_reconnecting = false;
                    }
                    ConnectionState::Reconnecting { attempt } => {
                        was_reconnecting = true;
                        session.set_state(SessionState::Reconnecting { attempt });
                    }
                    ConnectionState::Disconnected => {
                        // A deliberate disconnect cancels us first.
                        if !cancel.is_cancelled() {
                            was_reconnecting = true;
                            session.set_state(SessionState::Disconnected);
                        }
                    }
                    ConnectionState::Connecting => {}
                }
            }
        }
    }
    debug!("push bridge exiting");
}

/// REST client for `config`, with tokens persisted in `tokens`.
pub fn build_api_client(
    config: &SessionConfig,
    tokens: Arc<dyn TokenStore>,
) -> Result<ApiClient, CoreError> {
    Ok(ApiClient::new(
        config.server.clone(),
        &config.transport(),
        tokens,
    )?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::time::timeout;

    use super::*;
    use crate::model::{AlertStatus, AlertType, Role, fixtures::alert};
    use crate::testing::{FakeBackend, FakeTransport, PASSWORD};

    const WAIT: Duration = Duration::from_secs(2);

    fn config() -> SessionConfig {
        SessionConfig::new(url::Url::parse("https://alerts.example.fr").unwrap())
    }

    fn session(backend: FakeBackend) -> (Session, Arc<FakeBackend>, Arc<FakeTransport>) {
        let backend = Arc::new(backend);
        let transport = Arc::new(FakeTransport::new());
        let session = Session::new(config(), backend.clone(), transport.clone());
        (session, backend, transport)
    }

    fn password() -> SecretString {
        SecretString::from(PASSWORD.to_owned())
    }

    async fn wait_for_state(session: &Session, want: SessionState) {
        let mut rx = session.subscribe_state();
        timeout(WAIT, rx.wait_for(|s| *s == want)).await.unwrap().unwrap();
    }

    async fn wait_for_alert(session: &Session, id: &str) {
        let mut stream = session.store().subscribe();
        while !stream.latest().iter().any(|a| a.id == id) {
            timeout(WAIT, stream.changed()).await.unwrap().unwrap();
        }
    }

    fn ids(session: &Session) -> Vec<String> {
        session.store().snapshot().iter().map(|a| a.id.clone()).collect()
    }

    #[tokio::test]
    async fn login_fetches_and_joins_tenant() {
        let (session, _, transport) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));

        let user = session.login("infirmier@example.fr", &password()).await.unwrap();
        assert_eq!(user.tenant_id.as_deref(), Some("tenant-1"));
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(transport.opened(), vec!["tenant-1"]);
        assert_eq!(ids(&session), vec!["1"]);
    }

    #[tokio::test]
    async fn failed_login_returns_to_unauthenticated() {
        let (session, _, transport) = session(FakeBackend::new(vec![]));

        let err = session
            .login("infirmier@example.fr", &SecretString::from("nope".to_owned()))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(transport.opened().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (session, backend, transport) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        session.select_alert("1").await.unwrap();

        session.logout().await;
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.store().is_empty());
        assert!(session.store().selected().is_none());
        assert!(session.user().is_none());
        assert_eq!(transport.closed(), 1);
        assert!(!backend.has_credentials().await);
    }

    #[tokio::test]
    async fn resume_without_tokens_stays_logged_out() {
        let (session, _, _) = session(FakeBackend::new(vec![]));
        assert!(session.resume().await.unwrap().is_none());
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn resume_with_tokens_connects() {
        let (session, _, _) = session(FakeBackend::new(vec![]).logged_in());
        assert!(session.resume().await.unwrap().is_some());
        assert_eq!(session.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn pushed_fall_is_prepended_once_and_presence_dropped() {
        let (session, _, transport) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();

        transport.push("new_event", json!({"event": {"id": "p", "type": "PRESENCE"}}));
        transport.push("new_event", json!({"event": {"id": "1", "type": "FALL"}}));
        transport.push("new_radar_event", json!({"event": {"id": "2", "type": "FALL"}}));
        wait_for_alert(&session, "2").await;

        assert_eq!(ids(&session), vec!["2", "1"]);
    }

    #[tokio::test]
    async fn pushed_update_reaches_selected_alert() {
        let (session, _, transport) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        session.select_alert("1").await.unwrap();
        let mut selected = session.store().subscribe_selected();
        selected.borrow_and_update();

        transport.push(
            "event_updated",
            json!({"event_id": "1", "update": {"status": "RESOLVED", "notes": "relevé"}}),
        );
        timeout(WAIT, selected.changed()).await.unwrap().unwrap();

        let current = session.store().selected().unwrap();
        assert_eq!(current.status, AlertStatus::Resolved);
        assert_eq!(session.store().get("1").unwrap().notes.as_deref(), Some("relevé"));
    }

    #[tokio::test]
    async fn acknowledge_updates_collection_and_selection() {
        let (session, _, _) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        session.select_alert("1").await.unwrap();

        let acked = session.acknowledge("1").await.unwrap();
        assert_eq!(acked.status, AlertStatus::Ack);
        assert_eq!(session.store().get("1").unwrap().status, AlertStatus::Ack);
        assert_eq!(session.store().selected().unwrap().status, AlertStatus::Ack);
    }

    #[tokio::test]
    async fn viewer_cannot_acknowledge() {
        let (session, backend, _) = session(
            FakeBackend::new(vec![alert("1", AlertStatus::New)]).with_role(Role::Viewer),
        );
        session.login("infirmier@example.fr", &password()).await.unwrap();

        let err = session.acknowledge("1").await.unwrap_err();
        assert!(matches!(err, CoreError::PermissionDenied { ref role } if role == "VIEWER"));
        assert_eq!(backend.update_calls(), 0);
        assert_eq!(session.store().get("1").unwrap().status, AlertStatus::New);
    }

    #[tokio::test]
    async fn set_filter_refetches_server_side() {
        let (session, backend, _) = session(FakeBackend::new(vec![
            alert("1", AlertStatus::New),
            alert("2", AlertStatus::Ack),
        ]));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        assert_eq!(session.filtered_alerts().len(), 2);

        session.set_filter(AlertStatus::Ack.into()).await.unwrap();
        assert_eq!(ids(&session), vec!["2"]);
        assert_eq!(session.filtered_alerts().len(), 1);
        assert_eq!(backend.list_calls(), 2);
    }

    #[tokio::test]
    async fn type_scope_is_applied_by_the_server_query() {
        let mut falls = alert("2", AlertStatus::New);
        falls.alert_type = AlertType::Fall;
        let mut pre_fall = alert("1", AlertStatus::New);
        pre_fall.alert_type = AlertType::PreFall;
        let backend = Arc::new(FakeBackend::new(vec![pre_fall, falls]));
        let mut config = config();
        config.page_limit = 1;
        config.alert_type = Some(AlertType::Fall);
        let session = Session::new(config, backend.clone(), Arc::new(FakeTransport::new()));

        session.login("infirmier@example.fr", &password()).await.unwrap();
        assert_eq!(ids(&session), vec!["2"]);
        assert_eq!(backend.last_query().unwrap().alert_type, Some(AlertType::Fall));
    }

    #[tokio::test]
    async fn filtered_subscription_follows_set_filter() {
        let (session, _, _) = session(FakeBackend::new(vec![
            alert("1", AlertStatus::New),
            alert("2", AlertStatus::Ack),
        ]));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        session.set_filter(AlertStatus::New.into()).await.unwrap();
        let mut view = session.subscribe_filtered();

        session.set_filter(AlertStatus::Ack.into()).await.unwrap();
        let acked = timeout(WAIT, view.changed()).await.unwrap().unwrap();
        assert_eq!(view.filter(), StatusFilter::from(AlertStatus::Ack));
        assert!(acked.iter().all(|a| a.status == AlertStatus::Ack));
        assert_eq!(view.latest().len(), 1);
    }

    #[tokio::test]
    async fn login_as_other_tenant_drops_selection() {
        let (session, backend, _) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        session.select_alert("1").await.unwrap();

        session.login("infirmier@example.fr", &password()).await.unwrap();
        assert!(session.store().selected().is_some());

        backend.set_tenant(Some("tenant-2"));
        session.login("infirmier@example.fr", &password()).await.unwrap();
        assert!(session.store().selected().is_none());
    }

    #[tokio::test]
    async fn reconnect_transition_refetches() {
        let (session, backend, transport) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();

        transport.set_state(ConnectionState::Reconnecting { attempt: 1 });
        wait_for_state(&session, SessionState::Reconnecting { attempt: 1 }).await;

        backend.set_alerts(vec![alert("3", AlertStatus::New), alert("1", AlertStatus::Ack)]);
        transport.set_state(ConnectionState::Connected);
        wait_for_alert(&session, "3").await;

        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(ids(&session), vec!["3", "1"]);
        assert_eq!(session.store().get("1").unwrap().status, AlertStatus::Ack);
    }

    #[tokio::test]
    async fn exhausted_retries_keep_session_until_manual_reconnect() {
        let (session, _, transport) = session(FakeBackend::new(vec![]));
        session.login("infirmier@example.fr", &password()).await.unwrap();

        transport.set_state(ConnectionState::Disconnected);
        wait_for_state(&session, SessionState::Disconnected).await;
        assert!(session.user().is_some());

        session.reconnect().await.unwrap();
        wait_for_state(&session, SessionState::Connected).await;
        assert_eq!(transport.opened(), vec!["tenant-1", "tenant-1"]);
    }

    #[tokio::test]
    async fn expired_session_forces_logout() {
        let (session, backend, _) = session(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        session.login("infirmier@example.fr", &password()).await.unwrap();

        backend.expire_session();
        let err = session.refresh_alerts().await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn user_without_tenant_skips_live_stream() {
        let (session, _, transport) = session(FakeBackend::new(vec![]).with_tenant(None));
        session.login("admin@example.fr", &password()).await.unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert!(transport.opened().is_empty());
    }

    #[tokio::test]
    async fn one_shot_sessions_skip_live_stream() {
        let backend = Arc::new(FakeBackend::new(vec![alert("1", AlertStatus::New)]));
        let transport = Arc::new(FakeTransport::new());
        let mut config = config();
        config.live_updates = false;
        let session = Session::new(config, backend, transport.clone());

        session.login("infirmier@example.fr", &password()).await.unwrap();
        assert_eq!(ids(&session), vec!["1"]);
        assert!(transport.opened().is_empty());
    }
}

// In-memory stand-ins for the REST backend and the push transport.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ohmguard_api::PushFrame;
use secrecy::SecretString;
use serde_json::Value;

use crate::backend::AlertBackend;
use crate::connection::{ConnectionState, LinkSink, PushLink, PushTransport};
use crate::error::CoreError;
use crate::model::{Alert, AlertPatch, AlertQuery, Role, User};

pub(crate) const PASSWORD: &str = "correct horse";

// ── FakeBackend ─────────────────────────────────────────────────────

pub(crate) struct FakeBackend {
    alerts: Mutex<Vec<Alert>>,
    user: Mutex<User>,
    logged_in: AtomicBool,
    expired: AtomicBool,
    reject: Mutex<Option<String>>,
    list_calls: AtomicUsize,
    last_query: Mutex<Option<AlertQuery>>,
    update_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeBackend {
    pub(crate) fn new(alerts: Vec<Alert>) -> Self {
        Self {
            alerts: Mutex::new(alerts),
            user: Mutex::new(user(Role::Operator)),
            logged_in: AtomicBool::new(false),
            expired: AtomicBool::new(false),
            reject: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
            update_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_role(self, role: Role) -> Self {
        self.user.lock().unwrap().role = role;
        self
    }

    pub(crate) fn with_tenant(self, tenant_id: Option<&str>) -> Self {
        self.user.lock().unwrap().tenant_id = tenant_id.map(str::to_owned);
        self
    }

    pub(crate) fn logged_in(self) -> Self {
        self.logged_in.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn set_tenant(&self, tenant_id: Option<&str>) {
        self.user.lock().unwrap().tenant_id = tenant_id.map(str::to_owned);
    }

    /// Server-side change that the client only sees on its next fetch.
    pub(crate) fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.alerts.lock().unwrap() = alerts;
    }

    pub(crate) fn reject_updates(&self, message: &str) {
        *self.reject.lock().unwrap() = Some(message.to_owned());
    }

    /// Make every authenticated call fail as if refresh had failed.
    pub(crate) fn expire_session(&self) {
        self.expired.store(true, Ordering::SeqCst);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_query(&self) -> Option<AlertQuery> {
        *self.last_query.lock().unwrap()
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_concurrent_updates(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check_session(&self) -> Result<(), CoreError> {
        if self.expired.load(Ordering::SeqCst) {
            self.logged_in.store(false, Ordering::SeqCst);
            return Err(CoreError::SessionExpired);
        }
        if !self.logged_in.load(Ordering::SeqCst) {
            return Err(CoreError::NotAuthenticated);
        }
        Ok(())
    }
}

pub(crate) fn user(role: Role) -> User {
    User {
        id: "user-1".into(),
        email: "infirmier@example.fr".into(),
        full_name: "Camille Martin".into(),
        role,
        tenant_id: Some("tenant-1".into()),
        language: "fr".into(),
        is_active: true,
    }
}

#[async_trait]
impl AlertBackend for FakeBackend {
    async fn login(&self, _email: &str, password: &SecretString) -> Result<(), CoreError> {
        use secrecy::ExposeSecret;
        if password.expose_secret() != PASSWORD {
            return Err(CoreError::AuthenticationFailed {
                message: "Email ou mot de passe incorrect".into(),
            });
        }
        self.expired.store(false, Ordering::SeqCst);
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), CoreError> {
        self.logged_in.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn has_credentials(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    async fn access_token(&self) -> Option<SecretString> {
        self.logged_in
            .load(Ordering::SeqCst)
            .then(|| SecretString::from("fake-token".to_owned()))
    }

    async fn current_user(&self) -> Result<User, CoreError> {
        self.check_session()?;
        Ok(self.user.lock().unwrap().clone())
    }

    async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<Alert>, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(*query);
        self.check_session()?;
        let alerts = self.alerts.lock().unwrap();
        Ok(alerts
            .iter()
            .filter(|a| query.status.is_none_or(|s| a.status == s))
            .filter(|a| query.alert_type.is_none_or(|t| a.alert_type == t))
            .skip(usize::try_from(query.skip).unwrap())
            .take(usize::try_from(query.limit).unwrap())
            .cloned()
            .collect())
    }

    async fn get_alert(&self, id: &str) -> Result<Alert, CoreError> {
        self.check_session()?;
        self.alerts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| CoreError::AlertNotFound { id: id.to_owned() })
    }

    async fn update_alert(&self, id: &str, patch: &AlertPatch) -> Result<Alert, CoreError> {
        self.check_session()?;
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give a concurrent caller the chance to overlap.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = self.reject.lock().unwrap().clone() {
            return Err(CoreError::Rejected { message });
        }
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::AlertNotFound { id: id.to_owned() })?;
        patch.apply(alert);
        Ok(alert.clone())
    }
}

// ── FakeTransport ───────────────────────────────────────────────────

pub(crate) struct FakeTransport {
    events: Arc<Mutex<Vec<String>>>,
    sink: Mutex<Option<LinkSink>>,
    fail: AtomicBool,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            sink: Mutex::new(None),
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_opens(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// `open <tenant>` / `close <tenant>` in call order.
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("open "))
            .map(str::to_owned)
            .collect()
    }

    pub(crate) fn closed(&self) -> usize {
        self.events().iter().filter(|e| e.starts_with("close ")).count()
    }

    /// Emit a server event on the most recently opened link.
    pub(crate) fn push(&self, name: &str, payload: Value) {
        let sink = self.sink.lock().unwrap().clone().unwrap();
        sink.deliver(Arc::new(PushFrame {
            name: name.into(),
            payload,
        }));
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let sink = self.sink.lock().unwrap().clone().unwrap();
        sink.set_state(state);
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn open(
        &self,
        tenant_id: &str,
        _token: &SecretString,
        sink: LinkSink,
    ) -> Result<Box<dyn PushLink>, CoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::ConnectionFailed {
                url: "ws://fake".into(),
                reason: "refused".into(),
            });
        }
        self.events.lock().unwrap().push(format!("open {tenant_id}"));
        sink.set_state(ConnectionState::Connected);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(Box::new(FakeLink {
            tenant_id: tenant_id.to_owned(),
            events: Arc::clone(&self.events),
        }))
    }
}

struct FakeLink {
    tenant_id: String,
    events: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PushLink for FakeLink {
    async fn close(&self) {
        self.events
            .lock()
            .unwrap()
            .push(format!("close {}", self.tenant_id));
    }
}

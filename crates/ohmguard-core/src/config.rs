// ── Runtime session configuration ──
//
// Describes *how* to reach an OhmGuard server. Never touches disk:
// the CLI builds a `SessionConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use ohmguard_api::{ReconnectConfig, TlsMode, TransportConfig};
use url::Url;

use crate::error::CoreError;
use crate::model::AlertType;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (lab servers with self-signed certs).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Live stream reconnection budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl From<&ReconnectPolicy> for ReconnectConfig {
    fn from(policy: &ReconnectPolicy) -> Self {
        ReconnectConfig {
            initial_delay: policy.initial_delay,
            max_delay: policy.max_delay,
            max_retries: Some(policy.max_attempts),
        }
    }
}

/// Configuration for one session against one server.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server root (e.g., `https://alerts.example.fr`); REST lives under `/api`.
    pub server: Url,
    /// Socket.IO mount point on the server.
    pub socket_path: String,
    pub tls: TlsVerification,
    /// REST request timeout.
    pub timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Page size for alert fetches (server caps at 500).
    pub page_limit: u32,
    /// Only fetch alerts of this type (`event_type` on the server).
    pub alert_type: Option<AlertType>,
    /// Open the live stream after authenticating. One-shot commands turn this off.
    pub live_updates: bool,
}

impl SessionConfig {
    pub fn new(server: Url) -> Self {
        Self {
            server,
            socket_path: "/api/socket.io/".into(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectPolicy::default(),
            page_limit: 100,
            alert_type: None,
            live_updates: true,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }

    /// `ws(s)://host{socket_path}?EIO=4&transport=websocket`.
    pub fn socket_url(&self) -> Result<Url, CoreError> {
        let scheme = match self.server.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(CoreError::Config {
                    message: format!("unsupported server scheme {other:?}"),
                });
            }
        };

        let mut url = self.server.clone();
        url.set_scheme(scheme).map_err(|()| CoreError::Config {
            message: format!("cannot derive socket URL from {}", self.server),
        })?;
        let path = if self.socket_path.starts_with('/') {
            self.socket_path.clone()
        } else {
            format!("/{}", self.socket_path)
        };
        url.set_path(&path);
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url)
    }
}

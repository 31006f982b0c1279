// ── Core error types ──
//
// User-facing errors from ohmguard-core. Consumers never see raw HTTP
// or socket failures; `From<ohmguard_api::Error>` translates them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Session expired -- log in again")]
    SessionExpired,

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Alert not found: {id}")]
    AlertNotFound { id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Role {role} is not allowed to modify alerts")]
    PermissionDenied { role: String },

    #[error("Operation rejected by server: {message}")]
    Rejected { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The session can no longer authenticate and must be torn down.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NotAuthenticated)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ohmguard_api::Error> for CoreError {
    fn from(err: ohmguard_api::Error) -> Self {
        use ohmguard_api::Error as Api;

        match err {
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::SessionExpired => CoreError::SessionExpired,
            Api::NotAuthenticated => CoreError::NotAuthenticated,
            Api::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            Api::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            Api::Api { status: 403, message } => CoreError::Rejected { message },
            Api::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            Api::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            Api::WebSocketClosed { code, reason } => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("socket closed (code {code}): {reason}"),
            },
            Api::Protocol(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            Api::Deserialization { message, .. } => {
                CoreError::Internal(format!("unexpected server response: {message}"))
            }
            Api::TokenStore(message) => CoreError::Config { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn forbidden_maps_to_rejected() {
        let err: CoreError = ohmguard_api::Error::Api {
            status: 403,
            message: "Not enough permissions".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Rejected { ref message } if message == "Not enough permissions"));
    }

    #[test]
    fn expired_session_is_an_auth_failure() {
        let err: CoreError = ohmguard_api::Error::SessionExpired.into();
        assert!(err.is_auth_failure());

        let err: CoreError = ohmguard_api::Error::Api {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert!(!err.is_auth_failure());
        assert!(matches!(err, CoreError::Api { status: Some(500), .. }));
    }
}

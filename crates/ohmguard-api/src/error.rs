use thiserror::Error;

/// Every way a call into the OhmGuard backend can fail.
///
/// Spans the REST endpoints, the token store and the Socket.IO live
/// stream. `ohmguard-core` folds these into its own `CoreError`.
#[derive(Debug, Error)]
pub enum Error {
    // ── Login & tokens ──────────────────────────────────────────────
    /// `POST /auth/login` refused the email/password pair.
    #[error("Login refused: {message}")]
    Authentication { message: String },

    /// A 401 survived the refresh attempt; the user must log in again.
    #[error("Session expired, log in again")]
    SessionExpired,

    /// No token pair is held for an authenticated endpoint.
    #[error("Not logged in")]
    NotAuthenticated,

    // ── HTTP ────────────────────────────────────────────────────────
    /// reqwest failed before a response arrived (refused, DNS, reset).
    #[error("Request to server failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Bad server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No response within the configured request timeout.
    #[error("No response within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// CA bundle unreadable or client TLS setup rejected.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// Non-2xx answer, carrying FastAPI's `detail` text when present.
    #[error("Server answered HTTP {status}: {message}")]
    Api { status: u16, message: String },

    // ── Live stream ─────────────────────────────────────────────────
    /// The WebSocket upgrade did not complete.
    #[error("Live stream handshake failed: {0}")]
    WebSocketConnect(String),

    /// The server closed the WebSocket.
    #[error("Live stream closed by server (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    /// Malformed Engine.IO/Socket.IO packet, or a namespace connect refusal.
    #[error("Live stream protocol error: {0}")]
    Protocol(String),

    // ── Decoding & storage ──────────────────────────────────────────
    /// A 2xx body did not match the expected shape; `body` keeps the raw text.
    #[error("Unreadable server response: {message}")]
    Deserialization { message: String, body: String },

    /// Loading, saving or clearing the persisted token pair failed.
    #[error("Token storage failed: {0}")]
    TokenStore(String),
}

impl Error {
    /// Logging in again would fix this.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NotAuthenticated)
    }

    /// Network-level or 5xx failure; a later retry may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_timeout(),
            Self::Api { status, .. } => *status >= 500,
            Self::Timeout { .. } | Self::WebSocketConnect(_) | Self::WebSocketClosed { .. } => true,
            _ => false,
        }
    }

    /// The addressed resource (usually an event id) does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 404,
            Self::Transport(e) => e
                .status()
                .is_some_and(|s| s == reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }
}

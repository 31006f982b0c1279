// OhmGuard REST client
//
// Wraps `reqwest::Client` with bearer-token auth, FastAPI error extraction,
// and transparent access-token refresh. Any 401 from an authenticated call
// triggers one refresh; concurrent 401s queue behind it and retry with
// whatever token the winner stored.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{TokenPair, TokenStore};
use crate::error::Error;
use crate::models::{
    ErrorBody, EventQuery, EventResponse, EventUpdateRequest, FallEventCreated, HealthResponse,
    LoginRequest, PushTokenRequest, PushTokenResponse, TokenResponse, UserResponse,
};
use crate::transport::TransportConfig;

const BODY_PREVIEW_CHARS: usize = 200;

/// HTTP client for the OhmGuard backend (`{server}/api/...`).
///
/// Holds the current token pair in memory and mirrors every change into
/// the configured [`TokenStore`].
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    tokens: RwLock<Option<TokenPair>>,
    /// Serializes refreshes so concurrent 401s trigger exactly one.
    refresh_lock: Mutex<()>,
    store: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`, loading any persisted tokens.
    ///
    /// `base_url` is the server root (e.g. `https://alerts.example.com`);
    /// the `/api` prefix is added per request.
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::assemble(http, base_url, transport.timeout, store))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, store: Arc<dyn TokenStore>) -> Self {
        Self::assemble(http, base_url, TransportConfig::default().timeout, store)
    }

    fn assemble(
        http: reqwest::Client,
        base_url: Url,
        timeout: Duration,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let tokens = match store.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "could not load stored tokens, starting logged out");
                None
            }
        };
        Self {
            http,
            base_url,
            timeout,
            tokens: RwLock::new(tokens),
            refresh_lock: Mutex::new(()),
            store,
        }
    }

    /// The server root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `true` if a token pair is held (it may still be expired).
    pub async fn has_tokens(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    /// The current access token, for the live transport handshake.
    pub async fn access_token(&self) -> Option<SecretString> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange credentials for a token pair and persist it.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<(), Error> {
        let url = self.api_url("auth/login")?;
        debug!("POST {}", url);

        let body = LoginRequest {
            email,
            password: password.expose_secret(),
        };
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: detail_message(&body)
                    .unwrap_or_else(|| "invalid email or password".into()),
            });
        }

        let tokens: TokenResponse = self.parse_json(resp).await?;
        self.store_tokens(tokens.into()).await;
        debug!("login succeeded");
        Ok(())
    }

    /// Drop the token pair from memory and from the store.
    ///
    /// The backend has no logout endpoint; tokens simply stop being sent.
    pub async fn logout(&self) -> Result<(), Error> {
        *self.tokens.write().await = None;
        self.store.clear()
    }

    /// `GET /auth/me`
    pub async fn me(&self) -> Result<UserResponse, Error> {
        let url = self.api_url("auth/me")?;
        debug!("GET {}", url);
        let resp = self.send_authed(|| self.http.get(url.clone())).await?;
        self.parse_json(resp).await
    }

    // ── Events ───────────────────────────────────────────────────────

    /// `GET /events` with optional status / type filters, newest first.
    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<EventResponse>, Error> {
        let url = self.api_url("events")?;
        debug!(?query, "GET {}", url);
        let resp = self
            .send_authed(|| self.http.get(url.clone()).query(query))
            .await?;
        self.parse_json(resp).await
    }

    /// `GET /events/{id}`
    pub async fn get_event(&self, id: &str) -> Result<EventResponse, Error> {
        let url = self.api_url(&format!("events/{id}"))?;
        debug!("GET {}", url);
        let resp = self.send_authed(|| self.http.get(url.clone())).await?;
        self.parse_json(resp).await
    }

    /// `PATCH /events/{id}`; returns the updated document.
    pub async fn update_event(
        &self,
        id: &str,
        update: &EventUpdateRequest,
    ) -> Result<EventResponse, Error> {
        let url = self.api_url(&format!("events/{id}"))?;
        debug!(?update, "PATCH {}", url);
        let resp = self
            .send_authed(|| self.http.patch(url.clone()).json(update))
            .await?;
        self.parse_json(resp).await
    }

    /// `POST /create-fall-event`: asks the server to raise a demo FALL alert
    /// for the caller's tenant. The alert arrives over the live stream.
    pub async fn create_fall_event(&self) -> Result<FallEventCreated, Error> {
        let url = self.api_url("create-fall-event")?;
        debug!("POST {}", url);
        let resp = self.send_authed(|| self.http.post(url.clone())).await?;
        self.parse_json(resp).await
    }

    // ── Push tokens ──────────────────────────────────────────────────

    /// `POST /push-tokens`
    pub async fn register_push_token(
        &self,
        request: &PushTokenRequest,
    ) -> Result<PushTokenResponse, Error> {
        let url = self.api_url("push-tokens")?;
        debug!("POST {}", url);
        let resp = self
            .send_authed(|| self.http.post(url.clone()).json(request))
            .await?;
        self.parse_json(resp).await
    }

    /// `DELETE /push-tokens?token=...`
    pub async fn delete_push_token(&self, token: &str) -> Result<PushTokenResponse, Error> {
        let url = self.api_url("push-tokens")?;
        debug!("DELETE {}", url);
        let resp = self
            .send_authed(|| self.http.delete(url.clone()).query(&[("token", token)]))
            .await?;
        self.parse_json(resp).await
    }

    // ── System ───────────────────────────────────────────────────────

    /// `GET /health` (unauthenticated).
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        let url = self.api_url("health")?;
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.parse_json(resp).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Build `{base}/api/{path}`.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    /// Send with the current bearer token, refreshing once on 401.
    ///
    /// `build` is called again for the retry, so it must be repeatable.
    async fn send_authed<F>(&self, build: F) -> Result<reqwest::Response, Error>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let token = self.access_token().await.ok_or(Error::NotAuthenticated)?;
        let resp = build()
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        self.refresh_after_rejection(&token).await?;

        let token = self.access_token().await.ok_or(Error::SessionExpired)?;
        let resp = build()
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("refreshed access token was rejected, clearing session");
            self.clear_tokens().await;
            return Err(Error::SessionExpired);
        }
        Ok(resp)
    }

    /// Replace `rejected` with a fresh token pair, unless a concurrent
    /// caller already did.
    async fn refresh_after_rejection(&self, rejected: &SecretString) -> Result<(), Error> {
        let _guard = self.refresh_lock.lock().await;

        let refresh_token = {
            let tokens = self.tokens.read().await;
            match tokens.as_ref() {
                None => return Err(Error::SessionExpired),
                Some(pair) if !pair.has_access_token(rejected) => {
                    debug!("access token already refreshed by a concurrent request");
                    return Ok(());
                }
                Some(pair) => pair.refresh_token.clone(),
            }
        };

        let url = self.api_url("auth/refresh")?;
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .query(&[("refresh_token", refresh_token.expose_secret())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "token refresh rejected, clearing session");
            self.clear_tokens().await;
            return Err(Error::SessionExpired);
        }

        let tokens: TokenResponse = self.parse_json(resp).await?;
        self.store_tokens(tokens.into()).await;
        debug!("access token refreshed");
        Ok(())
    }

    async fn store_tokens(&self, pair: TokenPair) {
        if let Err(e) = self.store.save(&pair) {
            warn!(error = %e, "could not persist tokens, keeping them in memory only");
        }
        *self.tokens.write().await = Some(pair);
    }

    async fn clear_tokens(&self) {
        *self.tokens.write().await = None;
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "could not clear persisted tokens");
        }
    }

    /// Decode a success body, or turn an error status into `Error::Api`
    /// carrying the server's `detail` message.
    async fn parse_json<T: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: detail_message(&body)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(e)
        }
    }
}

/// Extract FastAPI's `detail` from an error body, if it has one.
fn detail_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message())
}

use std::fmt;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;
use crate::models::TokenResponse;

/// Access + refresh token pair issued by `/auth/login` and `/auth/refresh`.
///
/// Both halves are secrets; `Debug` never prints them.
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub token_type: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
            token_type: "bearer".into(),
        }
    }

    /// `true` if `other` is the same access token this pair carries.
    pub(crate) fn has_access_token(&self, other: &SecretString) -> bool {
        self.access_token.expose_secret() == other.expose_secret()
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl From<TokenResponse> for TokenPair {
    fn from(resp: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(resp.access_token),
            refresh_token: SecretString::from(resp.refresh_token),
            token_type: resp.token_type,
        }
    }
}

/// Persistence seam for the token pair.
///
/// The client loads once at construction and saves after every login or
/// refresh. Implementations must be cheap to call from async code; the
/// keyring-backed store in `ohmguard-config` is the production one.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<TokenPair>, Error>;
    fn save(&self, tokens: &TokenPair) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// Process-local token store. Tokens vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, e.g. to resume a session in tests.
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, Error> {
        let guard = self
            .tokens
            .lock()
            .map_err(|_| Error::TokenStore("token store lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), Error> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| Error::TokenStore("token store lock poisoned".into()))?;
        *guard = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|_| Error::TokenStore("token store lock poisoned".into()))?;
        *guard = None;
        Ok(())
    }
}

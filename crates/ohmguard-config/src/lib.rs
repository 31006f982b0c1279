//! Shared configuration for OhmGuard tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! keyring-backed token persistence, and translation to
//! `ohmguard_core::SessionConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use ohmguard_api::{TokenPair, TokenStore};
use ohmguard_core::{ReconnectPolicy, SessionConfig, TlsVerification};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEYRING_SERVICE: &str = "ohmguard";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// `name`, else the configured default profile, else `"default"`.
    pub fn profile_name<'a>(&'a self, name: Option<&'a str>) -> &'a str {
        name.or(self.default_profile.as_deref()).unwrap_or("default")
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named server profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://alerts.example.fr").
    pub server: String,

    /// Login email.
    pub email: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Socket.IO mount point; defaults to `/api/socket.io/`.
    pub socket_path: Option<String>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Alerts fetched per request.
    pub page_limit: Option<u32>,

    pub reconnect_attempts: Option<u32>,
    pub reconnect_initial_delay_ms: Option<u64>,
    pub reconnect_max_delay_ms: Option<u64>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("fr", "ohmguard", "ohmguard").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ohmguard");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path`, with `OHMGUARD_`-prefixed env vars on top
/// (`OHMGUARD_DEFAULTS__TIMEOUT=10`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("OHMGUARD_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Login email: profile, then `OHMGUARD_EMAIL`.
pub fn resolve_email(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .email
        .clone()
        .or_else(|| std::env::var("OHMGUARD_EMAIL").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Password from the credential chain: env var, keyring, plaintext.
pub fn resolve_password(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env, then the global env var
    let env_names = profile
        .password_env
        .iter()
        .map(String::as_str)
        .chain(std::iter::once("OHMGUARD_PASSWORD"));
    for env_name in env_names {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .and_then(|entry| entry.set_password(password.expose_secret()))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Session config ──────────────────────────────────────────────────

/// Build a `SessionConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let server: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;
    if !matches!(server.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "server".into(),
            reason: format!("expected http or https, got {}", server.scheme()),
        });
    }

    let mut config = SessionConfig::new(server);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some(ref path) = profile.socket_path {
        config.socket_path.clone_from(path);
    }
    if let Some(limit) = profile.page_limit {
        if !(1..=500).contains(&limit) {
            return Err(ConfigError::Validation {
                field: "page_limit".into(),
                reason: format!("must be between 1 and 500, got {limit}"),
            });
        }
        config.page_limit = limit;
    }

    let fallback = ReconnectPolicy::default();
    config.reconnect = ReconnectPolicy {
        max_attempts: profile.reconnect_attempts.unwrap_or(fallback.max_attempts),
        initial_delay: profile
            .reconnect_initial_delay_ms
            .map_or(fallback.initial_delay, Duration::from_millis),
        max_delay: profile
            .reconnect_max_delay_ms
            .map_or(fallback.max_delay, Duration::from_millis),
    };

    Ok(config)
}

// ── Token persistence ───────────────────────────────────────────────

/// Keeps the token pair in the system keyring, one entry per profile.
pub struct KeyringTokenStore {
    account: String,
}

#[derive(Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: String,
    token_type: String,
}

impl KeyringTokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            account: format!("{profile_name}/tokens"),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, ohmguard_api::Error> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account).map_err(keyring_error)
    }
}

fn keyring_error(err: keyring::Error) -> ohmguard_api::Error {
    ohmguard_api::Error::TokenStore(err.to_string())
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, ohmguard_api::Error> {
        let raw = match self.entry()?.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(keyring_error(e)),
        };
        let stored: StoredTokens = serde_json::from_str(&raw)
            .map_err(|e| ohmguard_api::Error::TokenStore(format!("corrupt token entry: {e}")))?;
        let mut pair = TokenPair::new(stored.access_token, stored.refresh_token);
        pair.token_type = stored.token_type;
        Ok(Some(pair))
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), ohmguard_api::Error> {
        let stored = StoredTokens {
            access_token: tokens.access_token.expose_secret().to_owned(),
            refresh_token: tokens.refresh_token.expose_secret().to_owned(),
            token_type: tokens.token_type.clone(),
        };
        let raw = serde_json::to_string(&stored)
            .map_err(|e| ohmguard_api::Error::TokenStore(e.to_string()))?;
        self.entry()?.set_password(&raw).map_err(keyring_error)
    }

    fn clear(&self) -> Result<(), ohmguard_api::Error> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}

//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ohmguard_config::ConfigError;
use ohmguard_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to {url}: {reason}")]
    #[diagnostic(
        code(ohmguard::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Try: ohmguard health"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Live alert stream lost")]
    #[diagnostic(
        code(ohmguard::stream_lost),
        help("Automatic retries gave up. Run again with --reconnect to keep retrying.")
    )]
    StreamLost,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ohmguard::auth_failed),
        help(
            "Verify your email and password.\n\
             Run: ohmguard config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Not logged in")]
    #[diagnostic(
        code(ohmguard::not_logged_in),
        help("Run: ohmguard auth login --profile {profile}")
    )]
    NotLoggedIn { profile: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(ohmguard::no_credentials),
        help(
            "Set an email with: ohmguard config init --server <URL> --email <EMAIL>\n\
             Or set OHMGUARD_EMAIL and OHMGUARD_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    #[error("Role {role} cannot change alerts")]
    #[diagnostic(
        code(ohmguard::permission_denied),
        help("Ask a supervisor or administrator to acknowledge this alert.")
    )]
    PermissionDenied { role: String },

    #[error("Server refused the operation: {message}")]
    #[diagnostic(code(ohmguard::rejected))]
    Rejected { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(ohmguard::not_found),
        help("Run: ohmguard {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(ohmguard::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ohmguard::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ohmguard::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: ohmguard config init --server <URL>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(ohmguard::no_config),
        help(
            "Create a profile with: ohmguard config init --server <URL>\n\
             Or pass --server. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(ohmguard::config))]
    Config(ConfigError),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(ohmguard::timeout),
        help("Increase timeout with --timeout or check server responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::StreamLost => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotLoggedIn { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::PermissionDenied { .. } | Self::Rejected { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Re-attribute a generic auth error to the active profile.
    pub fn for_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            Self::NotLoggedIn { .. } => Self::NotLoggedIn {
                profile: profile.into(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::SessionExpired | CoreError::NotAuthenticated => CliError::NotLoggedIn {
                profile: "default".into(),
            },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::AlertNotFound { id } => CliError::NotFound {
                resource_type: "alert".into(),
                identifier: id,
                list_command: "alerts list".into(),
            },

            CoreError::PermissionDenied { role } => CliError::PermissionDenied { role },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Api { message, status } => CliError::ApiError {
                message: match status {
                    Some(status) => format!("HTTP {status}: {message}"),
                    None => message,
                },
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let cases = [
            (CoreError::SessionExpired, exit_code::AUTH),
            (CoreError::AlertNotFound { id: "e1".into() }, exit_code::NOT_FOUND),
            (
                CoreError::PermissionDenied {
                    role: "VIEWER".into(),
                },
                exit_code::PERMISSION,
            ),
            (
                CoreError::ConnectionFailed {
                    url: "https://alerts.example.fr".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout { timeout_secs: 30 }, exit_code::TIMEOUT),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn auth_errors_name_the_active_profile() {
        let err = CliError::from(CoreError::NotAuthenticated).for_profile("clinique");
        assert!(matches!(err, CliError::NotLoggedIn { ref profile } if profile == "clinique"));
    }
}

//! CLI configuration: thin wrapper around `ohmguard_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--server, --timeout, --insecure).

use ohmguard_core::SessionConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use ohmguard_config::{Config, Profile, config_path, load_config, save_config};

/// A profile after flag overrides, with the session config derived from it.
pub struct Resolved {
    pub name: String,
    pub profile: Profile,
    pub session: SessionConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Pick the active profile and apply CLI flag overrides on top.
///
/// Without any profile, `--server` alone is enough for unauthenticated
/// calls; credentials then come from `OHMGUARD_EMAIL` / `OHMGUARD_PASSWORD`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let mut cfg = load_config()?;
    let name = active_profile_name(global, &cfg);

    let mut profile = match (cfg.profiles.remove(&name), global.server.as_deref()) {
        (Some(profile), _) => profile,
        (None, Some(server)) => Profile {
            server: server.to_owned(),
            ..Profile::default()
        },
        (None, None) if cfg.profiles.is_empty() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        (None, None) => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name,
                available: available.join(", "),
            });
        }
    };

    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let session = ohmguard_config::profile_to_session_config(&profile, &cfg.defaults)?;
    tracing::debug!(profile = %name, server = %session.server, "resolved profile");

    Ok(Resolved {
        name,
        profile,
        session,
    })
}

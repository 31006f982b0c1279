//! Config subcommand handlers.

use std::fmt::Write;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "server = \"{}\"", p.server);
        if let Some(ref email) = p.email {
            let _ = writeln!(out, "email = \"{email}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref path) = p.socket_path {
            let _ = writeln!(out, "socket_path = \"{path}\"");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(limit) = p.page_limit {
            let _ = writeln!(out, "page_limit = {limit}");
        }
        if let Some(attempts) = p.reconnect_attempts {
            let _ = writeln!(out, "reconnect_attempts = {attempts}");
        }
        if let Some(ms) = p.reconnect_initial_delay_ms {
            let _ = writeln!(out, "reconnect_initial_delay_ms = {ms}");
        }
        if let Some(ms) = p.reconnect_max_delay_ms {
            let _ = writeln!(out, "reconnect_max_delay_ms = {ms}");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
    }

    out
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            server,
            email,
            default,
        } => {
            let mut cfg = config::load_config()?;
            let name = global.profile.clone().unwrap_or_else(|| "default".into());
            let first = cfg.profiles.is_empty();

            let mut profile = cfg.profiles.remove(&name).unwrap_or_default();
            profile.server = server;
            if email.is_some() {
                profile.email = email;
            }
            if global.insecure {
                profile.insecure = Some(true);
            }
            // Fail on a bad URL or limit now, not on first use.
            ohmguard_config::profile_to_session_config(&profile, &cfg.defaults)?;

            cfg.profiles.insert(name.clone(), profile);
            if default || first {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!(
                    "Profile '{name}' saved to {}",
                    config::config_path().display()
                );
                eprintln!("Store a password with: ohmguard config set-password --profile {name}");
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.profile_name(None).to_owned();
            let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
            names.sort();
            let lines: Vec<String> = names
                .into_iter()
                .map(|name| {
                    if name == default {
                        format!("{name} (default)")
                    } else {
                        name
                    }
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load_config()?;
            let name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&name) {
                tracing::warn!(profile = %name, "profile not in the config, storing password anyway");
            }
            let password = util::prompt_password(&format!("Password for '{name}'"))?;
            ohmguard_config::store_password(&name, &password)?;
            if !global.quiet {
                eprintln!("Password for '{name}' stored in system keyring");
            }
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }
    }
}

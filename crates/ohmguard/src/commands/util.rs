//! Shared helpers for command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use secrecy::SecretString;

use crate::error::CliError;

/// Map an interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Read one line from the terminal after printing `prompt` to stderr.
pub fn prompt_line(prompt: &str) -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "interactive".into(),
            reason: format!("{prompt} required, but stdin is not a terminal"),
        });
    }
    eprint!("{prompt}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_owned();
    if line.is_empty() {
        return Err(CliError::Validation {
            field: prompt.to_lowercase(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(line)
}

/// Prompt for a password without echo, rejecting empty input.
pub fn prompt_password(prompt: &str) -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password(format!("{prompt}: ")).map_err(prompt_err)?;
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "cannot be empty".into(),
        });
    }
    Ok(SecretString::from(password))
}

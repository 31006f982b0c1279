//! Command dispatch: bridges CLI args -> session calls -> output formatting.

pub mod alerts;
pub mod auth;
pub mod config_cmd;
pub mod health;
pub mod push;
pub mod util;
pub mod watch;

use std::sync::Arc;

use ohmguard_api::ApiClient;
use ohmguard_config::KeyringTokenStore;
use ohmguard_core::{Session, SessionConfig, User, build_api_client};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Profile};
use crate::error::CliError;

/// Everything a server-bound command needs.
pub struct Context {
    pub profile_name: String,
    pub profile: Profile,
    /// REST client shared with the session, for calls the session doesn't wrap.
    pub client: Arc<ApiClient>,
    pub session: Session,
}

impl Context {
    /// Resolve the profile and build the client and session, without
    /// touching the network. `live` controls whether the session opens
    /// the push stream once authenticated.
    pub fn open(global: &GlobalOpts, live: bool) -> Result<Self, CliError> {
        Self::open_with(global, |config| config.live_updates = live)
    }

    /// Like [`open`](Self::open), with a last say over the session config.
    pub fn open_with(
        global: &GlobalOpts,
        adjust: impl FnOnce(&mut SessionConfig),
    ) -> Result<Self, CliError> {
        let resolved = config::resolve(global)?;
        let mut session_config = resolved.session;
        adjust(&mut session_config);

        let tokens = Arc::new(KeyringTokenStore::new(&resolved.name));
        let client = Arc::new(build_api_client(&session_config, tokens)?);
        let session = Session::with_api_client(session_config, Arc::clone(&client))?;

        Ok(Self {
            profile_name: resolved.name,
            profile: resolved.profile,
            client,
            session,
        })
    }

    /// Resume from stored tokens, falling back to configured credentials.
    pub async fn authenticate(&self) -> Result<Arc<User>, CliError> {
        if let Some(user) = self.session.resume().await.map_err(|e| self.profile_err(e))? {
            return Ok(user);
        }

        let not_logged_in = || CliError::NotLoggedIn {
            profile: self.profile_name.clone(),
        };
        let email = ohmguard_config::resolve_email(&self.profile, &self.profile_name)
            .map_err(|_| not_logged_in())?;
        let password = ohmguard_config::resolve_password(&self.profile, &self.profile_name)
            .map_err(|_| not_logged_in())?;

        tracing::debug!(profile = %self.profile_name, "no stored session, logging in");
        self.session
            .login(&email, &password)
            .await
            .map_err(|e| self.profile_err(e))
    }

    pub fn profile_err(&self, err: impl Into<CliError>) -> CliError {
        err.into().for_profile(&self.profile_name)
    }
}

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Auth(args) => auth::handle(args, global).await,
        Command::Alerts(args) => alerts::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Push(args) => push::handle(args, global).await,
        Command::Health => health::handle(global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "not a server command".into(),
        }),
    }
}

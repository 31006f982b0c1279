//! Push token registration handlers.
//!
//! Only the server-side registration; obtaining a token from a platform
//! notification service is up to the caller.

use ohmguard_api::models::PushTokenRequest;
use ohmguard_core::CoreError;

use crate::cli::{GlobalOpts, PushArgs, PushCommand};
use crate::error::CliError;
use crate::output;

use super::Context;

pub async fn handle(args: PushArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::open(global, false)?;
    ctx.authenticate().await?;
    ctx.session.close().await;

    let response = match args.command {
        PushCommand::Register { token, device_type } => {
            let request = PushTokenRequest { token, device_type };
            ctx.client.register_push_token(&request).await
        }
        PushCommand::Delete { token } => ctx.client.delete_push_token(&token).await,
    }
    .map_err(|e| ctx.profile_err(CoreError::from(e)))?;

    if !global.quiet {
        eprintln!("{}", response.message);
    }
    if let Some(ref token_id) = response.token_id {
        output::print_output(token_id, global.quiet);
    }
    Ok(())
}

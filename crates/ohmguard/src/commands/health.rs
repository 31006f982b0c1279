//! Server health check (unauthenticated).

use ohmguard_api::models::HealthResponse;
use ohmguard_core::CoreError;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Context;

fn detail(health: &HealthResponse) -> String {
    match health.timestamp {
        Some(ref ts) => format!("Status:     {}\nTimestamp:  {ts}", health.status),
        None => format!("Status:     {}", health.status),
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::open(global, false)?;
    let health = ctx
        .client
        .health()
        .await
        .map_err(CoreError::from)?;
    tracing::info!(server = %ctx.client.base_url(), status = %health.status, "health check");

    let out = output::render_single(&global.output, &health, detail, |h| h.status.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

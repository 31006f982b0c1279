//! Live alert feed: prints alerts as they arrive until Ctrl-C.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ohmguard_core::{Alert, AlertStatus, SessionState, StatusFilter};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

/// Pause before a manual reconnect, so a dead server isn't hammered.
const RECONNECT_PAUSE: Duration = Duration::from_secs(10);

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::open(global, true)?;
    let user = ctx.authenticate().await?;
    if user.tenant_id.is_none() {
        ctx.session.close().await;
        return Err(CliError::Validation {
            field: "tenant".into(),
            reason: format!("{} has no tenant, so there is no live feed to follow", user.email),
        });
    }

    let result = follow(&ctx, &args, global).await;
    ctx.session.close().await;
    result
}

async fn follow(ctx: &Context, args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = &ctx.session;
    let filter = StatusFilter::from(args.status);
    if filter != StatusFilter::All {
        session
            .set_filter(filter)
            .await
            .map_err(|e| ctx.profile_err(e))?;
    }

    let printer = Printer {
        format: &global.output,
        color: output::should_color(&global.color),
        quiet: global.quiet,
    };
    let mut alerts = session.subscribe_filtered();
    let mut states = session.subscribe_state();

    let mut seen: HashMap<String, AlertStatus> = HashMap::new();
    // Newest first in the collection; print oldest first.
    for alert in alerts.latest().iter().rev() {
        printer.alert(alert);
        seen.insert(alert.id.clone(), alert.status);
    }
    if !global.quiet {
        eprintln!("Watching {filter} alerts (Ctrl-C to stop)");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let initial = *states.borrow_and_update();
    on_state(ctx, args, global, initial).await?;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                if !global.quiet {
                    eprintln!("Stopped");
                }
                return Ok(());
            }
            changed = alerts.changed() => {
                let Some(current) = changed else {
                    return Ok(());
                };
                announce(ctx, &printer, &current, &mut seen);
            }
            res = states.changed() => {
                if res.is_err() {
                    return Ok(());
                }
                let state = *states.borrow_and_update();
                on_state(ctx, args, global, state).await?;
            }
        }
    }
}

/// Print alerts that entered the view and note the ones that left it.
fn announce(
    ctx: &Context,
    printer: &Printer<'_>,
    current: &[Arc<Alert>],
    seen: &mut HashMap<String, AlertStatus>,
) {
    for alert in current.iter().rev() {
        match seen.insert(alert.id.clone(), alert.status) {
            Some(previous) if previous == alert.status => {}
            _ => printer.alert(alert),
        }
    }

    let gone: Vec<String> = seen
        .keys()
        .filter(|id| !current.iter().any(|a| &a.id == *id))
        .cloned()
        .collect();
    for id in gone {
        seen.remove(&id);
        // Still in the collection, just filtered out (e.g. acknowledged).
        if let Some(alert) = ctx.session.store().get(&id) {
            printer.alert(&alert);
        }
    }
}

async fn on_state(
    ctx: &Context,
    args: &WatchArgs,
    global: &GlobalOpts,
    state: SessionState,
) -> Result<(), CliError> {
    tracing::debug!(?state, "session state");
    match state {
        SessionState::Connected => {
            if !global.quiet {
                eprintln!("Live feed connected");
            }
        }
        SessionState::Reconnecting { attempt } => {
            eprintln!("Live feed lost, retry {attempt}...");
        }
        SessionState::Disconnected if args.reconnect => {
            eprintln!(
                "Live feed gave up, reconnecting in {}s",
                RECONNECT_PAUSE.as_secs()
            );
            tokio::time::sleep(RECONNECT_PAUSE).await;
            ctx.session
                .reconnect()
                .await
                .map_err(|e| ctx.profile_err(e))?;
        }
        SessionState::Disconnected => return Err(CliError::StreamLost),
        SessionState::Unauthenticated => {
            return Err(CliError::NotLoggedIn {
                profile: ctx.profile_name.clone(),
            });
        }
        SessionState::Authenticating => {}
    }
    Ok(())
}

// ── Printer ─────────────────────────────────────────────────────────

struct Printer<'a> {
    format: &'a OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer<'_> {
    fn alert(&self, alert: &Alert) {
        // One record per line for structured formats.
        let format = match self.format {
            OutputFormat::Json => &OutputFormat::JsonCompact,
            other => other,
        };
        let out = output::render_single(format, alert, |a| self.line(a), |a| a.id.clone());
        output::print_output(&out, self.quiet);
    }

    fn line(&self, alert: &Alert) -> String {
        let time = alert
            .display_time()
            .map(ToString::to_string)
            .unwrap_or_default();
        let location = alert.location_label().unwrap_or_default();
        format!(
            "{time:<19}  {:<11}  {:<8} {:<4}  {location}  [{}]",
            output::paint_status(alert.status, self.color),
            alert.alert_type,
            output::paint_severity(alert.severity, self.color),
            alert.id,
        )
    }
}

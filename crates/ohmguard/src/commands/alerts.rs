//! Alert command handlers.

use std::sync::Arc;

use tabled::Tabled;

use ohmguard_core::{Alert, AlertPatch, AlertType, CoreError, StatusFilter};

use crate::cli::{AlertsArgs, AlertsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Assigned")]
    assigned_to: String,
}

impl From<&Arc<Alert>> for AlertRow {
    fn from(a: &Arc<Alert>) -> Self {
        Self {
            id: a.id.clone(),
            time: a.display_time().map(ToString::to_string).unwrap_or_default(),
            alert_type: a.alert_type.to_string(),
            severity: a.severity.to_string(),
            status: a.status.to_string(),
            location: a.location_label().unwrap_or_default(),
            assigned_to: a.assigned_to.clone().unwrap_or_default(),
        }
    }
}

/// Key/value block for `alerts show`.
pub fn detail(alert: &Alert, color: bool) -> String {
    let mut lines = vec![
        format!("ID:          {}", alert.id),
        format!("Type:        {}", alert.alert_type),
        format!("Severity:    {}", output::paint_severity(alert.severity, color)),
        format!("Status:      {}", output::paint_status(alert.status, color)),
        format!("Confidence:  {:.0}%", alert.confidence * 100.0),
    ];
    if let Some(time) = alert.occurred_at.as_ref() {
        lines.push(format!("Occurred:    {time}"));
    }
    if let Some(time) = alert.timestamp.as_ref() {
        lines.push(format!("Recorded:    {time}"));
    }
    if let Some(location) = alert.location_label() {
        lines.push(format!("Location:    {location}"));
    }
    if let Some(ref path) = alert.location_path {
        lines.push(format!("Path:        {path}"));
    }
    let sensor = alert.radar_name.as_ref().or(alert.sensor_id.as_ref());
    if let Some(sensor) = sensor {
        lines.push(format!("Sensor:      {sensor}"));
    }
    if let Some(ref serial) = alert.serial_product {
        lines.push(format!("Serial:      {serial}"));
    }
    if let Some(ref assigned) = alert.assigned_to {
        lines.push(format!("Assigned:    {assigned}"));
    }
    if let Some(ref notes) = alert.notes {
        lines.push(format!("Notes:       {notes}"));
    }
    lines.join("\n")
}

/// Print one alert in the selected format.
fn print_alert(alert: &Alert, global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    let out = output::render_single(&global.output, alert, |a| detail(a, color), |a| a.id.clone());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: AlertsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    // Reject bad input before touching the network.
    if let AlertsCommand::List {
        limit: Some(limit), ..
    } = args.command
    {
        if !(1..=500).contains(&limit) {
            return Err(CliError::Validation {
                field: "limit".into(),
                reason: format!("must be between 1 and 500, got {limit}"),
            });
        }
    }
    if let AlertsCommand::Update {
        status: None,
        assign: None,
        notes: None,
        ..
    } = args.command
    {
        return Err(CliError::Validation {
            field: "update".into(),
            reason: "pass at least one of --status, --assign, --notes".into(),
        });
    }

    let (page_limit, alert_type) = match args.command {
        AlertsCommand::List {
            limit, alert_type, ..
        } => (limit, alert_type.map(AlertType::from)),
        _ => (None, None),
    };
    let ctx = Context::open_with(global, |config| {
        config.live_updates = false;
        config.alert_type = alert_type;
        if let Some(limit) = page_limit {
            config.page_limit = limit;
        }
    })?;
    ctx.authenticate().await?;
    let result = run(&ctx, args.command, global).await;
    ctx.session.close().await;
    result
}

async fn run(ctx: &Context, command: AlertsCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let session = &ctx.session;

    match command {
        AlertsCommand::List { status, .. } => {
            let filter = StatusFilter::from(status);
            // Login already fetched the unfiltered first page.
            if filter != StatusFilter::All {
                session
                    .set_filter(filter)
                    .await
                    .map_err(|e| ctx.profile_err(e))?;
            }

            // `--type` is part of the server query, see `handle`.
            let alerts = session.filtered_alerts();

            let out =
                output::render_list(&global.output, &alerts, |a| AlertRow::from(a), |a| a.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlertsCommand::Show { id } => {
            let alert = session.select_alert(&id).await.map_err(|e| ctx.profile_err(e))?;
            print_alert(&alert, global);
            Ok(())
        }

        AlertsCommand::Ack { id } => {
            let alert = session.acknowledge(&id).await.map_err(|e| ctx.profile_err(e))?;
            if !global.quiet {
                eprintln!("Alert {} acknowledged", alert.id);
            }
            print_alert(&alert, global);
            Ok(())
        }

        AlertsCommand::Update {
            id,
            status,
            assign,
            notes,
        } => {
            let patch = AlertPatch {
                status: status.map(Into::into),
                assigned_to: assign,
                notes,
            };
            let alert = session
                .update_alert(&id, &patch)
                .await
                .map_err(|e| ctx.profile_err(e))?;
            if !global.quiet {
                eprintln!("Alert {} updated", alert.id);
            }
            print_alert(&alert, global);
            Ok(())
        }

        AlertsCommand::Simulate => {
            let created = ctx
                .client
                .create_fall_event()
                .await
                .map_err(|e| ctx.profile_err(CoreError::from(e)))?;
            if !global.quiet {
                eprintln!("{}", created.message);
            }
            output::print_output(&created.event_id, global.quiet);
            Ok(())
        }
    }
}

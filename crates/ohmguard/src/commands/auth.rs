//! Auth command handlers.

use ohmguard_core::User;

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Context, util};

fn detail(user: &User) -> String {
    let mut lines = vec![
        format!("Name:      {}", user.full_name),
        format!("Email:     {}", user.email),
        format!("Role:      {}", user.role),
    ];
    if let Some(ref tenant) = user.tenant_id {
        lines.push(format!("Tenant:    {tenant}"));
    }
    lines.push(format!("Language:  {}", user.language));
    if !user.is_active {
        lines.push("Active:    no".into());
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::open(global, false)?;

    match args.command {
        AuthCommand::Login { email } => {
            let email = match email {
                Some(email) => email,
                None => match ohmguard_config::resolve_email(&ctx.profile, &ctx.profile_name) {
                    Ok(email) => email,
                    Err(_) => util::prompt_line("Email")?,
                },
            };
            let password = match ohmguard_config::resolve_password(&ctx.profile, &ctx.profile_name)
            {
                Ok(password) => password,
                Err(_) => util::prompt_password("Password")?,
            };

            let user = ctx
                .session
                .login(&email, &password)
                .await
                .map_err(|e| ctx.profile_err(e))?;
            ctx.session.close().await;

            if !global.quiet {
                eprintln!("Logged in as {} ({})", user.email, user.role);
            }
            Ok(())
        }

        AuthCommand::Logout => {
            ctx.session.logout().await;
            if !global.quiet {
                eprintln!("Logged out of profile '{}'", ctx.profile_name);
            }
            Ok(())
        }

        AuthCommand::Whoami => {
            let user = ctx.authenticate().await?;
            ctx.session.close().await;
            let out =
                output::render_single(&global.output, user.as_ref(), detail, |u| u.email.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

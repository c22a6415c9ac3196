use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::debug;

use devspace::config::ClientConfig;
use devspace::context::DevspaceContext;
use devspace::error::{AuthError, GatewayError, WorkspaceError};
use devspace::lifecycle::{PrintOpener, SystemBrowser, UrlOpener};
use devspace::store::FileTokenStore;

use crate::cli_commands::Commands;

mod identity;
mod workspaces;

use self::identity::{
    handle_login_command, handle_logout_command, handle_register_command, handle_whoami_command,
};
use self::workspaces::{
    handle_create_command, handle_delete_command, handle_list_command, handle_logs_command,
    handle_open_command, handle_resources_command, handle_show_command, handle_start_command,
    handle_stop_command, handle_templates_command,
};

pub(crate) async fn handle_command(config: ClientConfig, command: Commands) -> Result<()> {
    let print_only = match &command {
        Commands::Start(args) => args.no_open,
        Commands::Open(args) => args.no_open,
        _ => false,
    };
    let opener: Arc<dyn UrlOpener> = if print_only {
        Arc::new(PrintOpener)
    } else {
        Arc::new(SystemBrowser)
    };
    let store = FileTokenStore::open(&config.state_dir)?;
    let ctx = DevspaceContext::new(config, Arc::new(store), opener)?;

    let state = ctx.session.bootstrap().await;
    debug!(state = state.label(), "session bootstrapped");

    let result = match command {
        Commands::Login(args) => handle_login_command(&ctx, args.username, args.password).await,
        Commands::Logout => handle_logout_command(&ctx).await,
        Commands::Register(args) => {
            handle_register_command(&ctx, args.username, args.email, args.password).await
        }
        Commands::Whoami(args) => handle_whoami_command(&ctx, args.json),
        Commands::List(args) => handle_list_command(&ctx, args.json).await,
        Commands::Show(args) => handle_show_command(&ctx, args.id, args.json).await,
        Commands::Create(args) => {
            handle_create_command(&ctx, args.name, args.template, args.resource, args.json).await
        }
        Commands::Start(args) => handle_start_command(&ctx, args.id, args.logs).await,
        Commands::Open(args) => handle_open_command(&ctx, args.id).await,
        Commands::Stop(args) => handle_stop_command(&ctx, args.id).await,
        Commands::Delete(args) => handle_delete_command(&ctx, args.id).await,
        Commands::Logs(args) => handle_logs_command(&ctx, args.id, args.follow).await,
        Commands::Templates(args) => handle_templates_command(&ctx, args.json).await,
        Commands::Resources(args) => handle_resources_command(&ctx, args.json).await,
    };
    ctx.shutdown();
    result
}

/// True when the failure means the stored session is gone.
pub(crate) fn needs_login(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(auth) = cause.downcast_ref::<AuthError>() {
            return matches!(auth, AuthError::SessionExpired);
        }
        if let Some(ws) = cause.downcast_ref::<WorkspaceError>() {
            return ws.is_session_expired();
        }
        cause
            .downcast_ref::<GatewayError>()
            .is_some_and(GatewayError::is_session_invalid)
    })
}

fn require_login(ctx: &DevspaceContext) -> Result<()> {
    if !ctx.session.is_authenticated() {
        return Err(AuthError::SessionExpired).context("not logged in");
    }
    Ok(())
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password is required");
    }
    Ok(password)
}

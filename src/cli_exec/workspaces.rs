use tokio::sync::watch;

use devspace::lifecycle::{OpenOutcome, StartupPhase, StartupWatch};
use devspace::logs::LogView;
use devspace::model::{LogLine, NewWorkspace, Workspace, WorkspaceId};

use super::*;

pub(super) async fn handle_list_command(ctx: &DevspaceContext, json: bool) -> Result<()> {
    require_login(ctx)?;
    let workspaces = ctx.workspaces.list().await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&workspaces).context("serialize workspaces json")?
        );
        return Ok(());
    }
    if workspaces.is_empty() {
        println!("No workspaces");
    }
    for ws in workspaces {
        match ws.launch_url() {
            Some(url) => println!("{}\t{}\t{}\t{}", ws.id, ws.status(), ws.name, url),
            None => println!("{}\t{}\t{}", ws.id, ws.status(), ws.name),
        }
    }
    Ok(())
}

pub(super) async fn handle_show_command(ctx: &DevspaceContext, id: String, json: bool) -> Result<()> {
    require_login(ctx)?;
    let ws = ctx.workspaces.get(&WorkspaceId::new(id)).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ws).context("serialize workspace json")?
        );
        return Ok(());
    }

    println!("id: {}", ws.id);
    println!("name: {}", ws.name);
    println!("status: {} ({})", ws.status(), ws.container_status);
    if !ws.owner_username.is_empty() {
        println!("owner: {}", ws.owner_username);
    }
    if let Some(url) = ws.container_url.as_deref().filter(|u| !u.is_empty()) {
        println!("url: {}", url);
    }
    if let Some(template) = &ws.git_template_details {
        println!("template: {} ({})", template.name, template.language);
    }
    if let Some(usage) = &ws.resource_usage {
        println!(
            "usage: cpu={:.1}% memory={:.1}/{:.1} disk={:.1}/{:.1}",
            usage.cpu_usage,
            usage.memory_usage,
            usage.memory_total,
            usage.disk_usage,
            usage.disk_total
        );
    }
    if let Some(created) = &ws.created_at {
        println!("created_at: {}", created);
    }
    if let Some(accessed) = &ws.last_accessed {
        println!("last_accessed: {}", accessed);
    }
    Ok(())
}

pub(super) async fn handle_create_command(
    ctx: &DevspaceContext,
    name: String,
    template: Option<u64>,
    resource: Option<u64>,
    json: bool,
) -> Result<()> {
    require_login(ctx)?;
    let new = NewWorkspace {
        name,
        git_template: template,
        resource_class: resource,
    };
    let ws = ctx.workspaces.create(&new).await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&ws).context("serialize workspace json")?
        );
    } else {
        println!("Created {} ({})", ws.name, ws.id);
    }
    Ok(())
}

pub(super) async fn handle_start_command(
    ctx: &DevspaceContext,
    id: String,
    stream_logs: bool,
) -> Result<()> {
    require_login(ctx)?;
    let id = WorkspaceId::new(id);
    let startup = ctx.workspaces.start(&id).await?;
    println!("Starting {}", id);
    let ws = follow_startup(ctx, startup, stream_logs).await?;
    report_running(&ws);
    Ok(())
}

pub(super) async fn handle_open_command(ctx: &DevspaceContext, id: String) -> Result<()> {
    require_login(ctx)?;
    let id = WorkspaceId::new(id);
    match ctx.workspaces.open(&id).await? {
        OpenOutcome::Running { workspace, .. } => report_running(&workspace),
        OpenOutcome::Starting(startup) => {
            println!("{} is starting; waiting for it", id);
            let ws = follow_startup(ctx, startup, false).await?;
            report_running(&ws);
        }
        OpenOutcome::Idle(ws) => {
            println!(
                "{} is {}; run `devspace start {}`",
                ws.id, ws.container_status, ws.id
            );
        }
    }
    Ok(())
}

pub(super) async fn handle_stop_command(ctx: &DevspaceContext, id: String) -> Result<()> {
    require_login(ctx)?;
    let id = WorkspaceId::new(id);
    ctx.workspaces.stop(&id).await?;
    println!("Stopped {}", id);
    Ok(())
}

pub(super) async fn handle_delete_command(ctx: &DevspaceContext, id: String) -> Result<()> {
    require_login(ctx)?;
    let id = WorkspaceId::new(id);
    ctx.workspaces.delete(&id).await?;
    println!("Deleted {}", id);
    Ok(())
}

pub(super) async fn handle_logs_command(
    ctx: &DevspaceContext,
    id: String,
    follow: bool,
) -> Result<()> {
    require_login(ctx)?;
    let id = WorkspaceId::new(id);
    if !follow {
        for line in ctx.logs.fetch(&id).await? {
            print_log_line(&line);
        }
        return Ok(());
    }

    let tail = ctx.logs.tail(&id);
    let mut views = Some(tail.subscribe());
    let mut printer = LogPrinter::default();
    loop {
        tokio::select! {
            view = next_log_view(&mut views) => printer.show(&view),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    tail.stop();
    Ok(())
}

pub(super) async fn handle_templates_command(ctx: &DevspaceContext, json: bool) -> Result<()> {
    require_login(ctx)?;
    let templates = ctx.workspaces.templates().await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&templates).context("serialize templates json")?
        );
        return Ok(());
    }
    for t in templates {
        if t.language.is_empty() {
            println!("{}\t{}", t.id, t.name);
        } else {
            println!("{}\t{}\t{}", t.id, t.name, t.language);
        }
    }
    Ok(())
}

pub(super) async fn handle_resources_command(ctx: &DevspaceContext, json: bool) -> Result<()> {
    require_login(ctx)?;
    let resources = ctx.workspaces.resources().await?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&resources).context("serialize resources json")?
        );
        return Ok(());
    }
    for r in resources {
        println!(
            "{}\t{}\tcpu={} memory={}GB disk={}GB gpu={}",
            r.id, r.name, r.cpu_count, r.memory_gb, r.disk_space_gb, r.gpu_count
        );
    }
    Ok(())
}

/// Prints status changes (and optionally logs) until the startup poll ends.
async fn follow_startup(
    ctx: &DevspaceContext,
    startup: StartupWatch,
    stream_logs: bool,
) -> Result<Workspace> {
    let tail = stream_logs.then(|| ctx.logs.tail(startup.id()));
    let mut views = tail.as_ref().map(|t| t.subscribe());
    let mut printer = LogPrinter::default();
    let mut phases = startup.subscribe();
    let mut last_phase = None;

    loop {
        tokio::select! {
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = phases.borrow_and_update().phase.clone();
                if let StartupPhase::Waiting(status) = &phase
                    && last_phase.as_ref() != Some(&phase)
                {
                    println!("status: {}", status);
                }
                if phase.is_terminal() {
                    break;
                }
                last_phase = Some(phase);
            }
            view = next_log_view(&mut views) => printer.show(&view),
            _ = tokio::signal::ctrl_c() => {
                startup.stop();
                break;
            }
        }
    }

    if let Some(tail) = &tail {
        printer.show(&tail.snapshot());
        tail.stop();
    }
    Ok(startup.wait().await?)
}

fn report_running(ws: &Workspace) {
    match ws.launch_url() {
        Some(url) => println!("{} is running at {}", ws.id, url),
        None => println!("{} is running", ws.id),
    }
}

/// Next view from a tail; never resolves once the tail has stopped.
async fn next_log_view(views: &mut Option<watch::Receiver<LogView>>) -> LogView {
    if let Some(rx) = views
        && rx.changed().await.is_ok()
    {
        return rx.borrow_and_update().clone();
    }
    *views = None;
    std::future::pending().await
}

#[derive(Default)]
struct LogPrinter {
    printed: usize,
    advised: bool,
}

impl LogPrinter {
    fn show(&mut self, view: &LogView) {
        for line in view.lines.iter().skip(self.printed) {
            print_log_line(line);
        }
        self.printed = self.printed.max(view.lines.len());

        match (&view.advisory, self.advised) {
            (Some(err), false) => {
                eprintln!("warning: {} (still retrying)", err);
                self.advised = true;
            }
            (None, true) => self.advised = false,
            _ => {}
        }
    }
}

fn print_log_line(line: &LogLine) {
    println!("[{}] {} {}", line.timestamp, line.level, line.message);
}

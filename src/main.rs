use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use devspace::config::{BASE_URL_ENV, ClientConfig, STATE_DIR_ENV};

mod cli_commands;
mod cli_exec;

use cli_commands::Commands;

#[derive(Parser)]
#[command(name = "devspace")]
#[command(about = "Manage remote development workspaces", long_about = None)]
struct Cli {
    /// Backend base URL (defaults to http://localhost:8001)
    #[arg(long, global = true, env = BASE_URL_ENV)]
    url: Option<String>,

    /// Directory holding tokens and config.json
    #[arg(long, global = true, env = STATE_DIR_ENV)]
    state_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        if cli_exec::needs_login(&err) {
            eprintln!("hint: run `devspace login` to sign in again");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    devspace::logging::init(cli.verbose);

    let config = ClientConfig::resolve(cli.url, cli.state_dir)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(cli_exec::handle_command(config, cli.command))
}

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Log in and store credentials
    Login(LoginArgs),

    /// Log out (best-effort remote logout, always clears local credentials)
    Logout,

    /// Create a new account
    Register(RegisterArgs),

    /// Show the logged-in user
    Whoami(JsonArgs),

    /// List workspaces
    List(JsonArgs),

    /// Show one workspace
    Show(ShowArgs),

    /// Create a workspace
    Create(CreateArgs),

    /// Start a workspace and wait until it is running
    Start(StartArgs),

    /// Open a workspace, waiting for it if it is still starting
    Open(OpenArgs),

    /// Stop a workspace
    Stop(IdArgs),

    /// Delete a workspace
    Delete(IdArgs),

    /// Print workspace logs
    Logs(LogsArgs),

    /// List git templates
    Templates(JsonArgs),

    /// List resource classes
    Resources(JsonArgs),
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, env = "DEVSPACE_USERNAME")]
    pub(crate) username: String,

    /// Read from stdin when omitted
    #[arg(long, env = "DEVSPACE_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct RegisterArgs {
    #[arg(long)]
    pub(crate) username: String,

    #[arg(long)]
    pub(crate) email: String,

    /// Read from stdin when omitted
    #[arg(long, env = "DEVSPACE_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct JsonArgs {
    /// Emit JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args)]
pub(crate) struct IdArgs {
    pub(crate) id: String,
}

#[derive(Args)]
pub(crate) struct ShowArgs {
    pub(crate) id: String,

    /// Emit JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args)]
pub(crate) struct CreateArgs {
    #[arg(long)]
    pub(crate) name: String,

    /// Git template id
    #[arg(long)]
    pub(crate) template: Option<u64>,

    /// Resource class id
    #[arg(long)]
    pub(crate) resource: Option<u64>,

    /// Emit JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args)]
pub(crate) struct StartArgs {
    pub(crate) id: String,

    /// Print the URL instead of launching a browser
    #[arg(long)]
    pub(crate) no_open: bool,

    /// Stream startup logs while waiting
    #[arg(long)]
    pub(crate) logs: bool,
}

#[derive(Args)]
pub(crate) struct OpenArgs {
    pub(crate) id: String,

    /// Print the URL instead of launching a browser
    #[arg(long)]
    pub(crate) no_open: bool,
}

#[derive(Args)]
pub(crate) struct LogsArgs {
    pub(crate) id: String,

    /// Keep polling for new lines until interrupted
    #[arg(short, long)]
    pub(crate) follow: bool,
}

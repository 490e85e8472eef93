use clap::{Parser, Subcommand};

/// Wires the deployment orchestration core together and drives it from the
/// command line. Request parsing/authentication for a real HTTP control
/// plane are out of scope here (spec §1) — this binary is the minimal
/// wiring and invocation surface around the core crates.
#[derive(Parser)]
#[clap(author, version, about)]
pub struct Args {
    /// SQLite connection string for the repository layer.
    #[clap(long, env = "NEBULA_DATABASE_URL", default_value = "sqlite://nebula.db")]
    pub database_url: String,

    /// Root directory for builder source checkouts and build artifacts.
    #[clap(long, env = "NEBULA_DATA_ROOT", default_value = "./data")]
    pub data_root: String,

    /// Base URL of the reverse proxy's admin API.
    #[clap(long, env = "NEBULA_PROXY_URL", default_value = "http://127.0.0.1:9000")]
    pub proxy_url: String,

    /// Default health-check attempts before a deployment is marked failed.
    #[clap(long, env = "NEBULA_HEALTH_CHECK_ATTEMPTS", default_value = "30")]
    pub health_check_attempts: u32,

    /// Seconds to wait between health-check attempts.
    #[clap(long, env = "NEBULA_HEALTH_CHECK_INTERVAL_SECS", default_value = "2")]
    pub health_check_interval_secs: u64,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a project.
    CreateProject {
        name: String,
        #[clap(long, default_value = "")]
        display_name: String,
    },
    /// Deploy a pre-built image.
    DeployImage {
        project: String,
        image: String,
        #[clap(long)]
        service: Option<String>,
        #[clap(long)]
        port: u16,
        #[clap(long)]
        start_command: Option<String>,
    },
    /// Deploy from a git repository.
    DeploySource {
        project: String,
        git_repo: String,
        #[clap(long, default_value = "main")]
        git_branch: String,
        #[clap(long)]
        service: Option<String>,
        #[clap(long)]
        port: Option<u16>,
    },
    /// Re-deploy a service using its last saved configuration.
    DeployService { project: String, service: String },
    /// Print a deployment's current status as JSON.
    Status { deployment_id: String },
    /// Stream a deployment's logs to stdout.
    Logs {
        deployment_id: String,
        #[clap(long)]
        follow: bool,
        #[clap(long)]
        tail: Option<u32>,
    },
}

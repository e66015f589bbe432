//! Pledge CLI - command-line interface for the commitment ledger
//!
//! Every write goes through the workspace's lock-validate-append path; every
//! read replays the operation log. The CLI adds argument parsing, output
//! formatting and the cloud sync commands on top.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use pledge_workspace::Workspace;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod output;

use commands::{cloud, genesis, init, query, record};
use output::OutputFormat;

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "PLEDGE_LOG";

/// Pledge CLI application
#[derive(Parser, Debug)]
#[command(name = "pledge")]
#[command(about = "Pledge - an append-only ledger of memories and commitments", long_about = None)]
#[command(version)]
struct Cli {
    /// Acting identity (falls back to the workspace default actor, then "user")
    #[arg(short, long, global = true, env = "PLEDGE_ACTOR")]
    actor: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Directory to search for the workspace from
    #[arg(short = 'C', long = "dir", global = true, default_value = ".")]
    dir: PathBuf,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a workspace in the target directory
    Init(init::InitArgs),

    #[command(flatten)]
    Record(record::RecordCommands),

    #[command(flatten)]
    Query(query::QueryCommands),

    /// Attach a reference to a record in an external system
    LinkExternal(query::LinkExternalArgs),

    /// Inspect the Genesis Key
    Genesis {
        #[command(subcommand)]
        command: genesis::GenesisCommands,
    },

    /// Configure the cloud sync remote
    Cloud {
        #[command(subcommand)]
        command: cloud::CloudCommands,
    },

    #[command(flatten)]
    Sync(cloud::SyncCommands),
}

/// What every command needs besides its own arguments.
pub struct Context {
    pub dir: PathBuf,
    actor: Option<String>,
    pub output: OutputFormat,
}

impl Context {
    /// The workspace containing `--dir`, searching parent directories.
    pub fn workspace(&self) -> anyhow::Result<Workspace> {
        let start = std::fs::canonicalize(&self.dir)
            .with_context(|| format!("cannot resolve {}", self.dir.display()))?;
        Ok(Workspace::discover(&start)?)
    }

    /// The acting identity for writes in `workspace`.
    pub fn actor(&self, workspace: &Workspace) -> String {
        workspace.resolve_actor(self.actor.as_deref())
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().without_time().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context {
        dir: cli.dir,
        actor: cli.actor,
        output: cli.output,
    };

    match cli.command {
        Commands::Init(args) => init::execute(args, &ctx),
        Commands::Record(command) => record::execute(command, &ctx),
        Commands::Query(command) => query::execute(command, &ctx),
        Commands::LinkExternal(args) => query::link_external(args, &ctx),
        Commands::Genesis { command } => genesis::execute(command, &ctx),
        Commands::Cloud { command } => cloud::configure(command, &ctx),
        Commands::Sync(command) => cloud::execute(command, &ctx)
            .await
            .context("sync failed"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let format = cli.output;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_failure(&e, format);
            ExitCode::FAILURE
        }
    }
}

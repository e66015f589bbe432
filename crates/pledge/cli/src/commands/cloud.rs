//! Cloud configuration and sync commands

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use colored::*;
use pledge_sync::{
    watch, HttpRemote, PullResult, PushResult, SyncEngine, SyncError, SyncOptions, SyncReport,
    WatchOptions,
};
use pledge_workspace::CloudConfig;

use crate::output::{print_info, print_single, print_success, print_warning, OutputFormat};
use crate::Context;

#[derive(Subcommand, Debug)]
pub enum CloudCommands {
    /// Point the workspace at a sync service
    Configure {
        /// Base URL of the sync service
        #[arg(long)]
        endpoint: String,

        /// Workspace identifier on the service
        #[arg(long)]
        workspace_id: String,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Operations fetched per pull request
        #[arg(long)]
        pull_limit: Option<u32>,
    },

    /// Stop syncing, keeping the configured remote
    Disable,

    /// Print the cloud configuration
    Show,
}

#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Bearer token for the sync service
    #[arg(long, env = "PLEDGE_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Send local operations to the remote
    Push {
        /// Report what would be sent without contacting the remote
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Fetch and merge operations from the remote
    Pull {
        /// Fetch one page without merging it
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Push then pull
    Sync {
        #[arg(long)]
        dry_run: bool,

        #[arg(long, conflicts_with = "pull_only")]
        push_only: bool,

        #[arg(long)]
        pull_only: bool,

        /// Keep running, syncing periodically and after local changes
        #[arg(long, conflicts_with = "dry_run")]
        watch: bool,

        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// Show the device's sync state
    SyncStatus {
        #[command(flatten)]
        remote: RemoteArgs,
    },
}

pub fn configure(command: CloudCommands, ctx: &Context) -> anyhow::Result<()> {
    let mut ws = ctx.workspace()?;
    let mut config = ws.config().clone();

    match command {
        CloudCommands::Configure {
            endpoint,
            workspace_id,
            timeout_secs,
            pull_limit,
        } => {
            let mut cloud = CloudConfig::new(endpoint, workspace_id);
            if let Some(secs) = timeout_secs {
                cloud.timeout_secs = secs;
            }
            if let Some(limit) = pull_limit {
                cloud.pull_limit = limit;
            }
            config.cloud = Some(cloud);
            ws.save_config(config)?;
            print_success("Cloud sync configured");
        }
        CloudCommands::Disable => match config.cloud.as_mut() {
            Some(cloud) => {
                cloud.enabled = false;
                ws.save_config(config)?;
                print_success("Cloud sync disabled");
            }
            None => print_info("Cloud sync is not configured"),
        },
        CloudCommands::Show => match &config.cloud {
            Some(cloud) => print_single(cloud, ctx.output)?,
            None => return Err(SyncError::NotConfigured.into()),
        },
    }
    Ok(())
}

fn engine(ctx: &Context, remote: RemoteArgs) -> anyhow::Result<SyncEngine> {
    let ws = ctx.workspace()?;
    let cloud = ws
        .config()
        .active_cloud()
        .ok_or(SyncError::NotConfigured)?
        .clone();
    let settings = SyncEngine::settings_from(&ws)?;
    let http = HttpRemote::from_config(&cloud, remote.token)?;
    Ok(SyncEngine::new(ws, Arc::new(http), settings))
}

pub async fn execute(command: SyncCommands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        SyncCommands::Push { dry_run, remote } => {
            let result = engine(ctx, remote)?.push(dry_run).await?;
            report_push(&result, ctx.output)
        }
        SyncCommands::Pull { dry_run, remote } => {
            let result = engine(ctx, remote)?.pull(dry_run).await?;
            report_pull(&result, dry_run, ctx.output)
        }
        SyncCommands::Sync {
            dry_run,
            push_only,
            pull_only,
            watch: keep_watching,
            remote,
        } => {
            let options = SyncOptions {
                dry_run,
                push_only,
                pull_only,
            };
            let engine = engine(ctx, remote)?;
            if keep_watching {
                return watch_until_interrupted(engine, options, ctx.output).await;
            }
            let report = engine.full_sync(options).await?;
            report_sync(&report, dry_run, ctx.output)
        }
        SyncCommands::SyncStatus { remote } => {
            let status = engine(ctx, remote)?.status()?;
            if !ctx.output.is_table() {
                return print_single(&status, ctx.output);
            }
            println!("{} {}", "Status:".bold(), status.status);
            println!("  workspace  {}", status.workspace_id);
            println!("  client     {}", status.client_id);
            println!("  pending    {}", status.pending_operations);
            match status.last_sync_at {
                Some(at) => println!("  last sync  {}", at.to_rfc3339()),
                None => println!("  last sync  {}", "never".dimmed()),
            }
            Ok(())
        }
    }
}

async fn watch_until_interrupted(
    engine: SyncEngine,
    sync: SyncOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let interval = engine
        .workspace()
        .config()
        .active_cloud()
        .map_or(WatchOptions::default().interval, |c| {
            Duration::from_secs(c.watch_interval_secs)
        });
    let options = WatchOptions {
        interval,
        sync,
        ..Default::default()
    };

    let (tx, rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(true);
        }
    });

    print_info("Watching for changes (Ctrl-C to stop)");
    watch(Arc::new(engine), options, rx, move |outcome| match outcome {
        Ok(report) => {
            if let Err(e) = report_sync(report, false, format) {
                print_warning(&format!("failed to print sync report: {e}"));
            }
        }
        Err(e) => print_warning(&format!("sync failed [{}]: {e}", e.code())),
    })
    .await;
    Ok(())
}

fn report_push(result: &PushResult, format: OutputFormat) -> anyhow::Result<()> {
    if !format.is_table() {
        return print_single(result, format);
    }
    print_push(result);
    Ok(())
}

fn print_push(result: &PushResult) {
    if result.pushed == 0 && result.rejected.is_empty() {
        print_info("Nothing to push");
    } else {
        print_success(&format!("Pushed {} operation(s)", result.pushed));
    }
    for id in &result.rejected {
        print_warning(&format!("rejected by remote: {id}"));
    }
    for warning in &result.warnings {
        print_warning(warning);
    }
}

fn report_pull(result: &PullResult, dry_run: bool, format: OutputFormat) -> anyhow::Result<()> {
    if !format.is_table() {
        return print_single(result, format);
    }
    print_pull(result, dry_run);
    Ok(())
}

fn print_pull(result: &PullResult, dry_run: bool) {
    if dry_run {
        print_info(&format!(
            "DRY RUN: {} operation(s) available{}",
            result.pulled,
            if result.has_more { ", more pending" } else { "" }
        ));
    } else if result.pulled == 0 {
        print_info("Already up to date");
    } else {
        print_success(&format!(
            "Pulled {} operation(s), {} new",
            result.pulled, result.merged
        ));
    }
}

fn report_sync(report: &SyncReport, dry_run: bool, format: OutputFormat) -> anyhow::Result<()> {
    if !format.is_table() {
        return print_single(report, format);
    }
    if let Some(push) = &report.push {
        print_push(push);
    }
    if let Some(pull) = &report.pull {
        print_pull(pull, dry_run);
    }
    Ok(())
}

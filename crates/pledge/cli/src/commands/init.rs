//! Workspace initialization

use anyhow::Context as _;
use clap::Args;
use pledge_workspace::{update_gitignore, InitOptions, Workspace};
use serde::Serialize;

use crate::output::{print_info, print_single, print_success};
use crate::Context;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Workspace name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Actor used when none is given on the command line or in PLEDGE_ACTOR
    #[arg(long)]
    pub default_actor: Option<String>,

    /// Replace an existing workspace, discarding its ledger
    #[arg(long)]
    pub force: bool,

    /// Leave .gitignore untouched
    #[arg(long)]
    pub no_gitignore: bool,
}

#[derive(Serialize)]
struct Initialized<'a> {
    workspace: &'a str,
    path: String,
    gitignore_updated: bool,
}

pub fn execute(args: InitArgs, ctx: &Context) -> anyhow::Result<()> {
    let root = std::fs::canonicalize(&ctx.dir)
        .with_context(|| format!("cannot resolve {}", ctx.dir.display()))?;
    let workspace = Workspace::init(
        &root,
        InitOptions {
            name: args.name,
            default_actor: args.default_actor,
            force: args.force,
        },
    )?;

    let gitignore_updated = if args.no_gitignore {
        false
    } else {
        update_gitignore(workspace.root()).context("failed to update .gitignore")?
    };

    if ctx.output.is_table() {
        print_success(&format!(
            "Initialized workspace '{}' in {}",
            workspace.name(),
            workspace.dir().display()
        ));
        if gitignore_updated {
            print_info("Added .pledge/ to .gitignore");
        }
        return Ok(());
    }
    print_single(
        &Initialized {
            workspace: workspace.name(),
            path: workspace.dir().display().to_string(),
            gitignore_updated,
        },
        ctx.output,
    )
}

//! Genesis Key inspection

use clap::Subcommand;
use pledge_types::OpType;
use serde::Serialize;

use crate::output::{print_info, print_single, print_success, print_warning};
use crate::Context;

#[derive(Subcommand, Debug)]
pub enum GenesisCommands {
    /// Print the workspace's Genesis Key
    Show,

    /// Check whether an actor may perform an operation
    Check {
        /// Operation type, e.g. claim or approve
        op: OpType,
    },
}

#[derive(Serialize)]
struct PermissionCheck {
    actor: String,
    op: OpType,
    allowed: bool,
}

pub fn execute(command: GenesisCommands, ctx: &Context) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let genesis = ws.genesis()?;

    match command {
        GenesisCommands::Show => match genesis {
            Some(key) if ctx.output.is_table() => {
                print!("{}", key.to_yaml_string()?);
                Ok(())
            }
            Some(key) => print_single(&key, ctx.output),
            None => {
                print_info(&format!(
                    "No Genesis Key at {}; every actor may perform every operation",
                    ws.genesis_path().display()
                ));
                Ok(())
            }
        },
        GenesisCommands::Check { op } => {
            let actor = ctx.actor(&ws);
            let allowed = genesis.map_or(true, |key| key.has_permission(&actor, op));
            if !ctx.output.is_table() {
                return print_single(&PermissionCheck { actor, op, allowed }, ctx.output);
            }
            if allowed {
                print_success(&format!("{actor} may {op}"));
            } else {
                print_warning(&format!("{actor} may not {op}"));
            }
            Ok(())
        }
    }
}

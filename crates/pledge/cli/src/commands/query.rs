//! Read-only views over the ledger, plus external references

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::*;
use pledge_state::{
    commitments_where, compute_memories, duplicates_of, external_refs, get_commitment, get_memory,
    linked_commitments, linked_memories, memory_states, review_queue, status_summary,
    CommitmentFilter, ReviewQueueFilter,
};
use pledge_types::{Commitment, CommitmentState, ExternalRef, Memory, MemoryState, OpType, ValidationError};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{print_output, print_recorded, print_single};
use crate::Context;

/// Longest body shown in a table cell.
const BODY_WIDTH: usize = 60;

#[derive(Subcommand, Debug)]
pub enum QueryCommands {
    /// Show a memory, commitment or operation by id
    Show { id: String },

    /// List commitments, or memories with --memories
    #[command(alias = "ls")]
    List {
        /// Only commitments in this state
        #[arg(long, conflicts_with = "memories")]
        state: Option<CommitmentState>,

        /// Only commitments owned by this actor
        #[arg(long, conflicts_with = "memories")]
        owner: Option<String>,

        #[arg(long, conflicts_with = "memories")]
        tag: Option<String>,

        /// List memories instead of commitments
        #[arg(long)]
        memories: bool,

        /// Only memories in this triage state
        #[arg(long, requires = "memories")]
        triage: Option<MemoryState>,
    },

    /// Commitments grouped by lifecycle state
    Status,

    /// Commitments waiting for review
    ReviewQueue {
        #[arg(long)]
        submitter: Option<String>,

        #[arg(long)]
        tier: Option<String>,

        /// Also show commitments that were approved automatically
        #[arg(long)]
        include_auto_approved: bool,
    },

    /// Operations in log order, newest last
    Log {
        /// Show only the last N operations
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only operations of this type
        #[arg(long)]
        op: Option<OpType>,

        #[arg(long)]
        by: Option<String>,
    },

    /// External references recorded on a commitment
    Refs { commitment: String },
}

#[derive(Args, Debug)]
pub struct LinkExternalArgs {
    pub commitment: String,

    /// External system, e.g. github or jira
    #[arg(long)]
    pub system: String,

    /// Kind of item in that system, e.g. issue or pull_request
    #[arg(long = "type")]
    pub ref_type: String,

    /// Item id in that system
    #[arg(long)]
    pub id: String,

    #[arg(long)]
    pub url: String,
}

#[derive(Tabled, Serialize)]
struct CommitmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "OWNER")]
    owner: String,
    #[tabled(rename = "TAGS")]
    tags: String,
    #[tabled(rename = "BODY")]
    body: String,
}

impl From<&Commitment> for CommitmentRow {
    fn from(c: &Commitment) -> Self {
        Self {
            id: c.id.clone(),
            state: c.state.to_string(),
            owner: c.owner.clone().unwrap_or_else(|| "-".into()),
            tags: c.tags.as_deref().map(|t| t.join(",")).unwrap_or_default(),
            body: truncate(&c.body),
        }
    }
}

#[derive(Tabled, Serialize)]
struct MemoryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "STATE")]
    state: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "ACTOR")]
    actor: String,
    #[tabled(rename = "BODY")]
    body: String,
}

#[derive(Tabled, Serialize)]
struct ReviewRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TIER")]
    tier: String,
    #[tabled(rename = "SUBMITTER")]
    submitter: String,
    #[tabled(rename = "SUBMITTED")]
    submitted_at: String,
    #[tabled(rename = "BODY")]
    body: String,
}

#[derive(Tabled, Serialize)]
struct LogRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "OP")]
    op: String,
    #[tabled(rename = "ACTOR")]
    actor: String,
    #[tabled(rename = "TIME")]
    ts: String,
}

#[derive(Tabled, Serialize)]
struct ExternalRefRow {
    #[tabled(rename = "SYSTEM")]
    system: String,
    #[tabled(rename = "TYPE")]
    ref_type: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<ExternalRef> for ExternalRefRow {
    fn from(r: ExternalRef) -> Self {
        Self {
            system: r.system,
            ref_type: r.ref_type,
            id: r.id,
            url: r.url,
        }
    }
}

#[derive(Serialize)]
struct CommitmentDetail {
    #[serde(flatten)]
    commitment: Commitment,
    linked_memories: Vec<String>,
    linked_commitments: Vec<String>,
    duplicates: Vec<String>,
    external_refs: Vec<ExternalRef>,
}

#[derive(Serialize)]
struct MemoryDetail {
    #[serde(flatten)]
    memory: Memory,
    state: MemoryState,
}

fn truncate(body: &str) -> String {
    let first_line = body.lines().next().unwrap_or_default();
    if first_line.chars().count() <= BODY_WIDTH && first_line.len() == body.len() {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(BODY_WIDTH - 1).collect();
    format!("{cut}…")
}

fn timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

pub fn execute(command: QueryCommands, ctx: &Context) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let ops = ws.read()?;

    match command {
        QueryCommands::Show { id } => {
            if let Some(commitment) = get_commitment(&ops, &id) {
                let detail = CommitmentDetail {
                    linked_memories: linked_memories(&ops, &id),
                    linked_commitments: linked_commitments(&ops, &id),
                    duplicates: duplicates_of(&ops, &id),
                    external_refs: external_refs(&ops, &id),
                    commitment,
                };
                return print_single(&detail, ctx.output);
            }
            if let Some(memory) = get_memory(&ops, &id) {
                let state = memory_states(&ops).get(&id).copied().unwrap_or_default();
                return print_single(&MemoryDetail { memory, state }, ctx.output);
            }
            if let Some(op) = ops.iter().find(|op| op.id == id) {
                return print_single(op, ctx.output);
            }
            Err(ValidationError::RefNotFound { what: "record", id }.into())
        }

        QueryCommands::List {
            state,
            owner,
            tag,
            memories,
            triage,
        } => {
            if memories {
                let states = memory_states(&ops);
                let rows: Vec<MemoryRow> = compute_memories(&ops)
                    .into_iter()
                    .filter_map(|m| {
                        let state = states.get(&m.id).copied().unwrap_or_default();
                        triage.map_or(true, |t| t == state).then(|| MemoryRow {
                            state: state.to_string(),
                            kind: m.kind.unwrap_or_else(|| "-".into()),
                            body: truncate(&m.body),
                            actor: m.actor,
                            id: m.id,
                        })
                    })
                    .collect();
                return print_output(rows, ctx.output);
            }
            let filter = CommitmentFilter { state, owner, tag };
            let rows = commitments_where(&ops, &filter)
                .iter()
                .map(CommitmentRow::from)
                .collect();
            print_output::<CommitmentRow>(rows, ctx.output)
        }

        QueryCommands::Status => {
            let summary = status_summary(&ops);
            if !ctx.output.is_table() {
                return print_single(&summary, ctx.output);
            }
            println!("{} {}", "Workspace:".bold(), ws.name());
            let groups = [
                ("open", &summary.open),
                ("claimed", &summary.claimed),
                ("in review", &summary.in_review),
                ("reopened", &summary.reopened),
                ("closed", &summary.closed),
                ("duplicate", &summary.duplicate),
            ];
            for (label, group) in groups {
                println!("  {:<10} {}", label, group.len());
            }
            println!("  {:<10} {}", "total".dimmed(), summary.total());

            let active: Vec<CommitmentRow> = summary
                .claimed
                .iter()
                .chain(&summary.in_review)
                .chain(&summary.reopened)
                .map(CommitmentRow::from)
                .collect();
            if !active.is_empty() {
                println!();
                print_output(active, ctx.output)?;
            }
            Ok(())
        }

        QueryCommands::ReviewQueue {
            submitter,
            tier,
            include_auto_approved,
        } => {
            let filter = ReviewQueueFilter {
                submitter,
                tier,
                include_auto_approved,
            };
            let items = review_queue(&ops, &filter);
            if !ctx.output.is_table() {
                return print_single(&items, ctx.output);
            }
            let rows = items
                .into_iter()
                .map(|item| ReviewRow {
                    body: truncate(&item.body),
                    submitted_at: timestamp(item.submitted_at),
                    id: item.id,
                    tier: item.tier,
                    submitter: item.submitter,
                })
                .collect();
            print_output::<ReviewRow>(rows, ctx.output)
        }

        QueryCommands::Log { limit, op, by } => {
            let selected: Vec<_> = ops
                .iter()
                .filter(|o| op.map_or(true, |t| o.op_type() == t))
                .filter(|o| by.as_deref().map_or(true, |a| o.actor == a))
                .collect();
            let skip = limit.map_or(0, |n| selected.len().saturating_sub(n));
            let selected = &selected[skip..];
            if !ctx.output.is_table() {
                return print_single(&selected, ctx.output);
            }
            let rows = selected
                .iter()
                .map(|o| LogRow {
                    id: o.id.clone(),
                    op: o.op_type().to_string(),
                    actor: o.actor.clone(),
                    ts: timestamp(o.ts),
                })
                .collect();
            print_output::<LogRow>(rows, ctx.output)
        }

        QueryCommands::Refs { commitment } => {
            if get_commitment(&ops, &commitment).is_none() {
                return Err(ValidationError::RefNotFound {
                    what: "commitment",
                    id: commitment,
                }
                .into());
            }
            let rows = external_refs(&ops, &commitment)
                .into_iter()
                .map(ExternalRefRow::from)
                .collect();
            print_output::<ExternalRefRow>(rows, ctx.output)
        }
    }
}

pub fn link_external(args: LinkExternalArgs, ctx: &Context) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let actor = ctx.actor(&ws);
    let external = ExternalRef {
        system: args.system,
        ref_type: args.ref_type,
        id: args.id,
        url: args.url,
        synced_at: Utc::now(),
    };
    let op = ws.link_external(&actor, &args.commitment, external)?;
    print_recorded(&op, ctx.output)
}

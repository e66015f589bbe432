//! Commands that append one operation to the ledger

use anyhow::Context as _;
use clap::Subcommand;
use pledge_types::{
    AnnotatePayload, ApprovePayload, CapturePayload, ClosePayload, CommitPayload, DismissPayload,
    LinkKind, LinkPayload, Meta, OpPayload, PublishPayload, PublishSource, SubmitPayload,
    TriageAction, TriageDecision, TriagePayload,
};

use crate::output::print_recorded;
use crate::Context;

#[derive(Subcommand, Debug)]
pub enum RecordCommands {
    /// Record a memory: an observation or note
    Capture {
        /// Memory text
        body: String,

        /// Free-form category, e.g. "bug" or "idea"
        #[arg(long)]
        kind: Option<String>,

        /// Workspace-relative file the memory is about
        #[arg(long)]
        path: Option<String>,

        /// Related URL or identifier (repeatable)
        #[arg(long = "ref")]
        refs: Vec<String>,

        /// Arbitrary JSON object stored with the memory
        #[arg(long, value_parser = parse_meta)]
        meta: Option<Meta>,

        /// Idempotency key for imports; reusing one is rejected
        #[arg(long)]
        source_key: Option<String>,
    },

    /// Promote a memory into a commitment
    Commit {
        /// Commitment text
        body: String,

        /// Memory the commitment comes from
        #[arg(long)]
        source: String,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long, value_parser = parse_meta)]
        meta: Option<Meta>,

        #[arg(long)]
        source_key: Option<String>,
    },

    /// Take ownership of a commitment
    Claim { commitment: String },

    /// Give up ownership of a commitment
    Release {
        commitment: String,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Submit a claimed commitment for review
    Submit {
        commitment: String,

        /// Evidence reference (repeatable, at least one)
        #[arg(long, required = true)]
        evidence: Vec<String>,

        #[arg(long)]
        summary: Option<String>,

        /// Risk tier used by the review queue
        #[arg(long)]
        tier: Option<String>,
    },

    /// Approve a commitment that is in review
    Approve {
        commitment: String,

        #[arg(long)]
        comment: Option<String>,

        /// Mark the approval as automatic
        #[arg(long)]
        auto: bool,

        #[arg(long)]
        tier: Option<String>,
    },

    /// Reopen a closed or in-review commitment
    Reopen {
        commitment: String,

        #[arg(long)]
        reason: String,
    },

    /// Close a commitment with evidence, or as a duplicate of another
    #[command(group(clap::ArgGroup::new("resolution").required(true).args(["evidence", "duplicate_of"])))]
    Close {
        commitment: String,

        #[arg(long)]
        evidence: Option<String>,

        #[arg(long)]
        duplicate_of: Option<String>,
    },

    /// Attach a note to a memory or commitment
    Annotate {
        target: String,
        body: String,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long = "ref")]
        refs: Vec<String>,
    },

    /// Link a memory or commitment to a commitment
    Link {
        source: String,
        target: String,

        /// related, duplicate, caused_by, blocks or evidence
        #[arg(long)]
        kind: Option<LinkKind>,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Dismiss a memory during triage
    Dismiss {
        memory: String,

        #[arg(long)]
        reason: String,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Record the outcome of a triage session
    Triage {
        /// Memory reviewed in this session (repeatable)
        #[arg(long, required = true)]
        reviewed: Vec<String>,

        #[arg(long)]
        summary: String,

        /// MEMORY=ACTION[:TARGET] where ACTION is create, link, dismiss or defer
        #[arg(long = "decision", value_parser = parse_decision)]
        decisions: Vec<TriageDecision>,
    },

    /// Record that a document was published from the ledger
    Publish {
        #[arg(long)]
        id: String,

        #[arg(long)]
        module: String,

        #[arg(long)]
        path: String,

        #[arg(long)]
        version: u32,

        #[arg(long)]
        url: String,

        /// Read the published content from this file
        #[arg(long)]
        content_file: Option<std::path::PathBuf>,

        /// Record the document came from, e.g. cmt_1a2b3c4d
        #[arg(long)]
        from: Option<String>,
    },
}

fn parse_meta(raw: &str) -> Result<Meta, String> {
    serde_json::from_str(raw).map_err(|e| format!("expected a JSON object: {e}"))
}

fn parse_decision(raw: &str) -> Result<TriageDecision, String> {
    let (memory, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected MEMORY=ACTION[:TARGET], got '{raw}'"))?;
    let (action, target) = match rest.split_once(':') {
        Some((action, target)) => (action, Some(target.to_string())),
        None => (rest, None),
    };
    let action = match action {
        "create" => TriageAction::Create,
        "link" => TriageAction::Link,
        "dismiss" => TriageAction::Dismiss,
        "defer" => TriageAction::Defer,
        other => return Err(format!("unknown triage action '{other}'")),
    };
    Ok(TriageDecision {
        memory: memory.to_string(),
        action,
        target,
        reason: None,
    })
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

/// Kind of the record an id names, from its prefix.
fn source_kind(id: &str) -> &'static str {
    if id.starts_with("mem_") {
        "memory"
    } else if id.starts_with("cmt_") {
        "commitment"
    } else {
        "operation"
    }
}

pub fn execute(command: RecordCommands, ctx: &Context) -> anyhow::Result<()> {
    let ws = ctx.workspace()?;
    let actor = ctx.actor(&ws);

    let op = match command {
        RecordCommands::Capture {
            body,
            kind,
            path,
            refs,
            meta,
            source_key,
        } => {
            let payload = CapturePayload {
                body,
                kind,
                path,
                refs: non_empty(refs),
                meta,
            };
            ws.record(&actor, OpPayload::Capture(payload), source_key.as_deref())?
        }
        RecordCommands::Commit {
            body,
            source,
            tags,
            meta,
            source_key,
        } => {
            let payload = CommitPayload {
                body,
                source,
                tags: non_empty(tags),
                meta,
            };
            ws.record(&actor, OpPayload::Commit(payload), source_key.as_deref())?
        }
        RecordCommands::Claim { commitment } => ws.claim(&actor, &commitment)?,
        RecordCommands::Release { commitment, reason } => ws.release(&actor, &commitment, reason)?,
        RecordCommands::Submit {
            commitment,
            evidence,
            summary,
            tier,
        } => ws.submit(
            &actor,
            SubmitPayload {
                commitment,
                evidence,
                summary,
                tier,
                validation: None,
            },
        )?,
        RecordCommands::Approve {
            commitment,
            comment,
            auto,
            tier,
        } => ws.approve(
            &actor,
            ApprovePayload {
                commitment,
                comment,
                auto: auto.then_some(true),
                tier,
            },
        )?,
        RecordCommands::Reopen { commitment, reason } => ws.reopen(&actor, &commitment, &reason)?,
        RecordCommands::Close {
            commitment,
            evidence,
            duplicate_of,
        } => ws.close(
            &actor,
            ClosePayload {
                commitment,
                evidence,
                duplicate_of,
            },
        )?,
        RecordCommands::Annotate {
            target,
            body,
            kind,
            refs,
        } => ws.annotate(
            &actor,
            AnnotatePayload {
                target,
                body,
                kind,
                refs: non_empty(refs),
                meta: None,
            },
        )?,
        RecordCommands::Link {
            source,
            target,
            kind,
            reason,
        } => ws.link(
            &actor,
            LinkPayload {
                source,
                target,
                kind,
                reason,
            },
        )?,
        RecordCommands::Dismiss { memory, reason, tags } => ws.dismiss(
            &actor,
            DismissPayload {
                memory,
                reason,
                tags: non_empty(tags),
            },
        )?,
        RecordCommands::Triage {
            reviewed,
            summary,
            decisions,
        } => {
            let payload = TriagePayload {
                reviewed,
                summary,
                decisions,
            };
            ws.record(&actor, OpPayload::Triage(payload), None)?
        }
        RecordCommands::Publish {
            id,
            module,
            path,
            version,
            url,
            content_file,
            from,
        } => {
            let content = content_file
                .map(|file| {
                    std::fs::read_to_string(&file)
                        .with_context(|| format!("cannot read {}", file.display()))
                })
                .transpose()?;
            let payload = PublishPayload {
                id,
                module,
                path,
                version,
                url,
                content,
                source: from.map(|id| PublishSource {
                    kind: source_kind(&id).to_string(),
                    id,
                }),
            };
            ws.record(&actor, OpPayload::Publish(payload), None)?
        }
    };

    print_recorded(&op, ctx.output)
}

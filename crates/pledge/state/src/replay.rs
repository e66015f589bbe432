//! Commitment lifecycle replay.
//!
//! | From              | Operation              | To        |
//! |-------------------|------------------------|-----------|
//! | open              | claim                  | claimed   |
//! | claimed           | release                | open      |
//! | claimed/reopened  | submit                 | in_review |
//! | in_review         | approve                | closed    |
//! | in_review/closed  | reopen                 | reopened  |
//! | any non-terminal  | close                  | closed    |
//! | any non-terminal  | close `duplicate_of`   | duplicate |

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pledge_types::{
    Annotation, Commitment, CommitmentState, Memory, OpPayload, Operation,
};
use tracing::debug;

/// Lifecycle fields of one commitment, folded from its lifecycle operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitmentStatus {
    pub state: CommitmentState,
    pub owner: Option<String>,
    pub evidence: Option<String>,
    pub closed_by: Option<String>,
    pub duplicate_of: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub reopened_at: Option<DateTime<Utc>>,
    pub reopen_reason: Option<String>,
}

impl CommitmentStatus {
    /// Apply one lifecycle operation. Non-lifecycle operations are ignored.
    pub fn apply(&mut self, op: &Operation) {
        match &op.payload {
            OpPayload::Claim(_) => {
                self.state = CommitmentState::Claimed;
                self.owner = Some(op.actor.clone());
            }
            OpPayload::Release(_) => {
                self.state = CommitmentState::Open;
                self.owner = None;
            }
            OpPayload::Submit(p) => {
                // Owner is kept so the same actor can rework after a reopen.
                self.state = CommitmentState::InReview;
                self.evidence = p.evidence.first().cloned();
                self.submitted_at = Some(op.ts);
            }
            OpPayload::Approve(_) => {
                self.state = CommitmentState::Closed;
                self.closed_by = Some(op.actor.clone());
                self.approved_at = Some(op.ts);
                self.owner = None;
            }
            OpPayload::Reopen(p) => {
                self.state = CommitmentState::Reopened;
                self.reopened_at = Some(op.ts);
                self.reopen_reason = Some(p.reason.clone());
            }
            OpPayload::Close(p) => {
                match &p.duplicate_of {
                    Some(target) => {
                        self.state = CommitmentState::Duplicate;
                        self.duplicate_of = Some(target.clone());
                    }
                    None => {
                        self.state = CommitmentState::Closed;
                        self.evidence = p.evidence.clone();
                    }
                }
                self.owner = None;
                self.closed_by = Some(op.actor.clone());
            }
            _ => {}
        }
    }
}

/// Replay the lifecycle of a single commitment.
pub fn compute_commitment_state(ops: &[Operation], commitment_id: &str) -> CommitmentStatus {
    let mut status = CommitmentStatus::default();
    for op in ops {
        if op.payload.lifecycle_target() == Some(commitment_id) {
            status.apply(op);
        }
    }
    status
}

/// Every memory and commitment in creation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerState {
    pub memories: Vec<Memory>,
    pub commitments: Vec<Commitment>,
}

impl LedgerState {
    pub fn memory(&self, id: &str) -> Option<&Memory> {
        self.memories.iter().find(|m| m.id == id)
    }

    pub fn commitment(&self, id: &str) -> Option<&Commitment> {
        self.commitments.iter().find(|c| c.id == id)
    }
}

/// Derive every memory and commitment in a single pass over the log.
pub fn derive(ops: &[Operation]) -> LedgerState {
    let mut statuses: HashMap<&str, CommitmentStatus> = HashMap::new();
    let mut annotations: HashMap<&str, Vec<Annotation>> = HashMap::new();
    let mut memories = Vec::new();
    let mut commitments = Vec::new();

    for op in ops {
        if let Some(target) = op.payload.lifecycle_target() {
            statuses.entry(target).or_default().apply(op);
            continue;
        }
        match &op.payload {
            OpPayload::Capture(p) => memories.push(Memory {
                id: op.id.clone(),
                body: p.body.clone(),
                kind: p.kind.clone(),
                actor: op.actor.clone(),
                ts: op.ts,
                refs: p.refs.clone(),
                meta: p.meta.clone(),
                annotations: Vec::new(),
            }),
            OpPayload::Commit(_) => commitments.push(op),
            OpPayload::Annotate(p) => annotations
                .entry(p.target.as_str())
                .or_default()
                .push(annotation_from(op, p.body.clone(), p.kind.clone())),
            _ => {}
        }
    }

    for memory in &mut memories {
        if let Some(list) = annotations.get(memory.id.as_str()) {
            memory.annotations = list.clone();
        }
    }

    let commitments = commitments
        .into_iter()
        .filter_map(|op| {
            let status = statuses.get(op.id.as_str()).cloned().unwrap_or_default();
            let notes = annotations.get(op.id.as_str()).cloned().unwrap_or_default();
            build_commitment(op, status, notes)
        })
        .collect::<Vec<_>>();

    debug!(
        operations = ops.len(),
        memories = memories.len(),
        commitments = commitments.len(),
        "derived ledger state"
    );

    LedgerState {
        memories,
        commitments,
    }
}

pub(crate) fn annotation_from(op: &Operation, body: String, kind: Option<String>) -> Annotation {
    Annotation {
        id: op.id.clone(),
        body,
        kind,
        actor: op.actor.clone(),
        ts: op.ts,
    }
}

/// Assemble a commitment from its `commit` operation. Returns `None` for
/// any other operation.
pub(crate) fn build_commitment(
    op: &Operation,
    status: CommitmentStatus,
    annotations: Vec<Annotation>,
) -> Option<Commitment> {
    let OpPayload::Commit(p) = &op.payload else {
        return None;
    };
    Some(Commitment {
        id: op.id.clone(),
        body: p.body.clone(),
        source: p.source.clone(),
        state: status.state,
        owner: status.owner,
        evidence: status.evidence,
        closed_by: status.closed_by,
        duplicate_of: status.duplicate_of,
        actor: op.actor.clone(),
        ts: op.ts,
        tags: p.tags.clone(),
        meta: p.meta.clone(),
        submitted_at: status.submitted_at,
        approved_at: status.approved_at,
        reopened_at: status.reopened_at,
        reopen_reason: status.reopen_reason,
        annotations,
    })
}

//! Read-side queries over the operation log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pledge_types::ids::{is_commitment_id, is_memory_id};
use pledge_types::{
    Annotation, ApprovePayload, Commitment, CommitmentState, Memory, OpPayload, Operation,
};
use serde::Serialize;

use crate::replay::{annotation_from, build_commitment, compute_commitment_state, derive};

/// Tiers inferred from commitment tags when a submission names none.
const TIER_TAGS: [&str; 3] = ["tier_1", "tier_2", "tier_3"];
const DEFAULT_TIER: &str = "tier_2";

pub fn compute_memories(ops: &[Operation]) -> Vec<Memory> {
    derive(ops).memories
}

pub fn compute_commitments(ops: &[Operation]) -> Vec<Commitment> {
    derive(ops).commitments
}

pub fn get_memory(ops: &[Operation], id: &str) -> Option<Memory> {
    let op = ops
        .iter()
        .find(|op| op.id == id && matches!(op.payload, OpPayload::Capture(_)))?;
    let OpPayload::Capture(p) = &op.payload else {
        return None;
    };
    Some(Memory {
        id: op.id.clone(),
        body: p.body.clone(),
        kind: p.kind.clone(),
        actor: op.actor.clone(),
        ts: op.ts,
        refs: p.refs.clone(),
        meta: p.meta.clone(),
        annotations: annotations_for(ops, id),
    })
}

pub fn get_commitment(ops: &[Operation], id: &str) -> Option<Commitment> {
    let op = ops
        .iter()
        .find(|op| op.id == id && matches!(op.payload, OpPayload::Commit(_)))?;
    build_commitment(
        op,
        compute_commitment_state(ops, id),
        annotations_for(ops, id),
    )
}

/// Annotations targeting `target`, in log order.
pub fn annotations_for(ops: &[Operation], target: &str) -> Vec<Annotation> {
    ops.iter()
        .filter_map(|op| match &op.payload {
            OpPayload::Annotate(p) if p.target == target => {
                Some(annotation_from(op, p.body.clone(), p.kind.clone()))
            }
            _ => None,
        })
        .collect()
}

pub fn memory_exists(ops: &[Operation], id: &str) -> bool {
    ops.iter()
        .any(|op| op.id == id && matches!(op.payload, OpPayload::Capture(_)))
}

pub fn commitment_exists(ops: &[Operation], id: &str) -> bool {
    ops.iter()
        .any(|op| op.id == id && matches!(op.payload, OpPayload::Commit(_)))
}

/// Whether `id` names a memory or a commitment.
pub fn record_exists(ops: &[Operation], id: &str) -> bool {
    memory_exists(ops, id) || commitment_exists(ops, id)
}

/// Memories linked to a commitment.
pub fn linked_memories(ops: &[Operation], commitment_id: &str) -> Vec<String> {
    link_sources(ops, commitment_id, is_memory_id)
}

/// Commitments linked to a commitment.
pub fn linked_commitments(ops: &[Operation], commitment_id: &str) -> Vec<String> {
    link_sources(ops, commitment_id, is_commitment_id)
}

fn link_sources(ops: &[Operation], target: &str, keep: fn(&str) -> bool) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match &op.payload {
            OpPayload::Link(p) if p.target == target && keep(&p.source) => Some(p.source.clone()),
            _ => None,
        })
        .collect()
}

/// Commitments closed as duplicates of `commitment_id`.
pub fn duplicates_of(ops: &[Operation], commitment_id: &str) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match &op.payload {
            OpPayload::Close(p) if p.duplicate_of.as_deref() == Some(commitment_id) => {
                Some(p.commitment.clone())
            }
            _ => None,
        })
        .collect()
}

/// Criteria for [`commitments_where`]. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct CommitmentFilter {
    pub state: Option<CommitmentState>,
    pub owner: Option<String>,
    pub tag: Option<String>,
}

impl CommitmentFilter {
    pub fn matches(&self, commitment: &Commitment) -> bool {
        self.state.map_or(true, |s| commitment.state == s)
            && self
                .owner
                .as_deref()
                .map_or(true, |o| commitment.owner.as_deref() == Some(o))
            && self.tag.as_deref().map_or(true, |t| commitment.has_tag(t))
    }
}

pub fn commitments_where(ops: &[Operation], filter: &CommitmentFilter) -> Vec<Commitment> {
    compute_commitments(ops)
        .into_iter()
        .filter(|c| filter.matches(c))
        .collect()
}

/// Commitments grouped by lifecycle state.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatusSummary {
    pub open: Vec<Commitment>,
    pub claimed: Vec<Commitment>,
    pub in_review: Vec<Commitment>,
    pub reopened: Vec<Commitment>,
    pub closed: Vec<Commitment>,
    pub duplicate: Vec<Commitment>,
}

impl StatusSummary {
    pub fn total(&self) -> usize {
        self.open.len()
            + self.claimed.len()
            + self.in_review.len()
            + self.reopened.len()
            + self.closed.len()
            + self.duplicate.len()
    }
}

pub fn status_summary(ops: &[Operation]) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for commitment in compute_commitments(ops) {
        let bucket = match commitment.state {
            CommitmentState::Open => &mut summary.open,
            CommitmentState::Claimed => &mut summary.claimed,
            CommitmentState::InReview => &mut summary.in_review,
            CommitmentState::Reopened => &mut summary.reopened,
            CommitmentState::Closed => &mut summary.closed,
            CommitmentState::Duplicate => &mut summary.duplicate,
        };
        bucket.push(commitment);
    }
    summary
}

#[derive(Clone, Debug, Default)]
pub struct ReviewQueueFilter {
    /// Only items submitted by this actor.
    pub submitter: Option<String>,
    pub tier: Option<String>,
    /// Also list commitments that were auto-approved.
    pub include_auto_approved: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewItem {
    pub id: String,
    pub body: String,
    /// Actor of the latest submission.
    pub submitter: String,
    pub tier: String,
    pub state: CommitmentState,
    pub submitted_at: DateTime<Utc>,
    pub evidence: Vec<String>,
}

/// Commitments awaiting review, keyed off each commitment's latest submission.
pub fn review_queue(ops: &[Operation], filter: &ReviewQueueFilter) -> Vec<ReviewItem> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest_submit: HashMap<&str, &Operation> = HashMap::new();
    let mut latest_approve: HashMap<&str, &ApprovePayload> = HashMap::new();

    for op in ops {
        match &op.payload {
            OpPayload::Submit(p) => {
                if latest_submit.insert(p.commitment.as_str(), op).is_none() {
                    order.push(p.commitment.as_str());
                }
            }
            OpPayload::Approve(p) => {
                latest_approve.insert(p.commitment.as_str(), p);
            }
            _ => {}
        }
    }

    let state = derive(ops);
    order
        .into_iter()
        .filter_map(|id| {
            let submit = latest_submit.get(id)?;
            let OpPayload::Submit(payload) = &submit.payload else {
                return None;
            };
            let commitment = state.commitment(id)?;

            let auto_approved = commitment.state == CommitmentState::Closed
                && latest_approve
                    .get(id)
                    .is_some_and(|a| a.auto == Some(true));
            if commitment.state != CommitmentState::InReview
                && !(filter.include_auto_approved && auto_approved)
            {
                return None;
            }
            if filter
                .submitter
                .as_deref()
                .is_some_and(|s| submit.actor != s)
            {
                return None;
            }

            let tier = payload
                .tier
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| {
                    TIER_TAGS
                        .iter()
                        .find(|t| commitment.has_tag(t))
                        .map(|t| t.to_string())
                })
                .unwrap_or_else(|| DEFAULT_TIER.to_string());
            if filter.tier.as_deref().is_some_and(|t| t != tier) {
                return None;
            }

            Some(ReviewItem {
                id: commitment.id.clone(),
                body: commitment.body.clone(),
                submitter: submit.actor.clone(),
                tier,
                state: commitment.state,
                submitted_at: submit.ts,
                evidence: payload.evidence.clone(),
            })
        })
        .collect()
}

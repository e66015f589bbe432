//! Typed operation payloads.
//!
//! Each operation type has exactly one payload shape. On the wire the payload
//! is a plain JSON object; the envelope's `op` field decides which shape it is
//! parsed into (see [`OpPayload::from_value`]).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::operation::OpType;
use crate::records::CommitmentState;

/// Free-form metadata attached to captures, commits and annotations.
pub type Meta = serde_json::Map<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturePayload {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitPayload {
    pub body: String,
    /// Memory the commitment was made from.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPayload {
    pub commitment: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePayload {
    pub commitment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Result of one automated check attached to a submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPayload {
    pub commitment: String,
    /// Memory ids supporting the submission. The first one becomes the
    /// commitment's evidence.
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<BTreeMap<String, ValidationCheck>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovePayload {
    pub commitment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReopenPayload {
    pub commitment: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_state: Option<CommitmentState>,
}

/// Closes a commitment either with evidence or as a duplicate of another.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosePayload {
    pub commitment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatePayload {
    /// Memory or commitment being annotated.
    pub target: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Related,
    Duplicate,
    CausedBy,
    Blocks,
    Evidence,
}

impl LinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkKind::Related => "related",
            LinkKind::Duplicate => "duplicate",
            LinkKind::CausedBy => "caused_by",
            LinkKind::Blocks => "blocks",
            LinkKind::Evidence => "evidence",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "related" => Ok(LinkKind::Related),
            "duplicate" => Ok(LinkKind::Duplicate),
            "caused_by" => Ok(LinkKind::CausedBy),
            "blocks" => Ok(LinkKind::Blocks),
            "evidence" => Ok(LinkKind::Evidence),
            other => Err(format!("unknown link kind '{other}'")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPayload {
    /// Memory or commitment being linked.
    pub source: String,
    /// Commitment the source is linked to.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LinkKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissPayload {
    pub memory: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageAction {
    Create,
    Link,
    Dismiss,
    Defer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageDecision {
    pub memory: String,
    pub action: TriageAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriagePayload {
    pub reviewed: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub decisions: Vec<TriageDecision>,
}

/// Entity a published document was produced from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishPayload {
    pub id: String,
    pub module: String,
    pub path: String,
    pub version: u32,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PublishSource>,
}

/// A payload tagged by operation type.
///
/// Serializes as the bare inner object; the operation type travels in the
/// envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpPayload {
    Capture(CapturePayload),
    Commit(CommitPayload),
    Claim(ClaimPayload),
    Release(ReleasePayload),
    Submit(SubmitPayload),
    Approve(ApprovePayload),
    Reopen(ReopenPayload),
    Close(ClosePayload),
    Annotate(AnnotatePayload),
    Link(LinkPayload),
    Dismiss(DismissPayload),
    Triage(TriagePayload),
    Publish(PublishPayload),
}

impl OpPayload {
    /// Parse a raw JSON payload as the shape required by `op`.
    pub fn from_value(op: OpType, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match op {
            OpType::Capture => OpPayload::Capture(serde_json::from_value(value)?),
            OpType::Commit => OpPayload::Commit(serde_json::from_value(value)?),
            OpType::Claim => OpPayload::Claim(serde_json::from_value(value)?),
            OpType::Release => OpPayload::Release(serde_json::from_value(value)?),
            OpType::Submit => OpPayload::Submit(serde_json::from_value(value)?),
            OpType::Approve => OpPayload::Approve(serde_json::from_value(value)?),
            OpType::Reopen => OpPayload::Reopen(serde_json::from_value(value)?),
            OpType::Close => OpPayload::Close(serde_json::from_value(value)?),
            OpType::Annotate => OpPayload::Annotate(serde_json::from_value(value)?),
            OpType::Link => OpPayload::Link(serde_json::from_value(value)?),
            OpType::Dismiss => OpPayload::Dismiss(serde_json::from_value(value)?),
            OpType::Triage => OpPayload::Triage(serde_json::from_value(value)?),
            OpType::Publish => OpPayload::Publish(serde_json::from_value(value)?),
        })
    }

    pub fn op_type(&self) -> OpType {
        match self {
            OpPayload::Capture(_) => OpType::Capture,
            OpPayload::Commit(_) => OpType::Commit,
            OpPayload::Claim(_) => OpType::Claim,
            OpPayload::Release(_) => OpType::Release,
            OpPayload::Submit(_) => OpType::Submit,
            OpPayload::Approve(_) => OpType::Approve,
            OpPayload::Reopen(_) => OpType::Reopen,
            OpPayload::Close(_) => OpType::Close,
            OpPayload::Annotate(_) => OpType::Annotate,
            OpPayload::Link(_) => OpType::Link,
            OpPayload::Dismiss(_) => OpType::Dismiss,
            OpPayload::Triage(_) => OpType::Triage,
            OpPayload::Publish(_) => OpType::Publish,
        }
    }

    /// Commitment targeted by a lifecycle operation, if any.
    pub fn lifecycle_target(&self) -> Option<&str> {
        match self {
            OpPayload::Claim(p) => Some(&p.commitment),
            OpPayload::Release(p) => Some(&p.commitment),
            OpPayload::Submit(p) => Some(&p.commitment),
            OpPayload::Approve(p) => Some(&p.commitment),
            OpPayload::Reopen(p) => Some(&p.commitment),
            OpPayload::Close(p) => Some(&p.commitment),
            _ => None,
        }
    }
}

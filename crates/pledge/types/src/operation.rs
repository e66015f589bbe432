//! The operation envelope.
//!
//! Operations are encoded as one JSON object per line with the fields
//! `id`, `op`, `ts`, `actor`, `workspace`, `payload` and an optional
//! `source_key`. Decoding validates that the payload has the shape demanded
//! by `op`, so a decoded [`Operation`] always carries a typed payload.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{generate_id, IdPrefix};
use crate::payload::OpPayload;

/// Operation kinds recognised by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    /// Record an observation (creates a memory).
    Capture,
    /// Promise work derived from a memory (creates a commitment).
    Commit,
    /// Take ownership of a commitment.
    Claim,
    /// Give up ownership.
    Release,
    /// Hand work in for review.
    Submit,
    /// Accept submitted work, closing the commitment.
    Approve,
    /// Send reviewed or closed work back for rework.
    Reopen,
    /// Close directly, with evidence or as a duplicate.
    Close,
    Annotate,
    Link,
    Dismiss,
    Triage,
    Publish,
}

impl OpType {
    pub const ALL: [OpType; 13] = [
        OpType::Capture,
        OpType::Commit,
        OpType::Claim,
        OpType::Release,
        OpType::Submit,
        OpType::Approve,
        OpType::Reopen,
        OpType::Close,
        OpType::Annotate,
        OpType::Link,
        OpType::Dismiss,
        OpType::Triage,
        OpType::Publish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OpType::Capture => "capture",
            OpType::Commit => "commit",
            OpType::Claim => "claim",
            OpType::Release => "release",
            OpType::Submit => "submit",
            OpType::Approve => "approve",
            OpType::Reopen => "reopen",
            OpType::Close => "close",
            OpType::Annotate => "annotate",
            OpType::Link => "link",
            OpType::Dismiss => "dismiss",
            OpType::Triage => "triage",
            OpType::Publish => "publish",
        }
    }

    /// Operations that finish a commitment and are subject to close constraints.
    pub fn is_close_class(self) -> bool {
        matches!(self, OpType::Close | OpType::Approve)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpType::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation type '{s}'"))
    }
}

/// One immutable ledger entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawOperation")]
pub struct Operation {
    pub id: String,
    pub ts: DateTime<Utc>,
    pub actor: String,
    pub workspace: String,
    pub payload: OpPayload,
    /// Caller-supplied idempotency token.
    pub source_key: Option<String>,
}

impl Operation {
    /// Build a new operation with a generated id and the current time.
    pub fn new(actor: impl Into<String>, workspace: impl Into<String>, payload: OpPayload) -> Self {
        let prefix = IdPrefix::for_op_type(payload.op_type());
        Self {
            id: generate_id(prefix),
            ts: Utc::now(),
            actor: actor.into(),
            workspace: workspace.into(),
            payload,
            source_key: None,
        }
    }

    pub fn with_source_key(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_ts(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }

    pub fn op_type(&self) -> OpType {
        self.payload.op_type()
    }
}

/// Wire form used for decoding: the payload stays untyped until `op` is known.
#[derive(Deserialize)]
struct RawOperation {
    id: String,
    op: OpType,
    ts: DateTime<Utc>,
    actor: String,
    #[serde(default)]
    workspace: String,
    payload: Value,
    #[serde(default)]
    source_key: Option<String>,
}

/// Error raised when a payload does not match its operation type.
#[derive(Debug)]
pub struct PayloadMismatch {
    op: OpType,
    source: serde_json::Error,
}

impl fmt::Display for PayloadMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} payload: {}", self.op, self.source)
    }
}

impl std::error::Error for PayloadMismatch {}

impl TryFrom<RawOperation> for Operation {
    type Error = PayloadMismatch;

    fn try_from(raw: RawOperation) -> Result<Self, Self::Error> {
        let payload = OpPayload::from_value(raw.op, raw.payload)
            .map_err(|source| PayloadMismatch { op: raw.op, source })?;
        Ok(Operation {
            id: raw.id,
            ts: raw.ts,
            actor: raw.actor,
            workspace: raw.workspace,
            payload,
            source_key: raw.source_key,
        })
    }
}

#[derive(Serialize)]
struct OperationWire<'a> {
    id: &'a str,
    op: OpType,
    ts: &'a DateTime<Utc>,
    actor: &'a str,
    workspace: &'a str,
    payload: &'a OpPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_key: Option<&'a str>,
}

impl Serialize for Operation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        OperationWire {
            id: &self.id,
            op: self.op_type(),
            ts: &self.ts,
            actor: &self.actor,
            workspace: &self.workspace,
            payload: &self.payload,
            source_key: self.source_key.as_deref(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ClaimPayload, CapturePayload};
    use serde_json::json;

    #[test]
    fn new_operation_uses_entity_prefix() {
        let capture = Operation::new(
            "alice",
            "ws",
            OpPayload::Capture(CapturePayload {
                body: "disk is full".into(),
                ..Default::default()
            }),
        );
        assert!(capture.id.starts_with("mem_"));
        assert_eq!(capture.op_type(), OpType::Capture);

        let claim = Operation::new(
            "alice",
            "ws",
            OpPayload::Claim(ClaimPayload {
                commitment: "cmt_00000001".into(),
            }),
        );
        assert!(claim.id.starts_with("op_"));
    }

    #[test]
    fn decodes_wire_line() {
        let line = r#"{"id":"op_0000000a","op":"claim","ts":"2025-01-01T10:00:00.000Z","actor":"alice","workspace":"ws","payload":{"commitment":"cmt_00000001"}}"#;
        let op: Operation = serde_json::from_str(line).unwrap();
        assert_eq!(op.op_type(), OpType::Claim);
        assert_eq!(op.payload.lifecycle_target(), Some("cmt_00000001"));
        assert_eq!(op.source_key, None);
    }

    #[test]
    fn encodes_envelope_field_names() {
        let op = Operation::new(
            "alice",
            "ws",
            OpPayload::Claim(ClaimPayload {
                commitment: "cmt_00000001".into(),
            }),
        )
        .with_source_key("gh-42");
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["op"], json!("claim"));
        assert_eq!(value["payload"], json!({"commitment": "cmt_00000001"}));
        assert_eq!(value["source_key"], json!("gh-42"));

        let back: Operation = serde_json::from_value(value).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn rejects_payload_of_wrong_shape() {
        let line = r#"{"id":"op_0000000a","op":"claim","ts":"2025-01-01T10:00:00Z","actor":"alice","workspace":"ws","payload":{"body":"x"}}"#;
        let err = serde_json::from_str::<Operation>(line).unwrap_err();
        assert!(err.to_string().contains("invalid claim payload"));
    }

    #[test]
    fn op_type_round_trips_through_str() {
        for op in OpType::ALL {
            assert_eq!(op.as_str().parse::<OpType>().unwrap(), op);
        }
        assert!("merge".parse::<OpType>().is_err());
        assert!(OpType::Approve.is_close_class());
        assert!(!OpType::Submit.is_close_class());
    }
}

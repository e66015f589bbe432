//! Records derived by replaying the operation log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::Meta;

/// `meta.kind` value marking an annotation as an external reference.
pub const EXTERNAL_REF_KIND: &str = "external_ref";

/// Lifecycle state of a commitment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentState {
    /// Committed but nobody owns it yet.
    #[default]
    Open,
    /// Owned by an actor and being worked on.
    Claimed,
    /// Submitted and waiting for approval.
    InReview,
    /// Sent back for rework after review or close.
    Reopened,
    /// Finished.
    Closed,
    /// Closed as a duplicate of another commitment.
    Duplicate,
}

impl CommitmentState {
    pub const ALL: [CommitmentState; 6] = [
        CommitmentState::Open,
        CommitmentState::Claimed,
        CommitmentState::InReview,
        CommitmentState::Reopened,
        CommitmentState::Closed,
        CommitmentState::Duplicate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommitmentState::Open => "open",
            CommitmentState::Claimed => "claimed",
            CommitmentState::InReview => "in_review",
            CommitmentState::Reopened => "reopened",
            CommitmentState::Closed => "closed",
            CommitmentState::Duplicate => "duplicate",
        }
    }

    /// Closed and duplicate commitments accept no further work.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommitmentState::Closed | CommitmentState::Duplicate)
    }
}

impl fmt::Display for CommitmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitmentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommitmentState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown commitment state '{s}'"))
    }
}

/// Triage state of a memory, in increasing priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryState {
    #[default]
    Untriaged,
    Dismissed,
    Linked,
    Committed,
}

impl MemoryState {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryState::Untriaged => "untriaged",
            MemoryState::Dismissed => "dismissed",
            MemoryState::Linked => "linked",
            MemoryState::Committed => "committed",
        }
    }
}

impl fmt::Display for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "untriaged" => Ok(MemoryState::Untriaged),
            "dismissed" => Ok(MemoryState::Dismissed),
            "linked" => Ok(MemoryState::Linked),
            "committed" => Ok(MemoryState::Committed),
            other => Err(format!("unknown memory state '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub actor: String,
    pub ts: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub actor: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    pub body: String,
    pub source: String,
    pub state: CommitmentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    pub actor: String,
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopened_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reopen_reason: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Commitment {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_deref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }
}

/// Pointer from a commitment to an item in another system (issue tracker,
/// pull request, ...). Stored as an annotation's metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    pub system: String,
    #[serde(rename = "type")]
    pub ref_type: String,
    pub id: String,
    pub url: String,
    pub synced_at: DateTime<Utc>,
}

impl ExternalRef {
    /// Annotation metadata carrying this reference.
    pub fn to_annotation_meta(&self) -> Meta {
        let mut meta = Meta::new();
        meta.insert("kind".into(), Value::String(EXTERNAL_REF_KIND.into()));
        meta.insert(
            "external_ref".into(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        );
        meta
    }

    /// Extract a reference from annotation metadata, if it carries one.
    pub fn from_annotation_meta(meta: &Meta) -> Option<Self> {
        if meta.get("kind").and_then(Value::as_str) != Some(EXTERNAL_REF_KIND) {
            return None;
        }
        serde_json::from_value(meta.get("external_ref")?.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_state_strings() {
        assert_eq!(CommitmentState::InReview.to_string(), "in_review");
        assert_eq!("reopened".parse::<CommitmentState>(), Ok(CommitmentState::Reopened));
        assert!(CommitmentState::Duplicate.is_terminal());
        assert!(!CommitmentState::Reopened.is_terminal());
        assert_eq!(CommitmentState::default(), CommitmentState::Open);
    }

    #[test]
    fn memory_state_priority_order() {
        assert!(MemoryState::Committed > MemoryState::Linked);
        assert!(MemoryState::Linked > MemoryState::Dismissed);
        assert!(MemoryState::Dismissed > MemoryState::Untriaged);
    }

    #[test]
    fn external_ref_meta_round_trip() {
        let external = ExternalRef {
            system: "github".into(),
            ref_type: "issue".into(),
            id: "42".into(),
            url: "https://github.com/acme/app/issues/42".into(),
            synced_at: Utc::now(),
        };
        let meta = external.to_annotation_meta();
        assert_eq!(meta["kind"], "external_ref");
        assert_eq!(meta["external_ref"]["type"], "issue");
        assert_eq!(ExternalRef::from_annotation_meta(&meta), Some(external));

        let mut other = Meta::new();
        other.insert("kind".into(), Value::String("note".into()));
        assert_eq!(ExternalRef::from_annotation_meta(&other), None);
    }
}

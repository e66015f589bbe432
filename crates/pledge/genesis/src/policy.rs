//! Genesis Key document model and permission lookup.

use std::path::Path;

use indexmap::IndexMap;
use pledge_types::{Commitment, OpPayload, OpType, Operation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenesisError;
use crate::pattern::ActorPattern;

/// File name of the Genesis Key inside the workspace directory.
pub const GENESIS_FILE: &str = "genesis.key";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<GenesisMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisMeta {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub created: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub owner: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    /// Grants keyed by actor pattern, in definition order.
    #[serde(default)]
    pub actors: IndexMap<ActorPattern, OperationGrant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultPermissions>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationGrant {
    #[serde(default)]
    pub operations: Vec<OpType>,
}

impl OperationGrant {
    pub fn allows(&self, op: OpType) -> bool {
        self.operations.contains(&op)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultPermissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<OperationGrant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<OperationGrant>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub require_claim: Vec<ClaimConstraint>,
    #[serde(default)]
    pub require_human: Vec<HumanConstraint>,
    #[serde(default)]
    pub require_validation: Vec<ValidationConstraint>,
}

/// Closing actor must own the commitment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimConstraint {
    #[serde(rename = "match")]
    pub rule: MatchRule,
}

/// `operation` on matching commitments may not be performed by an agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HumanConstraint {
    pub operation: OpType,
    #[serde(rename = "match")]
    pub rule: MatchRule,
}

/// Matching commitments need a passing validation capture before closing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationConstraint {
    #[serde(rename = "match")]
    pub rule: MatchRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator: Option<ActorPattern>,
}

/// Which commitments a constraint applies to.
///
/// `"all"` matches everything. An object matches when every field present
/// matches; an object with no fields matches nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchRule {
    Keyword(MatchKeyword),
    Criteria(MatchCriteria),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKeyword {
    All,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_kind: Option<String>,
}

impl MatchRule {
    pub fn all() -> Self {
        MatchRule::Keyword(MatchKeyword::All)
    }

    pub fn matches(&self, commitment: &Commitment, ops: &[Operation]) -> bool {
        let criteria = match self {
            MatchRule::Keyword(MatchKeyword::All) => return true,
            MatchRule::Criteria(criteria) => criteria,
        };
        if criteria.tags.is_none() && criteria.actor.is_none() && criteria.source_kind.is_none() {
            return false;
        }
        if let Some(tags) = &criteria.tags {
            if !tags.iter().all(|tag| commitment.has_tag(tag)) {
                return false;
            }
        }
        if let Some(actor) = &criteria.actor {
            if !actor.matches(&commitment.actor) {
                return false;
            }
        }
        if let Some(kind) = &criteria.source_kind {
            if source_kind(ops, &commitment.source) != Some(kind.as_str()) {
                return false;
            }
        }
        true
    }
}

fn source_kind<'a>(ops: &'a [Operation], memory_id: &str) -> Option<&'a str> {
    ops.iter().find_map(|op| match &op.payload {
        OpPayload::Capture(p) if op.id == memory_id => p.kind.as_deref(),
        _ => None,
    })
}

impl GenesisKey {
    /// Load the key at `path`. A missing file yields `None`; a file that
    /// exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, GenesisError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(GenesisError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let key = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), "loaded genesis key");
        Ok(Some(key))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, GenesisError> {
        // An empty document is a key with no sections.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, GenesisError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Whether `actor` may append an operation of type `op`.
    ///
    /// The most specific matching actor grant decides. Without one, the
    /// authenticated default applies; without a permissions section at all,
    /// everything is allowed.
    pub fn has_permission(&self, actor: &str, op: OpType) -> bool {
        let Some(permissions) = &self.permissions else {
            return true;
        };
        if let Some((_, grant)) = ActorPattern::best_match(&permissions.actors, actor) {
            return grant.allows(op);
        }
        permissions
            .defaults
            .as_ref()
            .and_then(|d| d.authenticated.as_ref())
            .is_some_and(|grant| grant.allows(op))
    }
}

//! Entity identifiers.
//!
//! Every id is an entity prefix followed by `_` and eight lowercase hex
//! characters, e.g. `mem_1a2b3c4d`. Captures produce memories (`mem_`),
//! commits produce commitments (`cmt_`) and every other operation gets `op_`.

use std::fmt;

use uuid::Uuid;

use crate::operation::OpType;

/// Number of hex characters after the prefix.
const ID_SUFFIX_LEN: usize = 8;

/// Entity kind encoded in an id prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdPrefix {
    Memory,
    Commitment,
    Operation,
}

impl IdPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            IdPrefix::Memory => "mem",
            IdPrefix::Commitment => "cmt",
            IdPrefix::Operation => "op",
        }
    }

    /// Prefix used for the id of a newly generated operation of this type.
    pub fn for_op_type(op: OpType) -> Self {
        match op {
            OpType::Capture => IdPrefix::Memory,
            OpType::Commit => IdPrefix::Commitment,
            _ => IdPrefix::Operation,
        }
    }

    fn parse(prefix: &str) -> Option<Self> {
        match prefix {
            "mem" => Some(IdPrefix::Memory),
            "cmt" => Some(IdPrefix::Commitment),
            "op" => Some(IdPrefix::Operation),
            _ => None,
        }
    }
}

impl fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a fresh id with the given prefix.
pub fn generate_id(prefix: IdPrefix) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix.as_str(), &hex[..ID_SUFFIX_LEN])
}

/// Split a well-formed id into its prefix. Returns `None` for malformed ids.
pub fn id_prefix(id: &str) -> Option<IdPrefix> {
    let (prefix, suffix) = id.split_once('_')?;
    let kind = IdPrefix::parse(prefix)?;
    let well_formed = suffix.len() == ID_SUFFIX_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    well_formed.then_some(kind)
}

pub fn is_valid_id(id: &str) -> bool {
    id_prefix(id).is_some()
}

pub fn is_memory_id(id: &str) -> bool {
    id_prefix(id) == Some(IdPrefix::Memory)
}

pub fn is_commitment_id(id: &str) -> bool {
    id_prefix(id) == Some(IdPrefix::Commitment)
}

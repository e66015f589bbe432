//! Core types for the Pledge commitment ledger.
//!
//! The ledger persists exactly one entity, the [`Operation`]. Everything else
//! in this crate (memories, commitments, annotations, external references) is
//! a *derived* record produced by replaying operations in log order.
//!
//! - [`ids`]: entity-prefixed identifiers (`mem_`, `cmt_`, `op_`)
//! - [`operation`]: the envelope and its wire encoding
//! - [`payload`]: one typed payload per operation kind
//! - [`records`]: derived views and their lifecycle states
//! - [`error`]: the shared error taxonomy and pre-append validation errors

#![deny(unsafe_code)]

pub mod actor;
pub mod error;
pub mod ids;
pub mod operation;
pub mod payload;
pub mod records;

pub use actor::is_agent;
pub use error::{ConstraintKind, ErrorKind, ValidationError};
pub use ids::{generate_id, is_valid_id, IdPrefix};
pub use operation::{OpType, Operation};
pub use payload::*;
pub use records::{
    Annotation, Commitment, CommitmentState, ExternalRef, Memory, MemoryState,
    EXTERNAL_REF_KIND,
};

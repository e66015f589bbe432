//! Genesis Key: the authorization and constraint policy of a workspace.
//!
//! A Genesis Key decides which actor may append which operation type, and
//! which extra conditions a commitment must satisfy before it can be closed
//! or approved. [`validate_operation`] combines the policy with the structural,
//! referential and lifecycle checks every operation must pass before append.
//!
//! Without a Genesis Key every actor may perform every operation.

#![deny(unsafe_code)]

pub mod constraints;
pub mod error;
pub mod pattern;
pub mod policy;
pub mod validate;

pub use constraints::{check_constraints, ConstraintViolation};
pub use error::GenesisError;
pub use pattern::ActorPattern;
pub use policy::{
    ClaimConstraint, Constraints, DefaultPermissions, GenesisKey, GenesisMeta, HumanConstraint,
    Identity, MatchCriteria, MatchRule, OperationGrant, Permissions, ValidationConstraint,
    GENESIS_FILE,
};
pub use validate::validate_operation;

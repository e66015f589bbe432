//! Error taxonomy shared by every Pledge crate.
//!
//! Each crate has its own `thiserror` enum; all of them expose a stable
//! machine-readable `code()` and a coarse [`ErrorKind`]. [`ValidationError`]
//! lives here because both the policy engine and the append path raise it.

use std::fmt;

use thiserror::Error;

use crate::operation::OpType;

/// Coarse error classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Ownership,
    PermissionDenied,
    ConstraintViolated,
    Duplicate,
    Locked,
    MalformedInput,
    Storage,
    Sync,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::InvalidState => "invalid-state",
            ErrorKind::Ownership => "ownership",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::ConstraintViolated => "constraint-violated",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::Locked => "locked",
            ErrorKind::MalformedInput => "malformed-input",
            ErrorKind::Storage => "storage",
            ErrorKind::Sync => "sync",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint families declared in a Genesis Key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    RequireClaim,
    RequireHuman,
    RequireValidation,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintKind::RequireClaim => "require_claim",
            ConstraintKind::RequireHuman => "require_human",
            ConstraintKind::RequireValidation => "require_validation",
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons an operation is refused before it reaches the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("{field} must not be empty")]
    EmptyBody { field: &'static str },

    #[error("invalid operation: {0}")]
    InvalidOp(String),

    #[error("{what} {id} does not exist")]
    RefNotFound { what: &'static str, id: String },

    #[error("commitment {commitment} is already closed")]
    AlreadyClosed { commitment: String },

    #[error("commitment {commitment} is already claimed by {owner}")]
    AlreadyClaimed { commitment: String, owner: String },

    #[error("{actor} is not the owner of commitment {commitment}")]
    NotOwner { commitment: String, actor: String },

    #[error("{message}")]
    InvalidState { record: String, message: String },

    #[error("operation id {id} already exists")]
    DuplicateId { id: String },

    #[error("source key {key} has already been used")]
    DuplicateSourceKey { key: String },

    #[error("actor {actor} is not permitted to {op}")]
    PermissionDenied { actor: String, op: OpType },

    #[error("{message}")]
    ConstraintViolated {
        constraint: ConstraintKind,
        message: String,
    },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "E_MISSING_FIELD",
            ValidationError::EmptyBody { .. } => "E_EMPTY_BODY",
            ValidationError::InvalidOp(_) => "E_INVALID_OP",
            ValidationError::RefNotFound { .. } => "E_REF_NOT_FOUND",
            ValidationError::AlreadyClosed { .. } => "E_ALREADY_CLOSED",
            ValidationError::AlreadyClaimed { .. } => "E_ALREADY_CLAIMED",
            ValidationError::NotOwner { .. } => "E_NOT_OWNER",
            ValidationError::InvalidState { .. } => "E_INVALID_STATE",
            ValidationError::DuplicateId { .. } => "E_DUPLICATE_ID",
            ValidationError::DuplicateSourceKey { .. } => "E_DUPLICATE_SOURCE_KEY",
            ValidationError::PermissionDenied { .. } => "E_PERMISSION_DENIED",
            ValidationError::ConstraintViolated {
                constraint: ConstraintKind::RequireClaim,
                ..
            } => "E_NOT_OWNER",
            ValidationError::ConstraintViolated { .. } => "E_CONSTRAINT_VIOLATED",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::MissingField { .. }
            | ValidationError::EmptyBody { .. }
            | ValidationError::InvalidOp(_) => ErrorKind::MalformedInput,
            ValidationError::RefNotFound { .. } => ErrorKind::NotFound,
            ValidationError::AlreadyClosed { .. }
            | ValidationError::AlreadyClaimed { .. }
            | ValidationError::InvalidState { .. } => ErrorKind::InvalidState,
            ValidationError::NotOwner { .. } => ErrorKind::Ownership,
            ValidationError::DuplicateId { .. } | ValidationError::DuplicateSourceKey { .. } => {
                ErrorKind::Duplicate
            }
            ValidationError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            ValidationError::ConstraintViolated {
                constraint: ConstraintKind::RequireClaim,
                ..
            } => ErrorKind::Ownership,
            ValidationError::ConstraintViolated { .. } => ErrorKind::ConstraintViolated,
        }
    }

    /// Name of the violated constraint, for constraint failures.
    pub fn constraint(&self) -> Option<ConstraintKind> {
        match self {
            ValidationError::ConstraintViolated { constraint, .. } => Some(*constraint),
            _ => None,
        }
    }
}

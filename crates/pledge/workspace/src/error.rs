use std::path::PathBuf;

use pledge_genesis::GenesisError;
use pledge_log::LogError;
use pledge_types::{ErrorKind, ValidationError};
use thiserror::Error;

/// Errors from workspace operations.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("no .pledge/ workspace found in {} or any parent; run `pledge init` first", start.display())]
    NoWorkspace { start: PathBuf },

    #[error("workspace already exists at {}", path.display())]
    WorkspaceExists { path: PathBuf },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Genesis(#[from] GenesisError),

    #[error("invalid workspace config: {0}")]
    Config(String),

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("commitment {commitment} already has a {system} reference")]
    ExternalRefExists { commitment: String, system: String },

    #[error("commitment {commitment} has no {system} reference")]
    ExternalRefNotFound { commitment: String, system: String },
}

impl WorkspaceError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkspaceError::NoWorkspace { .. } => "E_NO_WORKSPACE",
            WorkspaceError::WorkspaceExists { .. } => "E_WORKSPACE_EXISTS",
            WorkspaceError::Validation(e) => e.code(),
            WorkspaceError::Log(e) => e.code(),
            WorkspaceError::Genesis(e) => e.code(),
            WorkspaceError::Config(_) => "E_INVALID_CONFIG",
            WorkspaceError::Io(_) => "E_IO",
            WorkspaceError::ExternalRefExists { .. } => "E_EXTERNAL_REF_EXISTS",
            WorkspaceError::ExternalRefNotFound { .. } => "E_EXTERNAL_REF_NOT_FOUND",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkspaceError::NoWorkspace { .. } | WorkspaceError::ExternalRefNotFound { .. } => {
                ErrorKind::NotFound
            }
            WorkspaceError::WorkspaceExists { .. } | WorkspaceError::ExternalRefExists { .. } => {
                ErrorKind::Duplicate
            }
            WorkspaceError::Validation(e) => e.kind(),
            WorkspaceError::Log(e) => e.kind(),
            WorkspaceError::Genesis(e) => e.kind(),
            WorkspaceError::Config(_) => ErrorKind::MalformedInput,
            WorkspaceError::Io(_) => ErrorKind::Storage,
        }
    }
}

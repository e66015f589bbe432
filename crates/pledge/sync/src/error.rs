use std::time::Duration;

use pledge_types::ErrorKind;
use pledge_workspace::WorkspaceError;
use thiserror::Error;

/// Errors from sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote answered with an error status or an `{error}` body
    #[error("remote sync error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        status: Option<u16>,
        message: String,
    },

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("sync state I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sync state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cloud sync is not configured for this workspace")]
    NotConfigured,

    #[error("a sync is already in progress")]
    InProgress,
}

impl SyncError {
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::Remote { .. } => "E_SYNC_REMOTE",
            SyncError::Timeout(_) => "E_SYNC_TIMEOUT",
            SyncError::Http(e) if e.is_timeout() => "E_SYNC_TIMEOUT",
            SyncError::Http(_) => "E_SYNC_REMOTE",
            SyncError::Workspace(e) => e.code(),
            SyncError::Io(_) | SyncError::Serialization(_) => "E_IO",
            SyncError::NotConfigured => "E_SYNC_NOT_CONFIGURED",
            SyncError::InProgress => "E_SYNC_IN_PROGRESS",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Workspace(e) => e.kind(),
            SyncError::Io(_) | SyncError::Serialization(_) => ErrorKind::Storage,
            _ => ErrorKind::Sync,
        }
    }
}

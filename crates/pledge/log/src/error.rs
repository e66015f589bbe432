use pledge_types::ErrorKind;
use thiserror::Error;

/// Errors from the operation log and workspace lock.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger corrupted at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("workspace is locked by process {pid}")]
    Locked { pid: u32 },
}

impl LogError {
    pub fn code(&self) -> &'static str {
        match self {
            LogError::Io(_) | LogError::Serialization(_) => "E_IO",
            LogError::Corrupt { .. } => "E_CORRUPT_LOG",
            LogError::Locked { .. } => "E_WORKSPACE_LOCKED",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LogError::Locked { .. } => ErrorKind::Locked,
            _ => ErrorKind::Storage,
        }
    }
}

impl From<serde_json::Error> for LogError {
    fn from(e: serde_json::Error) -> Self {
        LogError::Serialization(e.to_string())
    }
}

use std::path::PathBuf;

use pledge_types::ErrorKind;
use thiserror::Error;

/// Errors loading a Genesis Key.
#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("failed to read genesis key {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid genesis key: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl GenesisError {
    pub fn code(&self) -> &'static str {
        match self {
            GenesisError::Io { .. } => "E_IO",
            GenesisError::Parse(_) => "E_INVALID_POLICY",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenesisError::Io { .. } => ErrorKind::Storage,
            GenesisError::Parse(_) => ErrorKind::MalformedInput,
        }
    }
}

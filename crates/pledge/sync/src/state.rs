//! Per-device sync state (`.pledge/sync-state.json`).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use pledge_types::Operation;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SyncError;

pub const SYNC_STATE_FILE: &str = "sync-state.json";

const CLIENT_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const CLIENT_SUFFIX_LEN: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
    Syncing,
    Synced,
    Offline,
    Error,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Offline => "offline",
            SyncStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub workspace_id: String,
    pub client_id: String,
    #[serde(default)]
    pub last_synced_cursor: Option<String>,
    /// Local-log position up to which every operation is known to the remote
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pushed_cursor: Option<String>,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pending_operations: usize,
    #[serde(default)]
    pub status: SyncStatus,
}

impl SyncState {
    /// Fresh state with a newly generated client id.
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            client_id: generate_client_id(),
            last_synced_cursor: None,
            last_pushed_cursor: None,
            last_sync_at: None,
            pending_operations: 0,
            status: SyncStatus::Pending,
        }
    }

    /// Remote-order cursor sent with every request.
    pub fn cursor(&self) -> Option<&str> {
        self.last_synced_cursor.as_deref()
    }

    /// Local-log position that pushes start after.
    pub fn push_cursor(&self) -> Option<&str> {
        self.last_pushed_cursor
            .as_deref()
            .or(self.last_synced_cursor.as_deref())
    }
}

/// `<sanitized hostname>-<8 random base36 chars>`.
pub fn generate_client_id() -> String {
    let host = hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "device".to_string());
    let host: String = host
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' { c } else { '-' })
        .collect();

    let mut rng = rand::thread_rng();
    let suffix: String = (0..CLIENT_SUFFIX_LEN)
        .map(|_| CLIENT_SUFFIX_ALPHABET[rng.gen_range(0..CLIENT_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{host}-{suffix}")
}

/// Operations after `cursor` in log order. All of them when the cursor is
/// unset or no longer present in the log.
pub fn unsynced_operations<'a>(ops: &'a [Operation], cursor: Option<&str>) -> &'a [Operation] {
    let position = cursor.and_then(|cursor| ops.iter().position(|op| op.id == cursor));
    match position {
        Some(index) => &ops[index + 1..],
        None => ops,
    }
}

pub fn pending_count(ops: &[Operation], cursor: Option<&str>) -> usize {
    unsynced_operations(ops, cursor).len()
}

/// Load and save [`SyncState`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(SYNC_STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored state, or a fresh one when the file is missing or unreadable
    /// as JSON.
    pub fn load(&self) -> Result<SyncState, SyncError> {
        Ok(self.read()?.unwrap_or_else(|| SyncState::new("")))
    }

    /// Like [`load`](Self::load), but persists a fresh state so the client id
    /// stays stable across runs.
    pub fn load_or_init(&self, workspace_id: &str) -> Result<SyncState, SyncError> {
        if let Some(state) = self.read()? {
            return Ok(state);
        }
        let state = SyncState::new(workspace_id);
        self.save(&state)?;
        Ok(state)
    }

    fn read(&self) -> Result<Option<SyncState>, SyncError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "sync state unreadable, starting fresh");
                Ok(None)
            }
        }
    }

    /// Write through a temporary file and rename over the target.
    pub fn save(&self, state: &SyncState) -> Result<(), SyncError> {
        let content = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Forget the stored state.
    pub fn clear(&self) -> Result<(), SyncError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

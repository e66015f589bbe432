//! Workspace configuration (`.pledge/config.yaml`).

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WorkspaceError;

/// Directory marking a workspace root.
pub const WORKSPACE_DIR: &str = ".pledge";

pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace name, stamped on every operation.
    pub workspace: String,

    pub created: DateTime<Utc>,

    /// Actor used when none is given explicitly or via `PLEDGE_ACTOR`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_actor: Option<String>,

    /// Remote ledger settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<CloudConfig>,
}

impl WorkspaceConfig {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            created: Utc::now(),
            default_actor: None,
            cloud: None,
        }
    }

    /// Load from `path`; `None` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, WorkspaceError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| WorkspaceError::Config(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), WorkspaceError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| WorkspaceError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Cloud settings, if present and enabled.
    pub fn active_cloud(&self) -> Option<&CloudConfig> {
        self.cloud.as_ref().filter(|c| c.enabled)
    }
}

/// Remote ledger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the sync service
    pub endpoint: String,

    /// Workspace identifier on the remote
    pub workspace_id: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Page size for pulls
    #[serde(default = "default_pull_limit")]
    pub pull_limit: u32,

    /// Interval between periodic syncs in watch mode
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,
}

impl CloudConfig {
    pub fn new(endpoint: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            enabled: true,
            endpoint: endpoint.into(),
            workspace_id: workspace_id.into(),
            timeout_secs: default_timeout_secs(),
            pull_limit: default_pull_limit(),
            watch_interval_secs: default_watch_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_pull_limit() -> u32 {
    100
}

fn default_watch_interval_secs() -> u64 {
    30
}

//! Push, pull and full sync against a [`RemoteLedger`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pledge_types::Operation;
use pledge_workspace::Workspace;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::remote::RemoteLedger;
use crate::state::{pending_count, unsynced_operations, SyncState, SyncStateStore, SyncStatus};

pub const DRY_RUN_WARNING: &str = "DRY RUN: No operations were actually pushed";

/// Connection parameters for a [`SyncEngine`].
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub workspace_id: String,
    /// Bound on every remote call
    pub timeout: Duration,
    /// Page size for pulls
    pub pull_limit: u32,
}

impl SyncSettings {
    pub fn new(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            timeout: Duration::from_secs(30),
            pull_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub push_only: bool,
    pub pull_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushResult {
    pub pushed: usize,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub warnings: Vec<String>,
    pub new_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PullResult {
    /// Operations received from the remote
    pub pulled: usize,
    /// Operations actually appended locally
    pub merged: usize,
    pub operations: Vec<Operation>,
    pub new_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull: Option<PullResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatusReport {
    pub status: SyncStatus,
    pub pending_operations: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub workspace_id: String,
    pub client_id: String,
}

/// Reconciles one workspace with one remote.
pub struct SyncEngine {
    workspace: Workspace,
    remote: Arc<dyn RemoteLedger>,
    store: SyncStateStore,
    settings: SyncSettings,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    pub fn new(workspace: Workspace, remote: Arc<dyn RemoteLedger>, settings: SyncSettings) -> Self {
        let store = SyncStateStore::in_dir(workspace.dir());
        Self {
            workspace,
            remote,
            store,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Settings from the workspace's enabled cloud configuration.
    pub fn settings_from(workspace: &Workspace) -> Result<SyncSettings, SyncError> {
        let cloud = workspace
            .config()
            .active_cloud()
            .ok_or(SyncError::NotConfigured)?;
        Ok(SyncSettings {
            workspace_id: cloud.workspace_id.clone(),
            timeout: Duration::from_secs(cloud.timeout_secs),
            pull_limit: cloud.pull_limit,
        })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn state_store(&self) -> &SyncStateStore {
        &self.store
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn load_state(&self) -> Result<SyncState, SyncError> {
        self.store.load_or_init(&self.settings.workspace_id)
    }

    fn begin(&self) -> Result<InFlight<'_>, SyncError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SyncError::InProgress)?;
        Ok(InFlight(&self.in_flight))
    }

    async fn call<T>(&self, request: impl Future<Output = Result<T, SyncError>>) -> Result<T, SyncError> {
        tokio::time::timeout(self.settings.timeout, request)
            .await
            .map_err(|_| SyncError::Timeout(self.settings.timeout))?
    }

    /// Send local operations the remote has not acknowledged.
    pub async fn push(&self, dry_run: bool) -> Result<PushResult, SyncError> {
        let _guard = self.begin()?;
        let mut state = self.load_state()?;
        let result = self.push_with(&mut state, dry_run).await?;
        if !dry_run && result.pushed > 0 {
            self.finish(&mut state)?;
        }
        Ok(result)
    }

    /// Fetch and merge remote operations after the cursor.
    pub async fn pull(&self, dry_run: bool) -> Result<PullResult, SyncError> {
        let _guard = self.begin()?;
        let mut state = self.load_state()?;
        let result = self.pull_with(&mut state, dry_run).await?;
        if !dry_run && result.pulled > 0 {
            self.finish(&mut state)?;
        }
        Ok(result)
    }

    /// Push then pull. The state file records `syncing` while running and
    /// `synced` or `error` afterwards; a dry run records nothing.
    pub async fn full_sync(&self, options: SyncOptions) -> Result<SyncReport, SyncError> {
        let _guard = self.begin()?;
        let mut state = self.load_state()?;

        if options.dry_run {
            return self.exchange(&mut state, options).await;
        }

        state.status = SyncStatus::Syncing;
        self.store.save(&state)?;

        match self.exchange(&mut state, options).await {
            Ok(report) => {
                self.finish(&mut state)?;
                info!(
                    pushed = report.push.as_ref().map_or(0, |p| p.pushed),
                    pulled = report.pull.as_ref().map_or(0, |p| p.pulled),
                    pending = state.pending_operations,
                    "sync complete"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "sync failed");
                // Keep whatever cursor was last persisted.
                let mut failed = self.load_state()?;
                failed.status = SyncStatus::Error;
                self.store.save(&failed)?;
                Err(e)
            }
        }
    }

    async fn exchange(&self, state: &mut SyncState, options: SyncOptions) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        if !options.pull_only {
            let push = self.push_with(state, options.dry_run).await?;
            if !options.dry_run && push.pushed > 0 {
                self.store.save(state)?;
            }
            report.push = Some(push);
        }
        if !options.push_only {
            let pull = self.pull_with(state, options.dry_run).await?;
            report.pull = Some(pull);
        }
        Ok(report)
    }

    async fn push_with(&self, state: &mut SyncState, dry_run: bool) -> Result<PushResult, SyncError> {
        let ops = self.workspace.read()?;
        let unsynced = unsynced_operations(&ops, state.push_cursor());

        if unsynced.is_empty() {
            return Ok(PushResult {
                new_cursor: state.last_synced_cursor.clone(),
                ..Default::default()
            });
        }

        if dry_run {
            return Ok(PushResult {
                pushed: unsynced.len(),
                accepted: unsynced.iter().map(|op| op.id.clone()).collect(),
                warnings: vec![DRY_RUN_WARNING.to_string()],
                new_cursor: unsynced.last().map(|op| op.id.clone()),
                ..Default::default()
            });
        }

        debug!(count = unsynced.len(), cursor = ?state.cursor(), "pushing operations");
        let response = self
            .call(
                self.remote
                    .push_operations(unsynced, state.cursor(), &state.client_id),
            )
            .await?;

        if !response.new_cursor.is_empty() {
            state.last_synced_cursor = Some(response.new_cursor.clone());
        }
        state.last_pushed_cursor = unsynced.last().map(|op| op.id.clone());
        for warning in &response.warnings {
            debug!(%warning, "remote push warning");
        }
        Ok(PushResult {
            pushed: response.accepted.len(),
            accepted: response.accepted,
            rejected: response.rejected,
            warnings: response.warnings,
            new_cursor: state.last_synced_cursor.clone(),
        })
    }

    async fn pull_with(&self, state: &mut SyncState, dry_run: bool) -> Result<PullResult, SyncError> {
        let mut result = PullResult {
            new_cursor: state.last_synced_cursor.clone(),
            ..Default::default()
        };

        loop {
            let cursor = result.new_cursor.clone();
            let page = self
                .call(self.remote.pull_operations(
                    cursor.as_deref(),
                    &state.client_id,
                    self.settings.pull_limit,
                ))
                .await?;

            if dry_run {
                result.pulled = page.operations.len();
                result.operations = page.operations;
                result.has_more = page.has_more;
                if !page.new_cursor.is_empty() {
                    result.new_cursor = Some(page.new_cursor);
                }
                return Ok(result);
            }

            let merged = self.workspace.merge(page.operations.clone())?;
            debug!(received = page.operations.len(), merged = merged.appended.len(), "pulled page");
            // Nothing unpushed sat before the merged ops, so they need no push.
            if !merged.appended.is_empty() && merged.previous_last.as_deref() == state.push_cursor() {
                state.last_pushed_cursor = merged.appended.last().map(|op| op.id.clone());
            }
            result.pulled += page.operations.len();
            result.merged += merged.appended.len();
            result.operations.extend(page.operations);
            result.has_more = page.has_more;

            let advanced = !page.new_cursor.is_empty() && Some(&page.new_cursor) != cursor.as_ref();
            if advanced {
                result.new_cursor = Some(page.new_cursor);
            }
            if !page.has_more {
                break;
            }
            if !advanced {
                warn!("remote reported more operations without advancing the cursor");
                break;
            }
        }

        state.last_synced_cursor = result.new_cursor.clone();
        Ok(result)
    }

    /// Persist a successful exchange.
    fn finish(&self, state: &mut SyncState) -> Result<(), SyncError> {
        let ops = self.workspace.read()?;
        state.status = SyncStatus::Synced;
        state.last_sync_at = Some(Utc::now());
        state.pending_operations = pending_count(&ops, state.push_cursor());
        self.store.save(state)
    }

    /// Current sync state with a freshly counted backlog.
    pub fn status(&self) -> Result<SyncStatusReport, SyncError> {
        let state = self.load_state()?;
        let ops = self.workspace.read()?;
        Ok(SyncStatusReport {
            status: state.status,
            pending_operations: pending_count(&ops, state.push_cursor()),
            last_sync_at: state.last_sync_at,
            workspace_id: state.workspace_id,
            client_id: state.client_id,
        })
    }
}

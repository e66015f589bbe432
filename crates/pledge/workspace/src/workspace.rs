//! The workspace handle and its append path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use pledge_genesis::{validate_operation, GenesisKey, GENESIS_FILE};
use pledge_log::{OperationLog, WorkspaceLock};
use pledge_state::LedgerState;
use pledge_types::{
    AnnotatePayload, ApprovePayload, CapturePayload, ClaimPayload, ClosePayload, CommitPayload,
    DismissPayload, LinkPayload, OpPayload, Operation, ReleasePayload, ReopenPayload,
    SubmitPayload,
};
use tracing::{debug, info};

use crate::actor::resolve_actor;
use crate::config::{WorkspaceConfig, CONFIG_FILE, WORKSPACE_DIR};
use crate::error::WorkspaceError;

type Result<T> = std::result::Result<T, WorkspaceError>;

const GITIGNORE_ENTRY: &str = ".pledge/";

/// Outcome of [`Workspace::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// Operations written, in order
    pub appended: Vec<Operation>,
    /// Id of the last operation in the log before the merge, read under the
    /// same lock
    pub previous_last: Option<String>,
}

/// Options for [`Workspace::init`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Workspace name; defaults to the root directory's name.
    pub name: Option<String>,
    pub default_actor: Option<String>,
    /// Replace an existing `.pledge/` directory, discarding its ledger.
    pub force: bool,
}

/// An opened workspace.
///
/// Holds no file handles: every read re-reads the log and every append
/// takes the lock for its own duration.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    dir: PathBuf,
    config: WorkspaceConfig,
    log: OperationLog,
    lock: WorkspaceLock,
}

impl Workspace {
    /// Create `.pledge/` under `root` with an empty ledger and a config file.
    pub fn init(root: &Path, options: InitOptions) -> Result<Self> {
        let dir = root.join(WORKSPACE_DIR);
        if dir.exists() {
            if !options.force {
                return Err(WorkspaceError::WorkspaceExists { path: dir });
            }
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;

        let name = options.name.unwrap_or_else(|| dir_name(root));
        let mut config = WorkspaceConfig::new(name);
        config.default_actor = options.default_actor;
        config.save(&dir.join(CONFIG_FILE))?;

        let log = OperationLog::in_dir(&dir);
        std::fs::write(log.path(), "")?;

        info!(workspace = %config.workspace, path = %dir.display(), "initialized workspace");
        Ok(Self::from_parts(root.to_path_buf(), dir, config))
    }

    /// Open the workspace rooted exactly at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let dir = root.join(WORKSPACE_DIR);
        if !dir.is_dir() {
            return Err(WorkspaceError::NoWorkspace {
                start: root.to_path_buf(),
            });
        }
        let config = WorkspaceConfig::load(&dir.join(CONFIG_FILE))?
            .unwrap_or_else(|| WorkspaceConfig::new(dir_name(root)));
        Ok(Self::from_parts(root.to_path_buf(), dir, config))
    }

    /// Open the nearest workspace at or above `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        match find_root(start) {
            Some(root) => Self::open(&root),
            None => Err(WorkspaceError::NoWorkspace {
                start: start.to_path_buf(),
            }),
        }
    }

    fn from_parts(root: PathBuf, dir: PathBuf, config: WorkspaceConfig) -> Self {
        Self {
            log: OperationLog::in_dir(&dir),
            lock: WorkspaceLock::in_dir(&dir),
            root,
            dir,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.pledge/` directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        &self.config.workspace
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn log(&self) -> &OperationLog {
        &self.log
    }

    pub fn lock(&self) -> &WorkspaceLock {
        &self.lock
    }

    /// Replace and persist the configuration.
    pub fn save_config(&mut self, config: WorkspaceConfig) -> Result<()> {
        config.save(&self.dir.join(CONFIG_FILE))?;
        self.config = config;
        Ok(())
    }

    pub fn genesis_path(&self) -> PathBuf {
        self.dir.join(GENESIS_FILE)
    }

    /// The Genesis Key, if one is installed.
    pub fn genesis(&self) -> Result<Option<GenesisKey>> {
        Ok(GenesisKey::load(&self.genesis_path())?)
    }

    /// Every operation in the log, in order.
    pub fn read(&self) -> Result<Vec<Operation>> {
        Ok(self.log.read()?)
    }

    /// Derived state of every memory and commitment.
    pub fn state(&self) -> Result<LedgerState> {
        Ok(pledge_state::derive(&self.read()?))
    }

    /// Acting identity for this workspace given an optional explicit value.
    pub fn resolve_actor(&self, explicit: Option<&str>) -> String {
        resolve_actor(explicit, Some(&self.config))
    }

    /// A fresh operation stamped with this workspace's name.
    pub fn operation(&self, actor: &str, payload: OpPayload) -> Operation {
        Operation::new(actor, self.config.workspace.clone(), payload)
    }

    /// Validate `op` against the current log and Genesis Key, then append it.
    /// Runs entirely under the workspace lock.
    pub fn append(&self, op: Operation) -> Result<Operation> {
        self.lock.with_lock(|| {
            let ops = self.log.read()?;
            self.validate_and_append(op, &ops)
        })
    }

    /// Caller must hold the lock; `ops` is the log as read under it.
    pub(crate) fn validate_and_append(&self, op: Operation, ops: &[Operation]) -> Result<Operation> {
        let genesis = self.genesis()?;
        validate_operation(&op, ops, genesis.as_ref())?;
        self.log.append(&op)?;
        debug!(id = %op.id, op = %op.op_type(), actor = %op.actor, "recorded operation");
        Ok(op)
    }

    /// Build and append an operation.
    pub fn record(
        &self,
        actor: &str,
        payload: OpPayload,
        source_key: Option<&str>,
    ) -> Result<Operation> {
        let mut op = self.operation(actor, payload);
        if let Some(key) = source_key {
            op = op.with_source_key(key);
        }
        self.append(op)
    }

    /// Append operations received from a remote, skipping ids already present
    /// locally or earlier in the batch.
    ///
    /// Remote operations were validated by the writer that produced them and
    /// are not re-validated here.
    pub fn merge(&self, incoming: Vec<Operation>) -> Result<Merged> {
        self.lock.with_lock(|| {
            let existing = self.log.read()?;
            let previous_last = existing.last().map(|op| op.id.clone());
            let mut seen: HashSet<String> = existing.into_iter().map(|op| op.id).collect();
            let appended: Vec<Operation> = incoming
                .into_iter()
                .filter(|op| seen.insert(op.id.clone()))
                .collect();
            if !appended.is_empty() {
                self.log.append_batch(&appended)?;
            }
            debug!(merged = appended.len(), "merged remote operations");
            Ok(Merged {
                appended,
                previous_last,
            })
        })
    }

    pub fn capture(&self, actor: &str, payload: CapturePayload) -> Result<Operation> {
        self.record(actor, OpPayload::Capture(payload), None)
    }

    pub fn commit(&self, actor: &str, payload: CommitPayload) -> Result<Operation> {
        self.record(actor, OpPayload::Commit(payload), None)
    }

    pub fn claim(&self, actor: &str, commitment: &str) -> Result<Operation> {
        self.record(
            actor,
            OpPayload::Claim(ClaimPayload {
                commitment: commitment.to_string(),
            }),
            None,
        )
    }

    pub fn release(&self, actor: &str, commitment: &str, reason: Option<String>) -> Result<Operation> {
        self.record(
            actor,
            OpPayload::Release(ReleasePayload {
                commitment: commitment.to_string(),
                reason,
            }),
            None,
        )
    }

    pub fn submit(&self, actor: &str, payload: SubmitPayload) -> Result<Operation> {
        self.record(actor, OpPayload::Submit(payload), None)
    }

    pub fn approve(&self, actor: &str, payload: ApprovePayload) -> Result<Operation> {
        self.record(actor, OpPayload::Approve(payload), None)
    }

    pub fn reopen(&self, actor: &str, commitment: &str, reason: &str) -> Result<Operation> {
        let from_state = self
            .state()?
            .commitment(commitment)
            .map(|c| c.state);
        self.record(
            actor,
            OpPayload::Reopen(ReopenPayload {
                commitment: commitment.to_string(),
                reason: reason.to_string(),
                from_state,
            }),
            None,
        )
    }

    pub fn close(&self, actor: &str, payload: ClosePayload) -> Result<Operation> {
        self.record(actor, OpPayload::Close(payload), None)
    }

    pub fn annotate(&self, actor: &str, payload: AnnotatePayload) -> Result<Operation> {
        self.record(actor, OpPayload::Annotate(payload), None)
    }

    pub fn link(&self, actor: &str, payload: LinkPayload) -> Result<Operation> {
        self.record(actor, OpPayload::Link(payload), None)
    }

    pub fn dismiss(&self, actor: &str, payload: DismissPayload) -> Result<Operation> {
        self.record(actor, OpPayload::Dismiss(payload), None)
    }
}

/// Nearest directory at or above `start` that contains `.pledge/`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(WORKSPACE_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Add `.pledge/` to `root/.gitignore`, creating the file if needed.
/// Returns whether the file changed.
pub fn update_gitignore(root: &Path) -> std::io::Result<bool> {
    let path = root.join(".gitignore");
    match std::fs::read_to_string(&path) {
        Ok(content) if content.lines().any(|l| l.trim() == GITIGNORE_ENTRY) => Ok(false),
        Ok(mut content) => {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&format!("\n# Pledge workspace\n{GITIGNORE_ENTRY}\n"));
            std::fs::write(&path, content)?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::write(&path, format!("# Pledge workspace\n{GITIGNORE_ENTRY}\n"))?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

fn dir_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "workspace".to_string())
}

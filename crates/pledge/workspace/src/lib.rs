//! Pledge workspace: the single write path into a ledger.
//!
//! A workspace is a project directory containing `.pledge/`:
//!
//! ```text
//! .pledge/
//!   config.yaml       workspace name, default actor, cloud settings
//!   ledger.jsonl      the operation log
//!   genesis.key       optional authorization policy
//!   .lock             PID of the current writer
//!   sync-state.json   per-device sync cursor
//! ```
//!
//! Every append goes through [`Workspace::append`]: acquire the lock, read
//! the log, validate against the Genesis Key, append, release.

#![deny(unsafe_code)]

pub mod actor;
pub mod config;
pub mod error;
pub mod external;
pub mod workspace;

pub use actor::{resolve_actor, resolve_actor_from, ACTOR_ENV, FALLBACK_ACTOR};
pub use config::{CloudConfig, WorkspaceConfig, CONFIG_FILE, WORKSPACE_DIR};
pub use error::WorkspaceError;
pub use workspace::{find_root, update_gitignore, InitOptions, Merged, Workspace};

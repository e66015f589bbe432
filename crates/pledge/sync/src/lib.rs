//! Pledge sync: reconcile a local ledger with a remote authority.
//!
//! Each device keeps its sync position in `.pledge/sync-state.json`: the
//! remote cursor (id of the last operation seen in remote order) and the last
//! local operation known to the remote. A push sends every local operation
//! after the latter; a pull fetches remote operations after the cursor and
//! merges them by id, so replays of the same page are harmless. Positions are
//! only persisted after the local side of an exchange has been written.
//!
//! The remote is reached through the [`RemoteLedger`] trait. [`HttpRemote`]
//! talks to the hosted sync functions; [`InMemoryRemote`] is a reference
//! implementation of the server side used in tests.

#![deny(unsafe_code)]

pub mod engine;
pub mod error;
pub mod http;
pub mod memory;
pub mod remote;
pub mod state;
pub mod watch;

pub use engine::{
    PullResult, PushResult, SyncEngine, SyncOptions, SyncReport, SyncSettings, SyncStatusReport,
};
pub use error::SyncError;
pub use http::HttpRemote;
pub use memory::InMemoryRemote;
pub use remote::{PullResponse, PushResponse, RemoteLedger};
pub use state::{
    generate_client_id, pending_count, unsynced_operations, SyncState, SyncStateStore,
    SyncStatus, SYNC_STATE_FILE,
};
pub use watch::{watch, WatchOptions};

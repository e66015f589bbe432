//! Durable storage for the Pledge ledger.
//!
//! The log is a newline-delimited JSON file holding one [`Operation`] per
//! line, appended and never rewritten. Writers serialize through a PID-file
//! [`WorkspaceLock`]; readers take no lock and only ever see complete lines.
//!
//! [`Operation`]: pledge_types::Operation

#![deny(unsafe_code)]

pub mod error;
pub mod lock;
pub mod ledger;

pub use error::LogError;
pub use lock::{LockGuard, WorkspaceLock, LOCK_FILE};
pub use ledger::{contains_id, contains_source_key, parse_lines, OperationLog, LEDGER_FILE};

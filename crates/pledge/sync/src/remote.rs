//! The remote ledger seam.

use async_trait::async_trait;
use pledge_types::Operation;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Ids the remote stored (or already had)
    #[serde(default)]
    pub accepted: Vec<String>,
    /// Ids the remote refused
    #[serde(default)]
    pub rejected: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Cursor the client should continue from; empty means unchanged
    #[serde(default)]
    pub new_cursor: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Cursor after this page; empty means unchanged
    #[serde(default)]
    pub new_cursor: String,
    #[serde(default)]
    pub has_more: bool,
}

/// A remote authority that stores operations and hands them out in a
/// stable order.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
    /// Store `ops`, which the client produced after `cursor`.
    async fn push_operations(
        &self,
        ops: &[Operation],
        cursor: Option<&str>,
        client_id: &str,
    ) -> Result<PushResponse, SyncError>;

    /// Up to `limit` operations stored after `cursor`.
    async fn pull_operations(
        &self,
        cursor: Option<&str>,
        client_id: &str,
        limit: u32,
    ) -> Result<PullResponse, SyncError>;
}

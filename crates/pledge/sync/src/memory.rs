//! In-process remote ledger.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pledge_types::Operation;

use crate::error::SyncError;
use crate::remote::{PullResponse, PushResponse, RemoteLedger};

/// A remote that keeps operations in memory, in arrival order.
///
/// Pushes are idempotent by id. A push only advances the caller's cursor to
/// the end of the remote log when the caller has already seen everything
/// stored before its batch; otherwise the old cursor is returned so the next
/// pull still delivers the operations it has not seen.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    ops: Mutex<Vec<Operation>>,
    unavailable: AtomicBool,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a 503 until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the stored operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Operation>> {
        // A panic while holding the lock leaves the Vec intact.
        self.ops.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), SyncError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SyncError::Remote {
                status: Some(503),
                message: "remote unavailable".into(),
            });
        }
        Ok(())
    }
}

/// Index just past `cursor` in `ops`; 0 when unset or unknown.
fn start_after(ops: &[Operation], cursor: Option<&str>) -> usize {
    cursor
        .and_then(|cursor| ops.iter().position(|op| op.id == cursor))
        .map_or(0, |index| index + 1)
}

#[async_trait]
impl RemoteLedger for InMemoryRemote {
    async fn push_operations(
        &self,
        ops: &[Operation],
        cursor: Option<&str>,
        _client_id: &str,
    ) -> Result<PushResponse, SyncError> {
        self.check_available()?;
        let mut stored = self.lock();

        let batch: HashSet<&str> = ops.iter().map(|op| op.id.as_str()).collect();
        let unseen = stored[start_after(&stored, cursor)..]
            .iter()
            .any(|op| !batch.contains(op.id.as_str()));

        let mut known: HashSet<String> = stored.iter().map(|op| op.id.clone()).collect();
        let mut response = PushResponse::default();
        for op in ops {
            if known.insert(op.id.clone()) {
                stored.push(op.clone());
            } else {
                response
                    .warnings
                    .push(format!("operation {} already stored", op.id));
            }
            response.accepted.push(op.id.clone());
        }

        response.new_cursor = if unseen {
            cursor.unwrap_or_default().to_string()
        } else {
            stored.last().map(|op| op.id.clone()).unwrap_or_default()
        };
        Ok(response)
    }

    async fn pull_operations(
        &self,
        cursor: Option<&str>,
        _client_id: &str,
        limit: u32,
    ) -> Result<PullResponse, SyncError> {
        self.check_available()?;
        let stored = self.lock();

        let start = start_after(&stored, cursor);
        let end = stored.len().min(start + limit.max(1) as usize);
        let operations = stored[start..end].to_vec();
        let new_cursor = match operations.last() {
            Some(op) => op.id.clone(),
            None => cursor.unwrap_or_default().to_string(),
        };
        Ok(PullResponse {
            operations,
            new_cursor,
            has_more: end < stored.len(),
        })
    }
}

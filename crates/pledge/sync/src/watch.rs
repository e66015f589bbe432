//! Continuous sync: on an interval and whenever the local log changes.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch as signal;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::{SyncEngine, SyncOptions, SyncReport};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Time between periodic syncs
    pub interval: Duration,
    /// How often the log file is checked for changes
    pub poll_interval: Duration,
    /// Quiet period after the last detected change before syncing
    pub debounce: Duration,
    pub sync: SyncOptions,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            debounce: Duration::from_secs(1),
            sync: SyncOptions::default(),
        }
    }
}

/// Size and modification time of the log file.
type Fingerprint = Option<(u64, Option<SystemTime>)>;

async fn fingerprint(path: &Path) -> Fingerprint {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some((metadata.len(), metadata.modified().ok()))
}

/// Run a full sync now, then again every `options.interval` and after local
/// log changes settle, until `shutdown` turns true or its sender is dropped.
///
/// Every attempt's outcome is handed to `on_sync`. Failures never stop the
/// loop; the next attempt retries in full.
pub async fn watch<F>(
    engine: Arc<SyncEngine>,
    options: WatchOptions,
    mut shutdown: signal::Receiver<bool>,
    mut on_sync: F,
) where
    F: FnMut(&Result<SyncReport, SyncError>) + Send,
{
    let log_path = engine.workspace().log().path().to_path_buf();
    let mut ticker = interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poller = interval(options.poll_interval);
    poller.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_seen = fingerprint(&log_path).await;
    let mut changed_at: Option<Instant> = None;

    if *shutdown.borrow() {
        return;
    }
    info!(interval = ?options.interval, "watching for changes");

    loop {
        let due = tokio::select! {
            _ = ticker.tick() => true,
            _ = poller.tick() => {
                let current = fingerprint(&log_path).await;
                if current != last_seen {
                    debug!("local log changed");
                    last_seen = current;
                    changed_at = Some(Instant::now());
                }
                changed_at.is_some_and(|at| at.elapsed() >= options.debounce)
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                false
            }
        };
        if !due {
            continue;
        }

        if engine.is_syncing() {
            debug!("sync already in flight, skipping");
            continue;
        }
        let outcome = engine.full_sync(options.sync).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "watch sync failed");
        }
        on_sync(&outcome);

        // Our own merge writes the log; start the next change window fresh.
        last_seen = fingerprint(&log_path).await;
        changed_at = None;
    }

    info!("watch stopped");
}

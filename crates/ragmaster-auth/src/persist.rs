//! Background writer for the persisted auth blob.

use crate::types::PersistedAuth;
use ragmaster_storage::{StateManager, StorageKeys};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Writes the latest blob off the caller's path.
///
/// Bursts of updates coalesce: the writer always picks up the newest blob, so
/// intermediate ones may never hit the disk.
pub(crate) struct Persister {
    latest: watch::Sender<(u64, PersistedAuth)>,
    written: watch::Receiver<u64>,
}

impl Persister {
    /// Spawn the writer task. `initial` is what storage already holds.
    pub(crate) fn spawn(storage: Arc<StateManager>, initial: PersistedAuth) -> Self {
        let (latest, latest_rx) = watch::channel((0u64, initial));
        let (written_tx, written) = watch::channel(0u64);

        tokio::spawn(run_writer(storage, latest_rx, written_tx));

        Self { latest, written }
    }

    /// Queue `blob` to replace the stored one.
    pub(crate) fn save(&self, blob: PersistedAuth) {
        self.latest.send_modify(|(seq, current)| {
            *seq += 1;
            *current = blob;
        });
    }

    /// Wait until everything queued so far has been written.
    pub(crate) async fn flush(&self) {
        let target = self.latest.borrow().0;
        let mut written = self.written.clone();
        if written.wait_for(|seq| *seq >= target).await.is_err() {
            warn!("Auth state writer stopped before flush completed");
        }
    }
}

async fn run_writer(
    storage: Arc<StateManager>,
    mut latest: watch::Receiver<(u64, PersistedAuth)>,
    written: watch::Sender<u64>,
) {
    while latest.changed().await.is_ok() {
        let (seq, blob) = latest.borrow_and_update().clone();
        let storage = storage.clone();

        let result = tokio::task::spawn_blocking(move || {
            storage.save_json(StorageKeys::AUTH_STORAGE, &blob)
        })
        .await;

        match result {
            Ok(Ok(())) => debug!(seq, "Persisted auth state"),
            Ok(Err(e)) => warn!(error = %e, "Failed to persist auth state"),
            Err(e) => warn!(error = %e, "Auth state write task failed"),
        }

        written.send_replace(seq);
    }
    debug!("Auth state writer stopped");
}

//! Debounced, best-effort replication of the in-progress snapshot to the
//! external record store. Failures are logged and swallowed; synchronization
//! is auxiliary durability, never a gate on wizard progression.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::api::{RecordStore, RemoteAddress};
use super::domain::ApplicationSnapshot;

#[derive(Debug, Clone)]
struct PendingSync {
    due: Instant,
    snapshot: ApplicationSnapshot,
}

/// Single-slot debounce over a [`RecordStore`]. Scheduling cancels and
/// replaces any not-yet-fired sync; a superseded sync is dropped, never queued.
pub struct SyncEngine<R> {
    store: Arc<R>,
    debounce: Duration,
    pending: Option<PendingSync>,
}

impl<R> std::fmt::Debug for SyncEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("debounce", &self.debounce)
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl<R: RecordStore> SyncEngine<R> {
    pub fn new(store: Arc<R>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            pending: None,
        }
    }

    /// Capture the current snapshot and (re)arm the debounce timer.
    pub fn schedule(&mut self, snapshot: &ApplicationSnapshot, now: Instant) {
        self.pending = Some(PendingSync {
            due: now + self.debounce,
            snapshot: snapshot.clone(),
        });
    }

    /// Drop any scheduled sync without firing it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the scheduled sync is due for display/driver purposes.
    pub fn pending_due(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.due)
    }

    /// Fire the scheduled sync if its quiet period has elapsed. Returns the
    /// server-assigned address for the orchestrator to merge back into the
    /// snapshot; `None` when nothing fired or the attempt failed.
    pub fn flush_due(&mut self, now: Instant) -> Option<RemoteAddress> {
        match self.pending.as_ref() {
            Some(pending) if pending.due <= now => {}
            _ => return None,
        }
        let pending = self.pending.take()?;
        self.dispatch(&pending.snapshot)
    }

    fn dispatch(&self, snapshot: &ApplicationSnapshot) -> Option<RemoteAddress> {
        match (&snapshot.remote_row_id, &snapshot.remote_sheet_name) {
            (Some(row_id), Some(sheet_name)) => {
                let address = RemoteAddress {
                    row_id: row_id.clone(),
                    sheet_name: sheet_name.clone(),
                };
                match self.store.update(&address, snapshot) {
                    Ok(next_address) => {
                        debug!(row_id = %next_address.row_id, "record updated");
                        Some(next_address)
                    }
                    Err(err) => {
                        warn!(error = %err, "record update failed; will retry on next change");
                        None
                    }
                }
            }
            _ => {
                // No remote row until a complete phone number exists.
                if !snapshot.phone_complete() {
                    debug!("skipping create; phone number incomplete");
                    return None;
                }
                match self.store.create(&snapshot.phone_number) {
                    Ok(address) => {
                        debug!(row_id = %address.row_id, "record created");
                        Some(address)
                    }
                    Err(err) => {
                        warn!(error = %err, "record create failed; will retry on next change");
                        None
                    }
                }
            }
        }
    }
}

//! Local-only draft durability. Survives a client restart and is independent
//! of the record store's remote durability.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::ApplicationSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum DraftStoreError {
    #[error("draft io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable store for one in-progress draft under a fixed key.
pub trait DraftStore {
    fn save(&self, snapshot: &ApplicationSnapshot) -> Result<(), DraftStoreError>;
    /// Last saved snapshot; absent and corrupt drafts both read as `None`.
    fn load(&self) -> Option<ApplicationSnapshot>;
    fn clear(&self) -> Result<(), DraftStoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct DraftEnvelope {
    saved_at: DateTime<Utc>,
    snapshot: ApplicationSnapshot,
}

/// JSON-file draft store.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    path: PathBuf,
}

impl FileDraftStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, snapshot: &ApplicationSnapshot) -> Result<(), DraftStoreError> {
        let envelope = DraftEnvelope {
            saved_at: Utc::now(),
            snapshot: snapshot.clone(),
        };
        let payload = serde_json::to_vec_pretty(&envelope)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, payload)?;
        Ok(())
    }

    fn load(&self) -> Option<ApplicationSnapshot> {
        let payload = match fs::read(&self.path) {
            Ok(payload) => payload,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(error = %err, "draft unreadable; treating as absent");
                return None;
            }
        };
        match serde_json::from_slice::<DraftEnvelope>(&payload) {
            Ok(envelope) => Some(envelope.snapshot),
            Err(err) => {
                warn!(error = %err, "draft corrupt; treating as absent");
                None
            }
        }
    }

    fn clear(&self) -> Result<(), DraftStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory draft store for sessions that do not need restart durability.
/// Clones share the same slot.
#[derive(Debug, Default, Clone)]
pub struct MemoryDraftStore {
    slot: Arc<Mutex<Option<ApplicationSnapshot>>>,
}

impl MemoryDraftStore {
    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ApplicationSnapshot>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, snapshot: &ApplicationSnapshot) -> Result<(), DraftStoreError> {
        *self.slot() = Some(snapshot.clone());
        Ok(())
    }

    fn load(&self) -> Option<ApplicationSnapshot> {
        self.slot().clone()
    }

    fn clear(&self) -> Result<(), DraftStoreError> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::domain::{LoanCategory, Ternary};

    fn sample_snapshot() -> ApplicationSnapshot {
        ApplicationSnapshot {
            phone_number: "9876543210".to_string(),
            postal_code: "600001".to_string(),
            tax_id: "ABCDE1234F".to_string(),
            loan_category: LoanCategory::Business,
            requested_amount: "500000".to_string(),
            has_tax_registration: Ternary::Yes,
            has_business_proof: Ternary::Yes,
            challenge_verified: true,
            tax_id_verified: true,
            ..ApplicationSnapshot::default()
        }
    }

    #[test]
    fn file_store_round_trips_a_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDraftStore::new(dir.path().join("draft.json"));

        let snapshot = sample_snapshot();
        store.save(&snapshot).expect("save succeeds");
        assert_eq!(store.load(), Some(snapshot));
    }

    #[test]
    fn missing_draft_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDraftStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_draft_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("draft.json");
        std::fs::write(&path, b"{ not json").expect("write corrupt payload");

        let store = FileDraftStore::new(path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileDraftStore::new(dir.path().join("draft.json"));

        store.save(&sample_snapshot()).expect("save succeeds");
        store.clear().expect("first clear");
        store.clear().expect("second clear is a no-op");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn memory_store_round_trips_and_clears() {
        let store = MemoryDraftStore::default();
        let snapshot = sample_snapshot();

        store.save(&snapshot).expect("save succeeds");
        assert_eq!(store.load(), Some(snapshot));
        store.clear().expect("clear succeeds");
        assert_eq!(store.load(), None);
    }
}

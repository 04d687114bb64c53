//! Offline store: the in-memory store persisted as one JSON document.

use std::path::{Path, PathBuf};

use atril_core::ledger::InventoryPatch;
use atril_core::{InventoryRecord, MovementRecord, StudentEntry};
use tracing::debug;

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::store::{Snapshot, Store};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Load the snapshot at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(path = %path.display(), "opened file store");
        Ok(Self {
            path,
            inner: MemoryStore::from_snapshot(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.inner.snapshot()).map_err(|source| {
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(io_err)?;
        }
        // Write-then-rename so a crash never leaves half a snapshot.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

impl Store for FileStore {
    async fn delete_all_inventory(&self) -> Result<(), StoreError> {
        self.inner.delete_all_inventory().await?;
        self.persist().await
    }

    async fn insert_inventory(&self, records: &[InventoryRecord]) -> Result<(), StoreError> {
        self.inner.insert_inventory(records).await?;
        self.persist().await
    }

    async fn select_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        self.inner.select_inventory().await
    }

    async fn update_inventory(&self, patch: &InventoryPatch) -> Result<(), StoreError> {
        self.inner.update_inventory(patch).await?;
        self.persist().await
    }

    async fn upsert_students(&self, students: &[StudentEntry]) -> Result<(), StoreError> {
        self.inner.upsert_students(students).await?;
        self.persist().await
    }

    async fn select_students(&self) -> Result<Vec<StudentEntry>, StoreError> {
        self.inner.select_students().await
    }

    async fn insert_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        self.inner.insert_student(student).await?;
        self.persist().await
    }

    async fn update_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        self.inner.update_student(student).await?;
        self.persist().await
    }

    async fn delete_student(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_student(id).await?;
        self.persist().await
    }

    async fn insert_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        self.inner.insert_movement(movement).await?;
        self.persist().await
    }

    async fn update_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        self.inner.update_movement(movement).await?;
        self.persist().await
    }

    async fn select_history(&self) -> Result<Vec<MovementRecord>, StoreError> {
        self.inner.select_history().await
    }

    async fn delete_all_history(&self) -> Result<(), StoreError> {
        self.inner.delete_all_history().await?;
        self.persist().await
    }
}

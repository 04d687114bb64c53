use std::fmt;
use std::path::PathBuf;

use atril_core::LifecycleError;
use thiserror::Error;

use crate::store::Table;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table}: request failed: {source}")]
    Http {
        table: Table,
        #[source]
        source: reqwest::Error,
    },

    #[error("{table}: server answered {status}: {body}")]
    Status {
        table: Table,
        status: u16,
        body: String,
    },

    #[error("{table}: could not decode rows: {source}")]
    Decode {
        table: Table,
        #[source]
        source: reqwest::Error,
    },

    #[error("{table}: could not encode rows: {source}")]
    Encode {
        table: Table,
        #[source]
        source: serde_json::Error,
    },

    #[error("{table}: no row with id {id}")]
    NotFound { table: Table, id: String },

    #[error("{table}: a row named {name} already exists")]
    Conflict { table: Table, name: String },

    #[error("store file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Step of the import saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    DeleteInventory,
    InsertInventory,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::DeleteInventory => f.write_str("deleting the remote inventory"),
            ImportStage::InsertInventory => f.write_str("inserting the new inventory"),
        }
    }
}

/// Import failure. The local inventory has already been replaced when this
/// is returned; only the store mirror is behind.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Busy(#[from] LifecycleError),

    #[error("import failed while {stage}: {source}")]
    Store {
        stage: ImportStage,
        #[source]
        source: StoreError,
    },
}

impl ImportError {
    /// True when the delete went through but the insert did not: the store
    /// now holds no inventory at all until the next import.
    pub fn remote_inventory_empty(&self) -> bool {
        matches!(
            self,
            ImportError::Store {
                stage: ImportStage::InsertInventory,
                ..
            }
        )
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Busy(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("student name is required")]
    MissingName,
}

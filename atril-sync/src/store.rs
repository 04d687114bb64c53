//! The record store behind the session: three tables (inventory, history,
//! students) with the handful of operations the application needs.

use std::fmt;

use atril_core::ledger::InventoryPatch;
use atril_core::{InventoryRecord, MovementRecord, StudentEntry};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Inventory,
    History,
    Students,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Inventory => "inventory",
            Table::History => "history",
            Table::Students => "students",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Full contents of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub inventory: Vec<InventoryRecord>,
    /// Newest first.
    #[serde(default)]
    pub history: Vec<MovementRecord>,
    /// Ordered by name.
    #[serde(default)]
    pub students: Vec<StudentEntry>,
}

/// Persistence for the session.
///
/// Implementations are eventually consistent mirrors of the session state;
/// none of the multi-step flows built on top of them are transactional.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Remove every inventory row.
    async fn delete_all_inventory(&self) -> Result<(), StoreError>;

    async fn insert_inventory(&self, records: &[InventoryRecord]) -> Result<(), StoreError>;

    async fn select_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    /// Apply a partial update to the row with `patch.id`.
    async fn update_inventory(&self, patch: &InventoryPatch) -> Result<(), StoreError>;

    /// Insert or merge students, matching on the (upper-cased) name.
    async fn upsert_students(&self, students: &[StudentEntry]) -> Result<(), StoreError>;

    /// All students, ordered by name.
    async fn select_students(&self) -> Result<Vec<StudentEntry>, StoreError>;

    async fn insert_student(&self, student: &StudentEntry) -> Result<(), StoreError>;

    /// Replace the student with `student.id`.
    async fn update_student(&self, student: &StudentEntry) -> Result<(), StoreError>;

    async fn delete_student(&self, id: &str) -> Result<(), StoreError>;

    async fn insert_movement(&self, movement: &MovementRecord) -> Result<(), StoreError>;

    /// Write the return date and status of an existing movement.
    async fn update_movement(&self, movement: &MovementRecord) -> Result<(), StoreError>;

    /// Movement history, newest first.
    async fn select_history(&self) -> Result<Vec<MovementRecord>, StoreError>;

    async fn delete_all_history(&self) -> Result<(), StoreError>;
}

/// Student row as sent to the store: the store owns the key.
pub(crate) fn without_id(student: &StudentEntry) -> StudentEntry {
    StudentEntry {
        id: String::new(),
        ..student.clone()
    }
}

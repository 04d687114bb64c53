//! In-process store. Backs the file store and the tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

use atril_core::ledger::InventoryPatch;
use atril_core::text::locale_cmp;
use atril_core::{InventoryRecord, MovementRecord, StudentEntry};

use crate::error::StoreError;
use crate::store::{Snapshot, Store, Table, without_id};

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Snapshot,
    next_student_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let next_student_id = snapshot
            .students
            .iter()
            .filter_map(|s| s.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self {
            state: Mutex::new(MemoryState {
                snapshot,
                next_student_id,
            }),
        }
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> Snapshot {
        self.state().snapshot.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn assign_student_id(&mut self) -> String {
        self.next_student_id += 1;
        self.next_student_id.to_string()
    }

    fn sort_students(&mut self) {
        self.snapshot
            .students
            .sort_by(|a, b| locale_cmp(&a.name, &b.name));
    }

    fn student_named(&mut self, name: &str) -> Option<&mut StudentEntry> {
        self.snapshot.students.iter_mut().find(|s| s.name == name)
    }
}

/// Merge the columns an upsert payload carries into an existing row.
fn merge_student(existing: &mut StudentEntry, incoming: StudentEntry) {
    existing.course = incoming.course;
    let optional = [
        (&mut existing.instrument, incoming.instrument),
        (&mut existing.phone, incoming.phone),
        (&mut existing.email, incoming.email),
        (&mut existing.parent_name, incoming.parent_name),
        (&mut existing.parent_phone, incoming.parent_phone),
    ];
    for (slot, value) in optional {
        if value.is_some() {
            *slot = value;
        }
    }
}

impl Store for MemoryStore {
    async fn delete_all_inventory(&self) -> Result<(), StoreError> {
        self.state().snapshot.inventory.clear();
        Ok(())
    }

    async fn insert_inventory(&self, records: &[InventoryRecord]) -> Result<(), StoreError> {
        self.state()
            .snapshot
            .inventory
            .extend(records.iter().cloned());
        Ok(())
    }

    async fn select_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        Ok(self.state().snapshot.inventory.clone())
    }

    async fn update_inventory(&self, patch: &InventoryPatch) -> Result<(), StoreError> {
        let mut state = self.state();
        let record = state
            .snapshot
            .inventory
            .iter_mut()
            .find(|r| r.id == patch.id)
            .ok_or_else(|| StoreError::NotFound {
                table: Table::Inventory,
                id: patch.id.clone(),
            })?;
        patch.apply(record);
        Ok(())
    }

    async fn upsert_students(&self, students: &[StudentEntry]) -> Result<(), StoreError> {
        let mut state = self.state();
        for student in students {
            let mut incoming = without_id(student);
            incoming.name = incoming.name.trim().to_uppercase();
            match state.student_named(&incoming.name) {
                Some(existing) => merge_student(existing, incoming),
                None => {
                    incoming.id = state.assign_student_id();
                    state.snapshot.students.push(incoming);
                }
            }
        }
        state.sort_students();
        Ok(())
    }

    async fn select_students(&self) -> Result<Vec<StudentEntry>, StoreError> {
        Ok(self.state().snapshot.students.clone())
    }

    async fn insert_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.student_named(&student.name).is_some() {
            return Err(StoreError::Conflict {
                table: Table::Students,
                name: student.name.clone(),
            });
        }
        let mut row = without_id(student);
        row.id = state.assign_student_id();
        state.snapshot.students.push(row);
        state.sort_students();
        Ok(())
    }

    async fn update_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        let mut state = self.state();
        let row = state
            .snapshot
            .students
            .iter_mut()
            .find(|s| s.id == student.id)
            .ok_or_else(|| StoreError::NotFound {
                table: Table::Students,
                id: student.id.clone(),
            })?;
        *row = student.clone();
        state.sort_students();
        Ok(())
    }

    async fn delete_student(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        let before = state.snapshot.students.len();
        state.snapshot.students.retain(|s| s.id != id);
        if state.snapshot.students.len() == before {
            return Err(StoreError::NotFound {
                table: Table::Students,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        self.state().snapshot.history.insert(0, movement.clone());
        Ok(())
    }

    async fn update_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        let mut state = self.state();
        let row = state
            .snapshot
            .history
            .iter_mut()
            .find(|m| m.id == movement.id)
            .ok_or_else(|| StoreError::NotFound {
                table: Table::History,
                id: movement.id.clone(),
            })?;
        row.status = movement.status;
        row.return_date = movement.return_date.clone();
        Ok(())
    }

    async fn select_history(&self) -> Result<Vec<MovementRecord>, StoreError> {
        Ok(self.state().snapshot.history.clone())
    }

    async fn delete_all_history(&self) -> Result<(), StoreError> {
        self.state().snapshot.history.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atril_core::Field;

    #[tokio::test]
    async fn test_upsert_merges_on_upper_cased_name() {
        let store = MemoryStore::new();
        store
            .upsert_students(&[StudentEntry::registered("ana pérez", None)])
            .await
            .unwrap();
        let mut again = StudentEntry::registered("Ana Pérez", Some("5b"));
        again.phone = Some("+56 9 1234".into());
        store.upsert_students(&[again]).await.unwrap();

        let students = store.select_students().await.unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, "1");
        assert_eq!(students[0].course, "5B");
        assert_eq!(students[0].phone.as_deref(), Some("+56 9 1234"));
    }

    #[tokio::test]
    async fn test_update_inventory_applies_patch() {
        let store = MemoryStore::new();
        store
            .insert_inventory(&[InventoryRecord::new("1").with(Field::Instrumento, "Tuba")])
            .await
            .unwrap();
        let mut patch = InventoryPatch {
            id: "1".into(),
            changes: Default::default(),
        };
        patch.changes.insert(Field::Prestado, "SÍ".into());
        store.update_inventory(&patch).await.unwrap();
        assert!(store.select_inventory().await.unwrap()[0].is_loaned());

        patch.id = "9".into();
        let err = store.update_inventory(&patch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { table: Table::Inventory, .. }));
    }

    #[tokio::test]
    async fn test_insert_student_rejects_duplicate_name() {
        let store = MemoryStore::new();
        let s = StudentEntry::registered("Luis", None);
        store.insert_student(&s).await.unwrap();
        assert!(store.insert_student(&s).await.is_err());
        store.delete_student("1").await.unwrap();
        assert!(store.select_students().await.unwrap().is_empty());
    }
}

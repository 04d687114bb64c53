use std::cell::Cell;
use std::time::Duration;

use atril_core::ledger::InventoryPatch;
use atril_core::{
    InventoryRecord, LoanError, MovementRecord, MovementStatus, StudentEntry, SyncPhase,
};
use atril_ingest::{ReconcileOptions, SheetRow, read_sheet_from};
use atril_sync::{
    CheckoutInput, ClearOutcome, FileStore, ImportStage, MemoryStore, RefreshOutcome,
    ReturnInput, Session, SessionConfig, Store, StoreError, SyncError, Table,
};
use chrono::{DateTime, TimeZone, Utc};

const SHEET: &str = "\
Instrumento,Marca,Serie,Estado,Responsable,Estudiante,Curso,Prestado
Violín 1/2,Stentor,V-1,Bueno,Marta,,,NO
Viola 4/4,Gliga,VA-2,Regular,Marta,Ana Pérez,5B,SI
Cello 3/4,,C-3,Malo,Luis,,,NO
TOTAL,,,,,,,
";

fn rows() -> Vec<SheetRow> {
    read_sheet_from(SHEET.as_bytes()).unwrap()
}

fn now() -> DateTime<Utc> {
    // 2026-03-02 13:05 in Santiago (UTC-3).
    Utc.with_ymd_and_hms(2026, 3, 2, 16, 5, 0).unwrap()
}

fn checkout(id: &str, student: &str) -> CheckoutInput {
    CheckoutInput {
        instrument_id: id.to_string(),
        student: student.to_string(),
        course: None,
        date: None,
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("test".into())
}

/// Memory store that can be told to fail individual operations or stall.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_delete_inventory: Cell<bool>,
    fail_insert_inventory: Cell<bool>,
    fail_upsert_students: Cell<bool>,
    fail_update_inventory: Cell<bool>,
    fail_selects: Cell<bool>,
    stall_history_delete: Cell<bool>,
}

impl Store for FlakyStore {
    async fn delete_all_inventory(&self) -> Result<(), StoreError> {
        if self.fail_delete_inventory.get() {
            return Err(unavailable());
        }
        self.inner.delete_all_inventory().await
    }

    async fn insert_inventory(&self, records: &[InventoryRecord]) -> Result<(), StoreError> {
        if self.fail_insert_inventory.get() {
            return Err(unavailable());
        }
        self.inner.insert_inventory(records).await
    }

    async fn select_inventory(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        if self.fail_selects.get() {
            return Err(unavailable());
        }
        self.inner.select_inventory().await
    }

    async fn update_inventory(&self, patch: &InventoryPatch) -> Result<(), StoreError> {
        if self.fail_update_inventory.get() {
            return Err(unavailable());
        }
        self.inner.update_inventory(patch).await
    }

    async fn upsert_students(&self, students: &[StudentEntry]) -> Result<(), StoreError> {
        if self.fail_upsert_students.get() {
            return Err(unavailable());
        }
        self.inner.upsert_students(students).await
    }

    async fn select_students(&self) -> Result<Vec<StudentEntry>, StoreError> {
        if self.fail_selects.get() {
            return Err(unavailable());
        }
        self.inner.select_students().await
    }

    async fn insert_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        self.inner.insert_student(student).await
    }

    async fn update_student(&self, student: &StudentEntry) -> Result<(), StoreError> {
        self.inner.update_student(student).await
    }

    async fn delete_student(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete_student(id).await
    }

    async fn insert_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        self.inner.insert_movement(movement).await
    }

    async fn update_movement(&self, movement: &MovementRecord) -> Result<(), StoreError> {
        self.inner.update_movement(movement).await
    }

    async fn select_history(&self) -> Result<Vec<MovementRecord>, StoreError> {
        if self.fail_selects.get() {
            return Err(unavailable());
        }
        self.inner.select_history().await
    }

    async fn delete_all_history(&self) -> Result<(), StoreError> {
        if self.stall_history_delete.get() {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.inner.delete_all_history().await
    }
}

async fn imported() -> Session<MemoryStore> {
    let mut session = Session::new(MemoryStore::new(), SessionConfig::default());
    session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap();
    session
}

#[tokio::test]
async fn test_import_replaces_local_and_store() {
    let session = imported().await;
    assert_eq!(session.phase(), SyncPhase::Idle);

    let ids: Vec<&str> = session.inventory().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(session.store().snapshot().inventory, session.inventory());

    let students = session.store().select_students().await.unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0].name, "ANA PÉREZ");
    assert_eq!(students[0].course, "5B");
    assert_eq!(session.students(), students.as_slice());
}

#[tokio::test]
async fn test_reimport_keeps_history_and_replaces_inventory() {
    let mut session = imported().await;
    session.check_out(checkout("1", "ana perez"), now()).await.unwrap();

    let report = session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!(report.instruments, 3);
    assert_eq!(session.store().snapshot().inventory.len(), 3);
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn test_insert_failure_leaves_store_inventory_empty() {
    let store = FlakyStore::default();
    store
        .inner
        .insert_inventory(&[InventoryRecord::new("old")])
        .await
        .unwrap();
    store.fail_insert_inventory.set(true);

    let mut session = Session::new(store, SessionConfig::default());
    let err = session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap_err();

    assert!(err.remote_inventory_empty());
    assert!(matches!(
        err,
        atril_sync::ImportError::Store {
            stage: ImportStage::InsertInventory,
            ..
        }
    ));
    // Local state was already replaced; the store lost its old rows.
    assert_eq!(session.inventory().len(), 3);
    assert!(session.store().inner.snapshot().inventory.is_empty());
    assert_eq!(session.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_delete_failure_keeps_store_inventory() {
    let store = FlakyStore::default();
    store
        .inner
        .insert_inventory(&[InventoryRecord::new("old")])
        .await
        .unwrap();
    store.fail_delete_inventory.set(true);

    let mut session = Session::new(store, SessionConfig::default());
    let err = session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap_err();
    assert!(!err.remote_inventory_empty());
    assert_eq!(session.store().inner.snapshot().inventory.len(), 1);
}

#[tokio::test]
async fn test_student_upsert_failure_does_not_fail_import() {
    let store = FlakyStore::default();
    store.fail_upsert_students.set(true);
    let mut session = Session::new(store, SessionConfig::default());
    let report = session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap();
    assert!(!report.students_synced);
    assert_eq!(report.students, 1);
    assert_eq!(session.store().inner.snapshot().inventory.len(), 3);
}

#[tokio::test]
async fn test_import_rejected_while_busy() {
    let mut session = Session::new(MemoryStore::new(), SessionConfig::default());
    session.lifecycle_mut().begin(SyncPhase::Clearing).unwrap();
    let err = session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, atril_sync::ImportError::Busy(_)));
    assert!(session.inventory().is_empty());
}

#[tokio::test]
async fn test_checkout_then_return() {
    let mut session = imported().await;

    let out = session
        .check_out(checkout("1", "Ana Perez"), now())
        .await
        .unwrap();
    assert_eq!(out.movement.checkout_date, "2026-03-02");
    assert_eq!(out.movement.checkout_time, "13:05");
    assert_eq!(out.movement.month, 2);
    assert_eq!(out.movement.course, "5B");

    let stored = session.store().snapshot();
    let violin = stored.inventory.iter().find(|r| r.id == "1").unwrap();
    assert!(violin.is_loaned());
    assert_eq!(violin.location.as_deref(), Some("HOGAR"));
    assert_eq!(violin.student.as_deref(), Some("ANA PEREZ"));
    assert_eq!(stored.history.len(), 1);
    assert_eq!(stored.history[0].student, "ANA PEREZ");

    let err = session
        .check_in(
            ReturnInput {
                instrument_id: "1".into(),
                student: "Luis".into(),
                date: None,
            },
            now(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LoanError::StudentMismatch { .. }));

    let back = session
        .check_in(
            ReturnInput {
                instrument_id: "1".into(),
                student: "ana pérez".into(),
                date: Some("2026-03-09".into()),
            },
            now(),
        )
        .await
        .unwrap();
    assert_eq!(
        back.completed.map(|m| m.status),
        Some(MovementStatus::Completed)
    );

    let stored = session.store().snapshot();
    assert_eq!(stored.history[0].return_date.as_deref(), Some("2026-03-09"));
    let violin = stored.inventory.iter().find(|r| r.id == "1").unwrap();
    assert!(!violin.is_loaned());
    assert_eq!(violin.location.as_deref(), Some("SALA DE MÚSICA"));
    assert_eq!(violin.student.as_deref(), Some(""));
}

#[tokio::test]
async fn test_checkout_requires_registered_student_and_free_instrument() {
    let mut session = imported().await;
    let err = session
        .check_out(checkout("1", "Nadie"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, LoanError::UnregisteredStudent(_)));

    // Instrument 2 is already loaned on the sheet.
    let err = session
        .check_out(checkout("2", "Ana Pérez"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, LoanError::AlreadyLoaned(_)));
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_checkout_store_failure_is_not_an_error() {
    let store = FlakyStore::default();
    let mut session = Session::new(store, SessionConfig::default());
    session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap();
    session.store().fail_update_inventory.set(true);

    session
        .check_out(checkout("1", "Ana Pérez"), now())
        .await
        .unwrap();
    assert!(session.inventory()[0].is_loaned());
    let stored = session.store().inner.snapshot();
    assert!(!stored.inventory[0].is_loaned());
    assert_eq!(stored.history.len(), 1);
}

#[tokio::test]
async fn test_refresh_skipped_while_clearing() {
    let mut session = imported().await;
    session.store().delete_all_inventory().await.unwrap();

    session.lifecycle_mut().begin(SyncPhase::Importing).unwrap();
    assert_eq!(
        session.refresh().await,
        RefreshOutcome::Skipped(SyncPhase::Importing)
    );
    assert_eq!(session.inventory().len(), 3);

    session.lifecycle_mut().finish();
    assert_eq!(
        session.refresh().await,
        RefreshOutcome::Applied { failed: vec![] }
    );
    assert!(session.inventory().is_empty());
}

#[tokio::test]
async fn test_refresh_keeps_tables_that_fail_to_load() {
    let mut session = Session::new(FlakyStore::default(), SessionConfig::default());
    session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap();
    session.store().fail_selects.set(true);
    assert_eq!(
        session.refresh().await,
        RefreshOutcome::Applied {
            failed: vec![Table::Inventory, Table::History, Table::Students]
        }
    );
    assert_eq!(session.inventory().len(), 3);
}

#[tokio::test]
async fn test_clear_inventory() {
    let mut session = imported().await;
    session.clear_inventory().await.unwrap();
    assert!(session.inventory().is_empty());
    assert!(session.store().snapshot().inventory.is_empty());
    assert_eq!(session.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn test_clear_history_times_out_and_resets_phase() {
    let config = SessionConfig {
        history_clear_timeout: Duration::from_millis(20),
        ..SessionConfig::default()
    };
    let mut session = Session::new(FlakyStore::default(), config);
    session
        .import_rows(&rows(), ReconcileOptions::default())
        .await
        .unwrap();
    session
        .check_out(checkout("1", "Ana Pérez"), now())
        .await
        .unwrap();

    session.store().stall_history_delete.set(true);
    let outcome = session.clear_history().await.unwrap();
    assert_eq!(outcome, ClearOutcome::TimedOut);
    assert_eq!(session.phase(), SyncPhase::Idle);
    assert_eq!(session.history().len(), 1);

    session.store().stall_history_delete.set(false);
    assert_eq!(session.clear_history().await.unwrap(), ClearOutcome::Cleared);
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_student_directory_maintenance() {
    let mut session = imported().await;
    let err = session
        .save_student(StudentEntry::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingName));

    let mut bea = StudentEntry::registered("bea soto", Some("3a"));
    bea.id.clear();
    bea.phone = Some("555".into());
    session.save_student(bea).await.unwrap();
    assert_eq!(session.students().len(), 2);

    let mut stored = session
        .students()
        .iter()
        .find(|s| s.name == "BEA SOTO")
        .cloned()
        .unwrap();
    stored.course = "4a".into();
    session.save_student(stored.clone()).await.unwrap();
    let updated = session.students().iter().find(|s| s.id == stored.id).unwrap();
    assert_eq!(updated.course, "4A");
    assert_eq!(updated.phone.as_deref(), Some("555"));

    session.remove_student(&stored.id).await.unwrap();
    assert_eq!(session.students().len(), 1);
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    {
        let store = FileStore::open(&path).unwrap();
        let mut session = Session::new(store, SessionConfig::default());
        session
            .import_rows(&rows(), ReconcileOptions::default())
            .await
            .unwrap();
        session
            .check_out(checkout("3", "Ana Pérez"), now())
            .await
            .unwrap();
    }

    let session = Session::open(FileStore::open(&path).unwrap(), SessionConfig::default()).await;
    assert_eq!(session.inventory().len(), 3);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.history()[0].instrument_id, "3");
    assert!(session.inventory()[2].is_loaned());
    assert_eq!(session.students().len(), 1);
}

//! Application state: the inventory, movement history and student directory,
//! mirrored to a [`Store`].
//!
//! The session is the single source of truth. Loans update local state first
//! and mirror to the store afterwards (failures are logged, not returned).
//! Import and the clear operations run inside a [`SyncPhase`] so the periodic
//! refresh cannot repopulate state with stale rows while they are in flight.

use std::collections::HashMap;
use std::time::Duration;

use atril_core::ledger::{self, CheckoutRequest, ReturnRequest};
use atril_core::student::course_label;
use atril_core::text::{locale_cmp, normalize};
use atril_core::time::local_stamp;
use atril_core::{
    CheckoutOutcome, InventoryRecord, Lifecycle, LoanError, LoanPolicy, MovementRecord,
    ReturnOutcome, StudentEntry, SyncPhase,
};
use atril_ingest::{ReconcileOptions, Reconciled, SheetRow, map_rows, reconcile};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::error::{ImportError, ImportStage, StoreError, SyncError};
use crate::store::{Store, Table};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub policy: LoanPolicy,
    /// IANA zone used for checkout dates and times.
    pub timezone: String,
    pub history_clear_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: LoanPolicy::default(),
            timezone: "America/Santiago".to_string(),
            history_clear_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutInput {
    pub instrument_id: String,
    pub student: String,
    pub course: Option<String>,
    /// `YYYY-MM-DD`; today in the configured zone when `None`.
    pub date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReturnInput {
    pub instrument_id: String,
    pub student: String,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another operation was in flight; nothing was fetched.
    Skipped(SyncPhase),
    /// Tables that could not be fetched kept their local contents.
    Applied { failed: Vec<Table> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub instruments: usize,
    pub students: usize,
    /// False when the student upsert failed (the import still succeeded).
    pub students_synced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    /// The store did not answer in time; local state was left untouched.
    TimedOut,
}

pub struct Session<S> {
    store: S,
    config: SessionConfig,
    lifecycle: Lifecycle,
    inventory: Vec<InventoryRecord>,
    history: Vec<MovementRecord>,
    students: Vec<StudentEntry>,
}

impl<S: Store> Session<S> {
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self {
            store,
            config,
            lifecycle: Lifecycle::default(),
            inventory: Vec::new(),
            history: Vec::new(),
            students: Vec::new(),
        }
    }

    /// New session loaded from the store.
    pub async fn open(store: S, config: SessionConfig) -> Self {
        let mut session = Self::new(store, config);
        session.refresh().await;
        session
    }

    pub fn inventory(&self) -> &[InventoryRecord] {
        &self.inventory
    }

    /// Newest first.
    pub fn history(&self) -> &[MovementRecord] {
        &self.history
    }

    pub fn students(&self) -> &[StudentEntry] {
        &self.students
    }

    pub fn phase(&self) -> SyncPhase {
        self.lifecycle.phase()
    }

    /// For callers that run their own long operation against the store and
    /// need the refresh held off meanwhile.
    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Periodic refresh: reload all three tables unless another operation
    /// holds the lifecycle.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        if let Err(busy) = self.lifecycle.begin(SyncPhase::Syncing) {
            debug!(phase = %busy.current, "refresh skipped");
            return RefreshOutcome::Skipped(busy.current);
        }
        let failed = self.pull().await;
        self.lifecycle.finish();
        RefreshOutcome::Applied { failed }
    }

    /// Fetch every table and replace the local copy of each one that loaded.
    async fn pull(&mut self) -> Vec<Table> {
        let (inventory, history, students) = tokio::join!(
            self.store.select_inventory(),
            self.store.select_history(),
            self.store.select_students(),
        );

        let mut failed = Vec::new();
        apply(&mut self.inventory, inventory, Table::Inventory, &mut failed);
        apply(&mut self.history, history, Table::History, &mut failed);
        apply(&mut self.students, students, Table::Students, &mut failed);
        debug!(
            instruments = self.inventory.len(),
            movements = self.history.len(),
            students = self.students.len(),
            "pulled store"
        );
        failed
    }

    /// Parse mapped sheet rows and import them.
    pub async fn import_rows(
        &mut self,
        rows: &[SheetRow],
        opts: ReconcileOptions,
    ) -> Result<ImportReport, ImportError> {
        let reconciled = reconcile(map_rows(rows), opts);
        self.import(reconciled).await
    }

    /// Replace the whole inventory.
    ///
    /// Local state is replaced first. The store is then updated in three
    /// steps with no rollback: delete all, insert, upsert students. If the
    /// insert fails after the delete went through, the store is left without
    /// inventory (see [`ImportError::remote_inventory_empty`]).
    pub async fn import(&mut self, reconciled: Reconciled) -> Result<ImportReport, ImportError> {
        self.lifecycle.begin(SyncPhase::Importing)?;

        let uploads = student_uploads(&reconciled.inventory);
        self.inventory = reconciled.inventory;
        merge_directory(&mut self.students, reconciled.students);

        let result = self.push_import(&uploads).await;
        self.lifecycle.finish();
        result
    }

    async fn push_import(&mut self, uploads: &[StudentEntry]) -> Result<ImportReport, ImportError> {
        let instruments = self.inventory.len();
        info!(instruments, students = uploads.len(), "import: replacing store inventory");

        self.store
            .delete_all_inventory()
            .await
            .map_err(|source| ImportError::Store {
                stage: ImportStage::DeleteInventory,
                source,
            })?;
        self.store
            .insert_inventory(&self.inventory)
            .await
            .map_err(|source| {
                error!(error = %source, "import: insert failed, store inventory is empty");
                ImportError::Store {
                    stage: ImportStage::InsertInventory,
                    source,
                }
            })?;

        let mut students_synced = true;
        if !uploads.is_empty() {
            if let Err(e) = self.store.upsert_students(uploads).await {
                warn!(error = %e, "import: student upsert failed");
                students_synced = false;
            }
        }

        let failed = self.pull().await;
        if !failed.is_empty() {
            warn!(?failed, "import: reload after import was incomplete");
        }
        info!(instruments, "import finished");
        Ok(ImportReport {
            instruments,
            students: uploads.len(),
            students_synced,
        })
    }

    /// Lend an instrument. The store is updated after local state; store
    /// failures are logged only.
    pub async fn check_out(
        &mut self,
        input: CheckoutInput,
        now: DateTime<Utc>,
    ) -> Result<CheckoutOutcome, LoanError> {
        let stamp = local_stamp(now, &self.config.timezone)?;
        let req = CheckoutRequest {
            movement_id: movement_id(&input.instrument_id, now),
            instrument_id: input.instrument_id,
            student: input.student,
            course: input.course,
            date: input.date.unwrap_or(stamp.date),
            time: stamp.time,
        };
        let outcome = ledger::check_out(
            &mut self.inventory,
            &mut self.history,
            &self.students,
            &req,
            &self.config.policy,
        )?;
        upsert_local_student(&mut self.students, &outcome.student);
        info!(
            instrument = %req.instrument_id,
            student = %outcome.student.name,
            "checked out"
        );

        if let Err(e) = self.store.update_inventory(&outcome.patch).await {
            error!(error = %e, instrument = %req.instrument_id, "checkout: inventory update failed");
        }
        if let Err(e) = self.store.insert_movement(&outcome.movement).await {
            error!(error = %e, movement = %outcome.movement.id, "checkout: history insert failed");
        }
        if let Err(e) = self
            .store
            .upsert_students(std::slice::from_ref(&outcome.student))
            .await
        {
            error!(error = %e, "checkout: student upsert failed");
        }
        Ok(outcome)
    }

    /// Bring an instrument back and complete its open movement.
    pub async fn check_in(
        &mut self,
        input: ReturnInput,
        now: DateTime<Utc>,
    ) -> Result<ReturnOutcome, LoanError> {
        let date = match input.date {
            Some(d) => d,
            None => local_stamp(now, &self.config.timezone)?.date,
        };
        let req = ReturnRequest {
            instrument_id: input.instrument_id,
            student: input.student,
            date,
        };
        let outcome = ledger::check_in(
            &mut self.inventory,
            &mut self.history,
            &req,
            &self.config.policy,
        )?;
        info!(instrument = %req.instrument_id, "returned");

        if let Err(e) = self.store.update_inventory(&outcome.patch).await {
            error!(error = %e, instrument = %req.instrument_id, "return: inventory update failed");
        }
        if let Some(movement) = &outcome.completed {
            if let Err(e) = self.store.update_movement(movement).await {
                error!(error = %e, movement = %movement.id, "return: history update failed");
            }
        }
        Ok(outcome)
    }

    /// Add a student (empty id) or update an existing one, then reload the
    /// directory.
    pub async fn save_student(&mut self, entry: StudentEntry) -> Result<(), SyncError> {
        if normalize(&entry.name).is_empty() {
            return Err(SyncError::MissingName);
        }
        let entry = directory_form(entry);
        if entry.id.is_empty() {
            self.store.insert_student(&entry).await?;
        } else {
            self.store.update_student(&entry).await?;
        }
        self.students = self.store.select_students().await?;
        Ok(())
    }

    pub async fn remove_student(&mut self, id: &str) -> Result<(), SyncError> {
        self.store.delete_student(id).await?;
        self.students = self.store.select_students().await?;
        Ok(())
    }

    /// Delete every instrument, locally and in the store, then reload.
    pub async fn clear_inventory(&mut self) -> Result<(), SyncError> {
        self.lifecycle.begin(SyncPhase::Clearing)?;
        let result = self.store.delete_all_inventory().await;
        if result.is_ok() {
            self.inventory.clear();
            info!("inventory cleared");
        }
        self.lifecycle.finish();

        let failed = self.pull().await;
        if !failed.is_empty() {
            warn!(?failed, "reload after clearing inventory was incomplete");
        }
        result.map_err(SyncError::from)
    }

    /// Delete the whole movement history.
    ///
    /// Gives up waiting after the configured timeout; the phase is then
    /// reset and the outcome of the store call is not tracked.
    pub async fn clear_history(&mut self) -> Result<ClearOutcome, SyncError> {
        self.lifecycle.begin(SyncPhase::Clearing)?;
        let limit = self.config.history_clear_timeout;
        let result = tokio::time::timeout(limit, self.store.delete_all_history()).await;
        self.lifecycle.finish();

        match result {
            Ok(Ok(())) => {
                self.history.clear();
                info!("history cleared");
                Ok(ClearOutcome::Cleared)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(timeout = ?limit, "clearing history timed out");
                Ok(ClearOutcome::TimedOut)
            }
        }
    }
}

fn apply<T>(
    local: &mut Vec<T>,
    fetched: Result<Vec<T>, StoreError>,
    table: Table,
    failed: &mut Vec<Table>,
) {
    match fetched {
        Ok(rows) => *local = rows,
        Err(e) => {
            warn!(%table, error = %e, "refresh failed");
            failed.push(table);
        }
    }
}

fn movement_id(instrument_id: &str, now: DateTime<Utc>) -> String {
    format!("mv-{}-{}", instrument_id, now.timestamp_millis())
}

/// Students pushed to the store on import: one per normalized name, the
/// last row's spelling and course winning.
fn student_uploads(inventory: &[InventoryRecord]) -> Vec<StudentEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, StudentEntry> = HashMap::new();
    for record in inventory {
        let Some(name) = record.student.as_deref() else {
            continue;
        };
        let key = normalize(name);
        if key.is_empty() {
            continue;
        }
        if !by_key.contains_key(&key) {
            order.push(key.clone());
        }
        by_key.insert(key, StudentEntry::registered(name, record.course.as_deref()));
    }
    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

/// Fold derived entries into the local directory without dropping anyone.
fn merge_directory(directory: &mut Vec<StudentEntry>, derived: Vec<StudentEntry>) {
    for entry in derived {
        match directory.iter_mut().find(|s| s.key() == entry.key()) {
            Some(existing) => {
                if existing.has_unknown_course() && !entry.has_unknown_course() {
                    existing.course = entry.course;
                }
            }
            None => directory.push(entry),
        }
    }
    directory.sort_by(|a, b| locale_cmp(&a.name, &b.name));
}

fn upsert_local_student(directory: &mut Vec<StudentEntry>, student: &StudentEntry) {
    match directory.iter_mut().find(|s| s.key() == student.key()) {
        Some(existing) => {
            existing.name = student.name.clone();
            existing.course = student.course.clone();
        }
        None => {
            directory.push(student.clone());
            directory.sort_by(|a, b| locale_cmp(&a.name, &b.name));
        }
    }
}

/// Directory spelling: names and course upper-cased, course defaulted.
fn directory_form(mut entry: StudentEntry) -> StudentEntry {
    entry.name = entry.name.trim().to_uppercase();
    entry.course = course_label(Some(&entry.course));
    entry.instrument = entry.instrument.map(|i| i.trim().to_uppercase());
    entry.parent_name = entry.parent_name.map(|p| p.trim().to_uppercase());
    entry
}

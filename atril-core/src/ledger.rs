//! Checkout and return transitions over the in-memory inventory and history.
//!
//! These functions validate the request, mutate local state and return the
//! changes that still have to be mirrored to the record store. They never
//! talk to the store themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::movement::{MovementRecord, MovementStatus, latest_open_index};
use crate::record::{Field, InventoryRecord};
use crate::student::{StudentEntry, course_label};
use crate::text::normalize;
use crate::time::{TimeError, checkout_period};

/// Value written to `Prestado` on checkout.
pub const LOANED_YES: &str = "SÍ";
/// Value written to `Prestado` on return.
pub const LOANED_NO: &str = "NO";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoanError {
    #[error("instrument {0} not found")]
    UnknownInstrument(String),
    #[error("instrument {0} is already checked out")]
    AlreadyLoaned(String),
    #[error("instrument {0} is not checked out")]
    NotLoaned(String),
    #[error("student name is required")]
    MissingStudent,
    #[error("student \"{0}\" is not registered; add them to the directory first")]
    UnregisteredStudent(String),
    #[error("instrument {0} is marked as loaned but has no student recorded")]
    NoRecordedStudent(String),
    #[error("instrument is assigned to \"{expected}\", not \"{given}\"")]
    StudentMismatch { expected: String, given: String },
    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Where instruments live when loaned and when stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPolicy {
    pub home_location: String,
    pub storage_location: String,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            home_location: "HOGAR".to_string(),
            storage_location: "SALA DE MÚSICA".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub instrument_id: String,
    pub student: String,
    /// Falls back to the student's directory course.
    pub course: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`
    pub time: String,
    pub movement_id: String,
}

#[derive(Debug, Clone)]
pub struct ReturnRequest {
    pub instrument_id: String,
    /// Must match the student recorded on the instrument.
    pub student: String,
    pub date: String,
}

/// Field changes of one inventory record, keyed by canonical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryPatch {
    pub id: String,
    #[serde(flatten)]
    pub changes: BTreeMap<Field, String>,
}

impl InventoryPatch {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            changes: BTreeMap::new(),
        }
    }

    fn set(mut self, field: Field, value: impl Into<String>) -> Self {
        self.changes.insert(field, value.into());
        self
    }

    pub fn apply(&self, record: &mut InventoryRecord) {
        for (field, value) in &self.changes {
            record.set(*field, value.clone());
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub patch: InventoryPatch,
    pub movement: MovementRecord,
    /// Directory upsert for the borrowing student.
    pub student: StudentEntry,
}

#[derive(Debug, Clone)]
pub struct ReturnOutcome {
    pub patch: InventoryPatch,
    /// The movement that was completed, if one was open.
    pub completed: Option<MovementRecord>,
}

fn find_mut<'a>(
    inventory: &'a mut [InventoryRecord],
    id: &str,
) -> Result<&'a mut InventoryRecord, LoanError> {
    inventory
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| LoanError::UnknownInstrument(id.to_string()))
}

/// Assign an instrument to a registered student.
///
/// Marks the record loaned and at home, and prepends an open movement to
/// `history` (newest first).
pub fn check_out(
    inventory: &mut [InventoryRecord],
    history: &mut Vec<MovementRecord>,
    directory: &[StudentEntry],
    req: &CheckoutRequest,
    policy: &LoanPolicy,
) -> Result<CheckoutOutcome, LoanError> {
    let student = req.student.trim();
    if normalize(student).is_empty() {
        return Err(LoanError::MissingStudent);
    }
    let registered = directory
        .iter()
        .find(|s| s.matches_name(student))
        .ok_or_else(|| LoanError::UnregisteredStudent(student.to_string()))?;

    let (month, year) = checkout_period(&req.date)?;

    let record = find_mut(inventory, &req.instrument_id)?;
    if record.is_loaned() {
        return Err(LoanError::AlreadyLoaned(req.instrument_id.clone()));
    }

    // Inventory, history and directory all store the upper-cased spelling.
    let student = student.to_uppercase();
    let course = match req.course.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c.to_uppercase(),
        _ => registered.course.to_uppercase(),
    };

    let patch = InventoryPatch::new(&record.id)
        .set(Field::Estudiante, student.as_str())
        .set(Field::Curso, course.as_str())
        .set(Field::Prestado, LOANED_YES)
        .set(Field::Ubicacion, policy.home_location.as_str())
        .set(Field::FechaSalida, req.date.as_str())
        .set(Field::HoraSalida, req.time.as_str());
    patch.apply(record);

    let movement = MovementRecord {
        id: req.movement_id.clone(),
        instrument_id: record.id.clone(),
        instrument_name: record.instrument_name().to_string(),
        serial: record.serial.clone().unwrap_or_default(),
        brand: record.brand.clone().unwrap_or_default(),
        student: student.clone(),
        course: course.clone(),
        checkout_date: req.date.clone(),
        checkout_time: req.time.clone(),
        return_date: None,
        status: MovementStatus::CheckedOut,
        month,
        year,
    };
    history.insert(0, movement.clone());

    let mut entry = registered.clone();
    entry.name = student;
    entry.course = course_label(Some(&course));

    Ok(CheckoutOutcome {
        patch,
        movement,
        student: entry,
    })
}

/// Bring an instrument back to storage.
///
/// Clears student and course, resets the loan flag and location, and
/// completes the latest open movement for the instrument (and no other).
pub fn check_in(
    inventory: &mut [InventoryRecord],
    history: &mut [MovementRecord],
    req: &ReturnRequest,
    policy: &LoanPolicy,
) -> Result<ReturnOutcome, LoanError> {
    let record = find_mut(inventory, &req.instrument_id)?;
    if !record.is_loaned() {
        return Err(LoanError::NotLoaned(req.instrument_id.clone()));
    }

    let expected = record.student.clone().unwrap_or_default();
    if normalize(&expected).is_empty() {
        return Err(LoanError::NoRecordedStudent(req.instrument_id.clone()));
    }
    if normalize(&expected) != normalize(&req.student) {
        return Err(LoanError::StudentMismatch {
            expected,
            given: req.student.trim().to_string(),
        });
    }

    let patch = InventoryPatch::new(&record.id)
        .set(Field::Prestado, LOANED_NO)
        .set(Field::Ubicacion, policy.storage_location.as_str())
        .set(Field::FechaRetorno, req.date.as_str())
        .set(Field::Estudiante, "")
        .set(Field::Curso, "");
    patch.apply(record);

    let completed = latest_open_index(history, &req.instrument_id).map(|i| {
        history[i].complete(&req.date);
        history[i].clone()
    });

    Ok(ReturnOutcome { patch, completed })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory() -> Vec<InventoryRecord> {
        vec![
            InventoryRecord::new("1")
                .with(Field::Instrumento, "Violín 1/2")
                .with(Field::Serie, "V-100")
                .with(Field::Marca, "Stentor")
                .with(Field::Prestado, "NO"),
            InventoryRecord::new("2").with(Field::Instrumento, "Cello 4/4"),
        ]
    }

    fn directory() -> Vec<StudentEntry> {
        vec![StudentEntry::registered("Ana Pérez", Some("5to básico"))]
    }

    fn checkout(id: &str, student: &str) -> CheckoutRequest {
        CheckoutRequest {
            instrument_id: id.to_string(),
            student: student.to_string(),
            course: None,
            date: "2026-04-10".to_string(),
            time: "15:20".to_string(),
            movement_id: format!("mv-{id}"),
        }
    }

    #[test]
    fn test_checkout_then_return_roundtrip() {
        let mut inv = inventory();
        let mut history = Vec::new();
        let policy = LoanPolicy::default();

        let out = check_out(&mut inv, &mut history, &directory(), &checkout("1", "ana perez"), &policy).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_open());
        assert_eq!(history[0].month, 3);
        assert_eq!(history[0].serial, "V-100");
        assert!(inv[0].is_loaned());
        assert_eq!(inv[0].location.as_deref(), Some("HOGAR"));
        assert_eq!(inv[0].course.as_deref(), Some("5TO BÁSICO"));
        assert_eq!(out.student.name, "ANA PEREZ");
        assert_eq!(inv[0].student.as_deref(), Some("ANA PEREZ"));
        assert_eq!(history[0].student, "ANA PEREZ");
        assert_eq!(history[0].course, "5TO BÁSICO");
        assert_eq!(out.patch.changes.len(), 6);

        let ret = ReturnRequest {
            instrument_id: "1".to_string(),
            student: "Ana Perez".to_string(),
            date: "2026-04-17".to_string(),
        };
        let back = check_in(&mut inv, &mut history, &ret, &policy).unwrap();
        let completed = back.completed.unwrap();
        assert_eq!(completed.id, "mv-1");
        assert_eq!(history[0].status, MovementStatus::Completed);
        assert_eq!(history[0].return_date.as_deref(), Some("2026-04-17"));
        assert!(!inv[0].is_loaned());
        assert_eq!(inv[0].location.as_deref(), Some("SALA DE MÚSICA"));
        assert_eq!(inv[0].student.as_deref(), Some(""));
        assert_eq!(inv[0].course.as_deref(), Some(""));
    }

    #[test]
    fn test_return_completes_only_latest_open_movement() {
        let mut inv = inventory();
        let mut history = Vec::new();
        let policy = LoanPolicy::default();
        check_out(&mut inv, &mut history, &directory(), &checkout("1", "Ana Pérez"), &policy).unwrap();
        // A stale open movement from an older import for the same instrument.
        let mut stale = history[0].clone();
        stale.id = "mv-old".to_string();
        history.push(stale);

        let ret = ReturnRequest {
            instrument_id: "1".to_string(),
            student: "ANA PÉREZ".to_string(),
            date: "2026-04-11".to_string(),
        };
        check_in(&mut inv, &mut history, &ret, &policy).unwrap();
        assert_eq!(history[0].status, MovementStatus::Completed);
        assert_eq!(history[1].status, MovementStatus::CheckedOut);
    }

    #[test]
    fn test_checkout_validation() {
        let mut inv = inventory();
        let mut history = Vec::new();
        let policy = LoanPolicy::default();
        let dir = directory();

        let err = check_out(&mut inv, &mut history, &dir, &checkout("1", "Pedro"), &policy).unwrap_err();
        assert_eq!(err, LoanError::UnregisteredStudent("Pedro".to_string()));

        let err = check_out(&mut inv, &mut history, &dir, &checkout("99", "Ana Pérez"), &policy).unwrap_err();
        assert_eq!(err, LoanError::UnknownInstrument("99".to_string()));

        let mut bad_date = checkout("1", "Ana Pérez");
        bad_date.date = "10/04/2026".to_string();
        let err = check_out(&mut inv, &mut history, &dir, &bad_date, &policy).unwrap_err();
        assert!(matches!(err, LoanError::Time(TimeError::InvalidDate(_))));

        check_out(&mut inv, &mut history, &dir, &checkout("1", "Ana Pérez"), &policy).unwrap();
        let err = check_out(&mut inv, &mut history, &dir, &checkout("1", "Ana Pérez"), &policy).unwrap_err();
        assert_eq!(err, LoanError::AlreadyLoaned("1".to_string()));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_return_validation() {
        let mut inv = inventory();
        let mut history = Vec::new();
        let policy = LoanPolicy::default();
        let ret = |student: &str, id: &str| ReturnRequest {
            instrument_id: id.to_string(),
            student: student.to_string(),
            date: "2026-04-12".to_string(),
        };

        let err = check_in(&mut inv, &mut history, &ret("Ana", "2"), &policy).unwrap_err();
        assert_eq!(err, LoanError::NotLoaned("2".to_string()));

        check_out(&mut inv, &mut history, &directory(), &checkout("1", "Ana Pérez"), &policy).unwrap();
        let err = check_in(&mut inv, &mut history, &ret("Bruno", "1"), &policy).unwrap_err();
        assert!(matches!(err, LoanError::StudentMismatch { .. }));
        assert!(inv[0].is_loaned());
    }

    #[test]
    fn test_checkout_upper_cases_explicit_course() {
        let mut inv = inventory();
        let mut history = Vec::new();
        let mut req = checkout("2", "ana perez");
        req.course = Some(" 5b ".to_string());
        let out = check_out(&mut inv, &mut history, &directory(), &req, &LoanPolicy::default()).unwrap();
        assert_eq!(inv[1].student.as_deref(), Some("ANA PEREZ"));
        assert_eq!(inv[1].course.as_deref(), Some("5B"));
        assert_eq!(out.movement.course, "5B");
        assert_eq!(out.patch.changes[&Field::Curso], "5B");
        assert_eq!(out.student.course, "5B");
    }

    #[test]
    fn test_return_requires_a_recorded_student() {
        let mut inv = vec![InventoryRecord::new("7").with(Field::Instrumento, "Tuba").with(Field::Prestado, "SI")];
        let mut history = Vec::new();
        let ret = ReturnRequest {
            instrument_id: "7".to_string(),
            student: String::new(),
            date: "2026-04-12".to_string(),
        };
        let err = check_in(&mut inv, &mut history, &ret, &LoanPolicy::default()).unwrap_err();
        assert_eq!(err, LoanError::NoRecordedStudent("7".to_string()));
        assert!(inv[0].is_loaned());
    }
}

//! Turns mapped rows into the inventory snapshot and the student directory.

use std::collections::HashMap;

use atril_core::text::{is_blank, locale_cmp, normalize};
use atril_core::{InventoryRecord, StudentEntry, infer_family};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Fill a blank `Familia` from the instrument name.
    pub infer_family: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub inventory: Vec<InventoryRecord>,
    pub students: Vec<StudentEntry>,
}

/// Build the inventory and the student directory from mapped records.
///
/// Records that are not present are dropped and the survivors get dense
/// 1-based ids in sheet order, so local and persisted snapshots agree.
pub fn reconcile(mapped: Vec<InventoryRecord>, opts: ReconcileOptions) -> Reconciled {
    let before = mapped.len();
    let inventory: Vec<InventoryRecord> = mapped
        .into_iter()
        .filter(InventoryRecord::is_present)
        .enumerate()
        .map(|(i, mut record)| {
            record.id = (i + 1).to_string();
            if opts.infer_family && is_blank(record.family.as_deref()) {
                if let Some(name) = record.instrument.as_deref() {
                    record.family = Some(infer_family(name).to_string());
                }
            }
            record
        })
        .collect();
    if inventory.len() != before {
        debug!(dropped = before - inventory.len(), "dropped rows that are not inventory");
    }

    let students = student_directory(&inventory);
    info!(
        instruments = inventory.len(),
        students = students.len(),
        "reconciled inventory"
    );
    Reconciled {
        inventory,
        students,
    }
}

/// One entry per distinct normalized student name.
///
/// The first course seen wins, except that a later row may replace the
/// `SIN CURSO` placeholder.
pub fn student_directory(inventory: &[InventoryRecord]) -> Vec<StudentEntry> {
    let mut by_key: HashMap<String, StudentEntry> = HashMap::new();
    for record in inventory {
        let Some(raw) = record.student.as_deref() else {
            continue;
        };
        let key = normalize(raw);
        if key.is_empty() {
            continue;
        }
        let replace = by_key.get(&key).is_none_or(StudentEntry::has_unknown_course);
        if replace {
            by_key.insert(key, StudentEntry::derived(raw, record.course.as_deref()));
        }
    }

    let mut students: Vec<StudentEntry> = by_key.into_values().collect();
    students.sort_by(|a, b| locale_cmp(&a.name, &b.name));
    students
}

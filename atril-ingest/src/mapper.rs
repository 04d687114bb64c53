//! Column mapping: spreadsheet headers onto canonical inventory fields.
//!
//! Per column: an exact alias match wins over a substring match, fields are
//! tried in table order, and anything that cannot claim a field slot goes to
//! the record's `metadata` overflow under its original header.

use std::collections::HashMap;

use atril_core::text::normalize;
use atril_core::{Field, InventoryRecord};
use tracing::{debug, trace};

use crate::aliases::NORMALIZED_ALIASES;
use crate::types::SheetRow;

/// Header tokens that always mean the student column.
const STUDENT_TOKENS: &[&str] = &["estudiante", "alumno"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Exact,
    Substring,
}

fn exact_match(header: &str) -> Option<Field> {
    NORMALIZED_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| a == header))
        .map(|(field, _)| *field)
}

fn substring_match(header: &str) -> Option<Field> {
    let field = NORMALIZED_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|a| header.contains(a.as_str())))
        .map(|(field, _)| *field)?;

    // "alumno"/"estudiante" must not be shadowed by an earlier field whose
    // alias also occurs in the header (e.g. "estado del alumno").
    if STUDENT_TOKENS.iter().any(|t| header.contains(t)) {
        Some(Field::Estudiante)
    } else {
        Some(field)
    }
}

/// Which canonical field a header feeds, if any.
fn resolve(header: &str) -> Option<(Field, MatchKind)> {
    let norm = normalize(header);
    if let Some(field) = exact_match(&norm) {
        return Some((field, MatchKind::Exact));
    }
    substring_match(&norm).map(|field| (field, MatchKind::Substring))
}

/// Map one sheet row; the record id is the row index.
pub fn map_row(row: &SheetRow, index: usize) -> InventoryRecord {
    let mut record = InventoryRecord::new(index.to_string());
    // Header that currently owns each filled slot.
    let mut owners: HashMap<Field, (String, MatchKind)> = HashMap::new();

    for (header, value) in row.cells() {
        let Some((field, kind)) = resolve(header) else {
            trace!(header, "unmapped column");
            record.metadata.insert(header.to_string(), value.to_string());
            continue;
        };

        let slot_empty = record.get(field).is_none_or(str::is_empty);
        if slot_empty || kind == MatchKind::Exact {
            // An exact header displaces a previous owner; keep its value.
            if let Some((prev_header, _)) = owners.get(&field) {
                let prev = record.get(field).unwrap_or_default().to_string();
                debug!(%field, displaced = %prev_header, by = header, "column displaced");
                record.metadata.insert(prev_header.clone(), prev);
            }
            record.set(field, value);
            owners.insert(field, (header.to_string(), kind));
        } else {
            trace!(header, %field, "slot taken, diverted to metadata");
            record.metadata.insert(header.to_string(), value.to_string());
        }
    }

    record
}

/// Map every row and drop rows that are not inventory: no instrument and
/// no student, or a "total" footer.
pub fn map_rows(rows: &[SheetRow]) -> Vec<InventoryRecord> {
    let mapped: Vec<InventoryRecord> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row, map_row(row, i)))
        .filter(|(row, record)| {
            let keep = record.is_present();
            if !keep {
                trace!(line = row.line(), "dropping row without instrument or student");
            }
            keep
        })
        .map(|(_, record)| record)
        .collect();
    debug!(rows = rows.len(), kept = mapped.len(), "mapped sheet rows");
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> SheetRow {
        SheetRow::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_exact_headers() {
        let r = map_row(
            &row(&[
                ("Instrumento", "Violín 1/2"),
                ("MARCA", "Stentor"),
                ("Nro. de Serie", "S-001"),
                ("Fecha de Salida", "2026-03-01"),
            ]),
            4,
        );
        assert_eq!(r.id, "4");
        assert_eq!(r.instrument.as_deref(), Some("Violín 1/2"));
        assert_eq!(r.brand.as_deref(), Some("Stentor"));
        assert_eq!(r.serial.as_deref(), Some("S-001"));
        assert_eq!(r.checkout_date.as_deref(), Some("2026-03-01"));
        assert!(r.metadata.is_empty());
    }

    #[test]
    fn test_substring_fallback_and_overflow() {
        let r = map_row(
            &row(&[
                ("Marca del fabricante", "Yamaha"),
                ("Color", "Negro"),
                ("Sala asignada", "B-12"),
            ]),
            0,
        );
        assert_eq!(r.brand.as_deref(), Some("Yamaha"));
        assert_eq!(r.location.as_deref(), Some("B-12"));
        assert_eq!(r.metadata.get("Color").map(String::as_str), Some("Negro"));
    }

    #[test]
    fn test_exact_wins_regardless_of_column_order() {
        for pairs in [
            [("Monitor", "Marta"), ("Monitor Asignado Secundario", "Pablo")],
            [("Monitor Asignado Secundario", "Pablo"), ("Monitor", "Marta")],
        ] {
            let r = map_row(&row(&pairs), 0);
            assert_eq!(r.monitor.as_deref(), Some("Marta"));
            assert_eq!(
                r.metadata.get("Monitor Asignado Secundario").map(String::as_str),
                Some("Pablo")
            );
        }
    }

    #[test]
    fn test_second_substring_match_is_diverted() {
        let r = map_row(&row(&[("Marca principal", "A"), ("Marca alternativa", "B")]), 0);
        assert_eq!(r.brand.as_deref(), Some("A"));
        assert_eq!(r.metadata.get("Marca alternativa").map(String::as_str), Some("B"));
    }

    #[test]
    fn test_student_tokens_force_student_field() {
        let r = map_row(&row(&[("Alumno de refuerzo", "Ana")]), 0);
        assert_eq!(r.student.as_deref(), Some("Ana"));

        // "estado" is an earlier alias that also occurs in the header.
        let r = map_row(&row(&[("Estado del alumno", "Luis"), ("Estado", "Bueno")]), 0);
        assert_eq!(r.student.as_deref(), Some("Luis"));
        assert_eq!(r.condition.as_deref(), Some("Bueno"));

        let r = map_row(&row(&[("Instrumento del estudiante", "Cello")]), 0);
        assert_eq!(r.student.as_deref(), Some("Cello"));
        assert!(r.instrument.is_none());
    }

    #[test]
    fn test_nombre_alias_priority() {
        // "nombre del instrumento" is an exact Instrumento alias even though
        // "nombre" alone is a student alias.
        let r = map_row(&row(&[("Nombre del Instrumento", "Oboe"), ("Nombre", "Sofía")]), 0);
        assert_eq!(r.instrument.as_deref(), Some("Oboe"));
        assert_eq!(r.student.as_deref(), Some("Sofía"));
    }

    #[test]
    fn test_map_rows_filters_footer_and_empty_rows() {
        let rows = vec![
            row(&[("Instrumento", "Flauta")]),
            row(&[("Observaciones", "fila vacía")]),
            row(&[("Instrumento", "Total:"), ("Marca", "12")]),
            row(&[("Estudiante", "Ana")]),
        ];
        let mapped = map_rows(&rows);
        let ids: Vec<&str> = mapped.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "3"]);
    }
}

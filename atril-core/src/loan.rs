//! Interpretation of the free-text `Prestado` column.

use crate::text::normalize;

const LOANED_VALUES: &[&str] = &["si", "yes", "prestado", "en casa", "hogar", "salida"];

/// True when the cell says the instrument is currently checked out.
///
/// Exact match on the normalized text: "Hogar" is loaned, "en el hogar del
/// alumno" is not.
pub fn is_loaned(value: &str) -> bool {
    let v = normalize(value);
    LOANED_VALUES.contains(&v.as_str())
}

pub fn is_loaned_opt(value: Option<&str>) -> bool {
    value.is_some_and(is_loaned)
}

//! Student directory entries.

use serde::{Deserialize, Serialize};

use crate::serde_ids::{de_null_string, de_opt_id};
use crate::text::{normalize, title_case};

/// Course label used when a row names a student but no course.
pub const UNKNOWN_COURSE: &str = "SIN CURSO";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentEntry {
    /// Normalized name for derived entries; the store's own key otherwise.
    #[serde(default, skip_serializing_if = "String::is_empty", deserialize_with = "de_opt_id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub course: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_phone: Option<String>,
}

impl StudentEntry {
    /// Entry derived from an inventory row: title-cased normalized name,
    /// upper-cased course (or [`UNKNOWN_COURSE`]).
    pub fn derived(raw_name: &str, raw_course: Option<&str>) -> Self {
        let key = normalize(raw_name);
        Self {
            name: title_case(&key),
            course: course_label(raw_course),
            id: key,
            ..Default::default()
        }
    }

    /// Entry as staff register it: names and course stored upper-case.
    pub fn registered(name: &str, course: Option<&str>) -> Self {
        Self {
            id: normalize(name),
            name: name.trim().to_uppercase(),
            course: course_label(course),
            ..Default::default()
        }
    }

    /// Dedup key: the normalized name.
    pub fn key(&self) -> String {
        normalize(&self.name)
    }

    pub fn has_unknown_course(&self) -> bool {
        self.course == UNKNOWN_COURSE
    }

    /// Same person, ignoring case and accents.
    pub fn matches_name(&self, name: &str) -> bool {
        self.key() == normalize(name)
    }
}

/// Upper-cased course, or [`UNKNOWN_COURSE`] when blank.
pub fn course_label(course: Option<&str>) -> String {
    match course.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_uppercase(),
        _ => UNKNOWN_COURSE.to_string(),
    }
}

/// True when `name` belongs to a student in `directory`.
pub fn is_registered(directory: &[StudentEntry], name: &str) -> bool {
    let key = normalize(name);
    !key.is_empty() && directory.iter().any(|s| s.key() == key)
}

/// Directory search by name or instrument.
pub fn search_students<'a>(directory: &'a [StudentEntry], term: &str) -> Vec<&'a StudentEntry> {
    let term = normalize(term);
    directory
        .iter()
        .filter(|s| {
            term.is_empty()
                || normalize(&s.name).contains(&term)
                || s.instrument.as_deref().is_some_and(|i| normalize(i).contains(&term))
        })
        .collect()
}

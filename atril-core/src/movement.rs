//! Checkout/return history (append-only movement log).

use serde::{Deserialize, Serialize};

use crate::serde_ids::{de_id, de_null_string};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementStatus {
    #[serde(rename = "en_prestamo")]
    CheckedOut,
    #[serde(rename = "completado")]
    Completed,
}

impl MovementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::CheckedOut => "en_prestamo",
            MovementStatus::Completed => "completado",
        }
    }
}

/// One checkout, completed later by the matching return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_id")]
    pub instrument_id: String,
    #[serde(default, deserialize_with = "de_null_string")]
    pub instrument_name: String,
    #[serde(rename = "serie", default, deserialize_with = "de_null_string")]
    pub serial: String,
    #[serde(rename = "marca", default, deserialize_with = "de_null_string")]
    pub brand: String,
    #[serde(rename = "estudiante", default, deserialize_with = "de_null_string")]
    pub student: String,
    #[serde(rename = "curso", default, deserialize_with = "de_null_string")]
    pub course: String,
    #[serde(rename = "fechaSalida")]
    pub checkout_date: String,
    #[serde(rename = "horaSalida", default, deserialize_with = "de_null_string")]
    pub checkout_time: String,
    #[serde(rename = "fechaRetorno", default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    pub status: MovementStatus,
    /// Month of the checkout, 0-11.
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "anio")]
    pub year: i32,
}

impl MovementRecord {
    pub fn is_open(&self) -> bool {
        self.status == MovementStatus::CheckedOut
    }

    /// Close this movement with the given return date.
    pub fn complete(&mut self, return_date: &str) {
        self.status = MovementStatus::Completed;
        self.return_date = Some(return_date.to_string());
    }
}

/// Most recent open movement for an instrument.
///
/// History is kept newest-first, so the first open match is the latest one.
pub fn latest_open_index(history: &[MovementRecord], instrument_id: &str) -> Option<usize> {
    history
        .iter()
        .position(|m| m.instrument_id == instrument_id && m.is_open())
}

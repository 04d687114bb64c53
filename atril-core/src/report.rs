//! Monthly movement report.

use serde::Serialize;

use crate::movement::{MovementRecord, MovementStatus};

pub const MONTH_NAMES: [&str; 12] = [
    "Enero", "Febrero", "Marzo", "Abril", "Mayo", "Junio", "Julio", "Agosto", "Septiembre",
    "Octubre", "Noviembre", "Diciembre",
];

/// Movements whose checkout fell in one month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport<'a> {
    /// 0-11
    pub month: u32,
    pub year: i32,
    pub checkouts: usize,
    pub completed: usize,
    pub pending: usize,
    pub movements: Vec<&'a MovementRecord>,
}

impl<'a> MonthlyReport<'a> {
    /// Build the report; `status` narrows the listed movements but not the
    /// counters.
    pub fn build(
        history: &'a [MovementRecord],
        month: u32,
        year: i32,
        status: Option<MovementStatus>,
    ) -> Self {
        let monthly: Vec<&MovementRecord> = history
            .iter()
            .filter(|m| m.month == month && m.year == year)
            .collect();
        let checkouts = monthly.len();
        let completed = monthly
            .iter()
            .filter(|m| m.status == MovementStatus::Completed)
            .count();
        let movements = match status {
            Some(s) => monthly.into_iter().filter(|m| m.status == s).collect(),
            None => monthly,
        };

        Self {
            month,
            year,
            checkouts,
            completed,
            pending: checkouts - completed,
            movements,
        }
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES.get(self.month as usize).copied().unwrap_or("?")
    }

    /// File name used when the report is saved.
    pub fn file_stem(&self) -> String {
        format!("reporte mensual {} {}", self.month_name().to_lowercase(), self.year)
    }
}

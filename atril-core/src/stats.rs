//! Dashboard aggregates over the inventory.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::condition::ConditionCategory;
use crate::record::InventoryRecord;
use crate::text::is_blank;

pub const NO_FAMILY: &str = "SIN CATEGORÍA";
pub const NO_MONITOR: &str = "SIN MONITOR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InventoryStats {
    pub total: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
    pub loaned: usize,
    pub by_family: BTreeMap<String, usize>,
    pub by_monitor: BTreeMap<String, usize>,
}

impl InventoryStats {
    pub fn compute(records: &[InventoryRecord]) -> Self {
        let mut stats = InventoryStats {
            total: records.len(),
            ..Default::default()
        };

        for r in records {
            match r.condition_category() {
                ConditionCategory::Good => stats.good += 1,
                ConditionCategory::Fair => stats.fair += 1,
                ConditionCategory::Poor => stats.poor += 1,
            }
            if r.is_loaned() {
                stats.loaned += 1;
            }
            *stats
                .by_family
                .entry(label_or(r.family.as_deref(), NO_FAMILY))
                .or_insert(0) += 1;
            *stats
                .by_monitor
                .entry(label_or(r.monitor.as_deref(), NO_MONITOR))
                .or_insert(0) += 1;
        }

        stats
    }

    /// Instruments that need repair.
    pub fn needs_repair(&self) -> usize {
        self.poor
    }

    pub fn count(&self, category: ConditionCategory) -> usize {
        match category {
            ConditionCategory::Good => self.good,
            ConditionCategory::Fair => self.fair,
            ConditionCategory::Poor => self.poor,
        }
    }
}

fn label_or(value: Option<&str>, fallback: &str) -> String {
    if is_blank(value) {
        fallback.to_string()
    } else {
        value.unwrap_or_default().to_string()
    }
}

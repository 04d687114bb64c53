//! Inventory search and detail-view filters.

use crate::condition::ConditionCategory;
use crate::record::InventoryRecord;
use crate::student::StudentEntry;
use crate::text::{locale_cmp, normalize, normalize_opt};

/// Coarse filter applied before the free-text search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewFilter {
    #[default]
    All,
    /// Records whose monitor equals this name after normalization.
    Monitor(String),
    Loaned,
    Condition(ConditionCategory),
}

impl ViewFilter {
    pub fn matches(&self, record: &InventoryRecord) -> bool {
        match self {
            ViewFilter::All => true,
            ViewFilter::Monitor(name) => normalize_opt(record.monitor.as_deref()) == normalize(name),
            ViewFilter::Loaned => record.is_loaned(),
            ViewFilter::Condition(category) => record.condition_category() == *category,
        }
    }
}

/// Normalized text searched by [`filter`].
pub fn haystack(record: &InventoryRecord) -> String {
    let parts = [
        &record.instrument,
        &record.brand,
        &record.model,
        &record.student,
        &record.monitor,
        &record.serial,
        &record.location,
        &record.family,
    ];
    let joined = parts
        .iter()
        .map(|p| p.as_deref().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ");
    normalize(joined)
}

fn by_instrument(a: &&InventoryRecord, b: &&InventoryRecord) -> std::cmp::Ordering {
    locale_cmp(a.instrument_name(), b.instrument_name())
}

/// View filter, then substring search, then sort by instrument name.
///
/// The input slice is left untouched.
pub fn filter<'a>(
    records: &'a [InventoryRecord],
    term: &str,
    view: &ViewFilter,
) -> Vec<&'a InventoryRecord> {
    let term = normalize(term);
    let mut out: Vec<&InventoryRecord> = records
        .iter()
        .filter(|r| view.matches(r))
        .filter(|r| term.is_empty() || haystack(r).contains(&term))
        .collect();
    out.sort_by(by_instrument);
    out
}

/// Direction of the checkout screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Lending: only instruments currently in storage.
    Out,
    /// Returning: only instruments currently loaned.
    In,
}

pub const CHECKOUT_RESULT_LIMIT: usize = 15;

/// Instrument picker for the checkout/return screen.
pub fn checkout_candidates<'a>(
    records: &'a [InventoryRecord],
    term: &str,
    mode: CheckoutMode,
) -> Vec<&'a InventoryRecord> {
    let term = normalize(term);
    if term.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| match mode {
            CheckoutMode::Out => !r.is_loaned(),
            CheckoutMode::In => r.is_loaned(),
        })
        .filter(|r| {
            [&r.instrument, &r.student, &r.brand, &r.serial, &r.model]
                .iter()
                .any(|f| normalize_opt(f.as_deref()).contains(&term))
        })
        .take(CHECKOUT_RESULT_LIMIT)
        .collect()
}

/// Directory entries of students who currently hold an instrument.
pub fn loaned_students<'a>(
    records: &[InventoryRecord],
    directory: &'a [StudentEntry],
) -> Vec<&'a StudentEntry> {
    let holders: std::collections::HashSet<String> = records
        .iter()
        .filter(|r| r.is_loaned())
        .map(|r| normalize_opt(r.student.as_deref()))
        .filter(|n| !n.is_empty())
        .collect();
    directory.iter().filter(|s| holders.contains(&s.key())).collect()
}

//! Deterministic condition categories from free-text `Estado` descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::normalize;

/// Coarse condition bucket used by statistics and detail views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConditionCategory {
    #[serde(rename = "BUENO")]
    Good,
    #[serde(rename = "REGULAR")]
    Fair,
    #[serde(rename = "MALO")]
    Poor,
}

impl ConditionCategory {
    pub const ALL: [ConditionCategory; 3] = [Self::Good, Self::Fair, Self::Poor];

    /// Display label as staff write it on the sheet.
    pub fn label(&self) -> &'static str {
        match self {
            ConditionCategory::Good => "BUENO",
            ConditionCategory::Fair => "REGULAR",
            ConditionCategory::Poor => "MALO",
        }
    }
}

impl fmt::Display for ConditionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const GOOD_KEYWORDS: &[&str] = &["bueno", "excelente", "bien", "optimo", "nuevo"];
const POOR_KEYWORDS: &[&str] = &["malo", "reparacion", "danado", "roto", "mal"];
const FAIR_KEYWORDS: &[&str] = &["regular", "ajuste", "mantencion"];

/// Classify a condition description.
/// Priority: good keywords > poor keywords > fair keywords > good.
pub fn classify(condition: &str) -> ConditionCategory {
    let s = normalize(condition);
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| s.contains(k));

    if has_any(GOOD_KEYWORDS) {
        return ConditionCategory::Good;
    }
    if has_any(POOR_KEYWORDS) {
        return ConditionCategory::Poor;
    }
    if has_any(FAIR_KEYWORDS) {
        return ConditionCategory::Fair;
    }
    ConditionCategory::Good
}

/// [`classify`] for an optional cell; a missing condition counts as good.
pub fn classify_opt(condition: Option<&str>) -> ConditionCategory {
    classify(condition.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_good() {
        assert_eq!(classify(""), ConditionCategory::Good);
        assert_eq!(classify("sin información"), ConditionCategory::Good);
        assert_eq!(classify_opt(None), ConditionCategory::Good);
    }

    #[test]
    fn test_keyword_buckets() {
        assert_eq!(classify("Necesita Reparación"), ConditionCategory::Poor);
        assert_eq!(classify("DAÑADO"), ConditionCategory::Poor);
        assert_eq!(classify("Ajuste menor"), ConditionCategory::Fair);
        assert_eq!(classify("Mantención pendiente"), ConditionCategory::Fair);
        assert_eq!(classify("Óptimo"), ConditionCategory::Good);
    }

    #[test]
    fn test_good_checked_before_poor() {
        assert_eq!(classify("bien, pero puente mal pegado"), ConditionCategory::Good);
        assert_eq!(classify("Bueno, estuche dañado"), ConditionCategory::Good);
        assert_eq!(classify("Nuevo, puente mal pegado"), ConditionCategory::Good);
        assert_eq!(classify("Regular, puente roto"), ConditionCategory::Poor);
    }

    #[test]
    fn test_labels_roundtrip_through_serde() {
        let json = serde_json::to_string(&ConditionCategory::Fair).unwrap();
        assert_eq!(json, "\"REGULAR\"");
        assert_eq!(ConditionCategory::Poor.to_string(), "MALO");
    }
}

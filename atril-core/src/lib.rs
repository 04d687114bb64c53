//! atril-core: inventory model, text normalization and loan rules for the
//! orchestra instrument tracker.

pub mod condition;
pub mod family;
pub mod ledger;
pub mod lifecycle;
pub mod loan;
pub mod movement;
pub mod record;
pub mod report;
pub mod search;
pub mod stats;
pub mod student;
pub mod text;
pub mod time;

mod serde_ids;

pub use condition::{ConditionCategory, classify};
pub use family::infer_family;
pub use ledger::{
    CheckoutOutcome, CheckoutRequest, InventoryPatch, LoanError, LoanPolicy, ReturnOutcome,
    ReturnRequest, check_in, check_out,
};
pub use lifecycle::{Lifecycle, LifecycleError, SyncPhase};
pub use loan::is_loaned;
pub use movement::{MovementRecord, MovementStatus};
pub use record::{Field, InventoryRecord};
pub use report::MonthlyReport;
pub use search::{CheckoutMode, ViewFilter, checkout_candidates, filter, loaned_students};
pub use stats::InventoryStats;
pub use student::{StudentEntry, UNKNOWN_COURSE};
pub use text::normalize;

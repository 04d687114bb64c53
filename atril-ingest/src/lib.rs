//! atril-ingest: spreadsheet ingestion. Reads sheet rows, maps loosely named
//! columns onto canonical inventory fields and derives the student directory.

pub mod aliases;
pub mod export;
pub mod mapper;
pub mod reader;
pub mod reconcile;
pub mod types;

pub use aliases::FIELD_ALIASES;
pub use export::write_inventory_csv;
pub use mapper::{map_row, map_rows};
pub use reader::{read_sheet, read_sheet_from};
pub use reconcile::{ReconcileOptions, Reconciled, reconcile};
pub use types::SheetRow;

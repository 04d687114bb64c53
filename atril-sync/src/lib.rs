//! atril-sync: record-store clients and the application session that keeps
//! the local inventory, history and student directory in step with them.

pub mod error;
pub mod file;
pub mod http;
pub mod memory;
pub mod session;
pub mod store;

pub use error::{ImportError, ImportStage, StoreError, SyncError};
pub use file::FileStore;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use session::{
    CheckoutInput, ClearOutcome, ImportReport, RefreshOutcome, ReturnInput, Session,
    SessionConfig,
};
pub use store::{Snapshot, Store, Table};

//! Sync lifecycle of the application state.
//!
//! Destructive operations (import, clear) and the periodic refresh must not
//! overlap: a refresh that lands mid-deletion would put stale rows back.
//! Every operation enters a phase from `Idle` and returns to `Idle` when done.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SyncPhase {
    #[default]
    Idle,
    Importing,
    Clearing,
    Syncing,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Importing => "importing",
            SyncPhase::Clearing => "clearing",
            SyncPhase::Syncing => "syncing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot start {requested} while {current}")]
pub struct LifecycleError {
    pub current: SyncPhase,
    pub requested: SyncPhase,
}

/// Single owner of the current phase.
#[derive(Debug, Default)]
pub struct Lifecycle {
    phase: SyncPhase,
}

impl Lifecycle {
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == SyncPhase::Idle
    }

    /// Enter `next`; only allowed from `Idle`.
    pub fn begin(&mut self, next: SyncPhase) -> Result<(), LifecycleError> {
        if next == SyncPhase::Idle || self.phase != SyncPhase::Idle {
            return Err(LifecycleError {
                current: self.phase,
                requested: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Return to `Idle` from any phase.
    pub fn finish(&mut self) {
        self.phase = SyncPhase::Idle;
    }
}

//! Re-entrancy guard for reconciliation
//!
//! The engine is single-threaded; the only hazard is a change listener reacting
//! to the engine's own writes. The flag is held for the duration of a top-level
//! operation and released on drop, including on early error returns.

use std::cell::Cell;
use std::rc::Rc;

/// Shared "reconciliation in progress" flag for one target tree
#[derive(Debug, Clone, Default)]
pub struct ReentrancyFlag {
    active: Rc<Cell<bool>>,
}

impl ReentrancyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a reconciliation currently holds the flag
    pub fn is_set(&self) -> bool {
        self.active.get()
    }

    /// Acquire the flag; `None` if it is already held
    pub fn enter(&self) -> Option<ReconcileGuard> {
        if self.active.replace(true) {
            return None;
        }
        Some(ReconcileGuard {
            active: Rc::clone(&self.active),
        })
    }
}

/// Scoped hold on a [`ReentrancyFlag`]
#[derive(Debug)]
pub struct ReconcileGuard {
    active: Rc<Cell<bool>>,
}

impl Drop for ReconcileGuard {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

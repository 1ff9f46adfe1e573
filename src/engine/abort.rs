//! engine::abort
//!
//! Cooperative abort flag shared between an operation's `perform` and its
//! `abort_execution`.
//!
//! The engine does not preempt anything. A long-running `perform` polls
//! [`AbortSignal::check`] between steps; `abort_execution` raises the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::operation::PhaseError;

/// A clonable abort flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a request left over from a previous run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// `Err(PhaseError::Aborted)` once the flag is raised.
    pub fn check(&self) -> Result<(), PhaseError> {
        if self.is_raised() {
            Err(PhaseError::Aborted)
        } else {
            Ok(())
        }
    }
}

//! Out-of-band cancellation of a running solve.
//!
//! A [`CancellationToken`] is a cheaply cloneable shared flag. The CLI hands one clone to its
//! signal and timer tasks and another to the solver, which polls it once per iteration and
//! returns [`KeplerOutcome::Interrupted`](crate::kepler::KeplerOutcome::Interrupted) when set.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

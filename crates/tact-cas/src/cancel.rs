//! Cooperative cancellation (§5.1): a thin, `Clone`-able handle over a
//! shared atomic flag, polled between records during `save`/between pages
//! during `open`. Carries no async machinery, so it composes with either a
//! blocking call or a caller-spawned thread without forcing a runtime
//! dependency on this crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation request shared between a caller and a long-running
/// `save`/`open` call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

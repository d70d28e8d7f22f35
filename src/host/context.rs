use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

/// The host's single, exclusively held execution context.
///
/// Any call into host data structures must hold a [`HostGuard`]. Any call that may block on
/// renderer work must first release it through [`HostGuard::suspended`].
///
/// Lock order: the host context is always taken before render state locks, never while holding
/// one.
#[derive(Clone, Debug, Default)]
pub struct HostContext {
    lock: Arc<Mutex<()>>,
}

impl HostContext {
    /// Create a new, unheld context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive execution rights, blocking until available.
    pub fn enter(&self) -> HostGuard<'_> {
        HostGuard {
            guard: self.lock.lock(),
        }
    }

    /// Acquire exclusive execution rights, giving up after `timeout`.
    ///
    /// Background threads use this so that a driving thread waiting on them while holding the
    /// context cannot deadlock teardown.
    pub fn try_enter_for(&self, timeout: Duration) -> Option<HostGuard<'_>> {
        self.lock
            .try_lock_for(timeout)
            .map(|guard| HostGuard { guard })
    }

    /// Return `true` while some thread holds the context.
    pub fn is_held(&self) -> bool {
        self.lock.is_locked()
    }
}

/// Proof of holding the host execution context.
pub struct HostGuard<'a> {
    guard: MutexGuard<'a, ()>,
}

impl HostGuard<'_> {
    /// Run `f` with the host context released, reacquiring it before returning.
    ///
    /// The context is reacquired on every exit path, including unwinding out of `f`. Calls nest:
    /// a guard may be suspended again inside a critical section entered after an earlier resume.
    pub fn suspended<R>(&mut self, f: impl FnOnce() -> R) -> R {
        MutexGuard::unlocked(&mut self.guard, f)
    }
}

impl std::fmt::Debug for HostGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostGuard")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/context.rs"]
mod tests;

//! Hydration fence: reentrant suppression of surface-originated writes.
//!
//! Every programmatic mutation of the surface happens while the fence is
//! engaged. Surface callbacks that could write back to the document check
//! [`HydrationFence::is_fenced`] first and return early, so hydration never
//! feeds itself through the commit path.
//!
//! The fence is a counter, not a flag: nested scopes are safe, and the fence
//! only opens when the outermost scope exits. Scopes are RAII guards, so the
//! counter is released on every exit path including early returns, `?`, and
//! unwinding.

#[cfg(test)]
#[path = "fence_test.rs"]
mod fence_test;

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

/// Per-page reentrant fence. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct HydrationFence {
    depth: Arc<AtomicUsize>,
}

impl HydrationFence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the fence depth.
    pub fn enter(&self) {
        self.depth.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrement the fence depth. Unbalanced exits are ignored.
    pub fn exit(&self) {
        let released = self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| depth.checked_sub(1));
        if released.is_err() {
            trace!("fence exit without a matching enter");
        }
    }

    /// Whether any scope currently holds the fence.
    #[must_use]
    pub fn is_fenced(&self) -> bool {
        self.depth() > 0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    /// Enter the fence for the lifetime of the returned guard.
    #[must_use = "the fence is released as soon as the guard is dropped"]
    pub fn guard(&self) -> FenceGuard {
        self.enter();
        FenceGuard { fence: self.clone() }
    }

    /// Run `f` with the fence held.
    pub fn with_fence<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.guard();
        f()
    }

    /// Run an asynchronous unit of work with the fence held across every
    /// suspension point. Released when the future completes or is dropped.
    pub async fn with_fence_async<F>(&self, work: F) -> F::Output
    where
        F: Future,
    {
        let _guard = self.guard();
        work.await
    }
}

/// Scoped hold on a [`HydrationFence`]. Dropping it exits the fence.
#[derive(Debug)]
pub struct FenceGuard {
    fence: HydrationFence,
}

impl Drop for FenceGuard {
    fn drop(&mut self) {
        self.fence.exit();
    }
}

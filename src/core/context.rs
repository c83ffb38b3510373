//! Execution context threaded through downloads, resolution, and visits.
//!
//! The context owns the two pieces of mutable state a recipe run shares:
//! a cancellation flag checked by producers before they start new I/O, and
//! the queue of follow-up visitors scheduled during a traversal. It also
//! records coordinates the downloader failed to resolve so the driver can
//! report them after the run.
//!
//! A single context may be shared across threads; all state is behind
//! atomics or mutexes.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::{RegraftError, Result};
use crate::recipe::visitor::TagVisitor;

/// Shared state for one recipe run.
#[derive(Default)]
pub struct ExecutionContext {
    cancelled: Arc<AtomicBool>,
    after_visit: Mutex<VecDeque<TagVisitor>>,
    unresolved: Mutex<HashSet<String>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that can cancel this context from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fails with [`RegraftError::Cancelled`] once the context is cancelled.
    /// Producers call this before issuing new I/O.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(RegraftError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Schedule a visitor to run after the current traversal completes.
    /// Drained in insertion order by the recipe driver.
    pub fn after_visit(&self, visitor: TagVisitor) {
        self.after_visit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(visitor);
    }

    pub(crate) fn take_after_visit(&self) -> Option<TagVisitor> {
        self.after_visit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Record a coordinate no repository could supply.
    pub(crate) fn record_unresolved(&self, coordinate: String) {
        self.unresolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(coordinate);
    }

    /// Coordinates recorded as unresolved during this run, sorted.
    pub fn unresolved_coordinates(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .unresolved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        all.sort();
        all
    }
}

/// Cancels an [`ExecutionContext`] from outside the run.
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_visible_across_handles() {
        let ctx = ExecutionContext::new();
        assert!(ctx.check_cancelled().is_ok());

        let handle = ctx.cancel_handle();
        handle.cancel();

        assert!(ctx.is_cancelled());
        assert!(matches!(
            ctx.check_cancelled(),
            Err(RegraftError::Cancelled)
        ));
    }

    #[test]
    fn after_visit_queue_drains_in_insertion_order() {
        let ctx = ExecutionContext::new();
        ctx.after_visit(TagVisitor::new("first"));
        ctx.after_visit(TagVisitor::new("second"));

        assert_eq!(ctx.take_after_visit().unwrap().name(), "first");
        assert_eq!(ctx.take_after_visit().unwrap().name(), "second");
        assert!(ctx.take_after_visit().is_none());
    }

    #[test]
    fn unresolved_coordinates_are_deduplicated_and_sorted() {
        let ctx = ExecutionContext::new();
        ctx.record_unresolved("b:b:1".to_string());
        ctx.record_unresolved("a:a:1".to_string());
        ctx.record_unresolved("b:b:1".to_string());
        assert_eq!(ctx.unresolved_coordinates(), vec!["a:a:1", "b:b:1"]);
    }
}

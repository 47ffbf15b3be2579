#![forbid(unsafe_code)]

//! Reentrancy guard for in-flight dispatches.
//!
//! # State machine
//!
//! `Idle` → `Dispatching(depth)` → `Idle`. [`ReentrancyGuard::enter`] bumps
//! the depth and returns a [`DispatchScope`]; dropping the scope lowers it.
//! The decrement therefore runs on every exit path, including a listener
//! panic unwinding through the dispatcher.
//!
//! # Policy
//!
//! A mutation is refused iff a dispatch is in flight **and** more than one
//! collection listener is attached. A single listener cannot observe an
//! inconsistent fan-out, so it may mutate the container from its own callback.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::{CollectionError, Result};

/// Per-container dispatch depth counter.
#[derive(Debug, Clone, Default)]
pub struct ReentrancyGuard {
    depth: Rc<Cell<usize>>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current dispatch depth (0 when idle).
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    #[inline]
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.depth.get() > 0
    }

    /// Mark a dispatch as in flight until the returned scope drops.
    #[must_use = "the dispatch ends when the scope is dropped"]
    pub fn enter(&self) -> DispatchScope {
        self.depth.set(self.depth.get() + 1);
        DispatchScope {
            depth: Rc::clone(&self.depth),
        }
    }

    /// Fail with [`CollectionError::ReentrantMutation`] if mutating now could
    /// corrupt another listener's view of the in-flight event.
    pub fn check(&self, collection_listeners: usize) -> Result<()> {
        if self.is_dispatching() && collection_listeners > 1 {
            tracing::debug!(
                depth = self.depth(),
                listeners = collection_listeners,
                "refused reentrant mutation"
            );
            return Err(CollectionError::ReentrantMutation {
                listeners: collection_listeners,
            });
        }
        Ok(())
    }
}

/// RAII marker for one in-flight dispatch.
#[must_use = "the dispatch ends when the scope is dropped"]
#[derive(Debug)]
pub struct DispatchScope {
    depth: Rc<Cell<usize>>,
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        let depth = self.depth.get();
        debug_assert!(depth > 0, "dispatch scope released twice");
        self.depth.set(depth.saturating_sub(1));
    }
}

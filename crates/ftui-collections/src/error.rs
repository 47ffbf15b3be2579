#![forbid(unsafe_code)]

//! Error taxonomy for notifying containers.
//!
//! Every variant is surfaced synchronously to the caller of the mutating
//! method. Stale or foreign item-change signals are not errors; the bridge
//! recovers from them by publishing a `Reset`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectionError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// A mutation was attempted from inside a dispatch that fans out to more
    /// than one collection listener.
    #[error("cannot mutate the collection while notifying {listeners} collection listeners")]
    ReentrantMutation { listeners: usize },

    /// A positional access or mutation was outside the valid range.
    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The operation is not meaningful for this container shape.
    #[error("unsupported mutation: {operation}")]
    UnsupportedMutation { operation: &'static str },
}

impl CollectionError {
    #[must_use]
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    #[must_use]
    pub fn unsupported(operation: &'static str) -> Self {
        Self::UnsupportedMutation { operation }
    }

    /// Whether retrying the same call later (outside the dispatch) could succeed.
    #[must_use]
    pub fn is_reentrancy(&self) -> bool {
        matches!(self, Self::ReentrantMutation { .. })
    }
}

#![forbid(unsafe_code)]

//! Notifying containers for FrankenTUI.
//!
//! This crate provides:
//! - [`ObservableList`], a positional container
//! - [`ObservableSet`], an insertion-ordered membership container
//!
//! Both announce every committed mutation on up to three independently
//! subscribable channels:
//!
//! | Channel | Event | Carries |
//! |---------|-------|---------|
//! | structural | [`ListChanged`] | `Added`/`Removed`/`ItemChanged`/`Reset` with a position |
//! | collection | [`CollectionChanged`] | coarse `Add`/`Remove`/`Replace`/`Reset` with items |
//! | property | [`PropertyChanged`] | `Count` and `Item[]` |
//!
//! # Architecture
//!
//! One generic engine serves both shapes; the storage shape is a type
//! parameter. A mutating call passes the reentrancy guard, lets the storage
//! compute a [`ChangeDelta`], updates element hooks, and dispatches.
//! Containers built with `tracked*` constructors additionally hook every
//! element implementing [`NotifyItemChanged`] and republish its changes as
//! structural `ItemChanged` events.
//!
//! # Invariants
//!
//! 1. A mutation that changes nothing publishes nothing.
//! 2. Each committed mutation emits at most one event per structural or
//!    collection channel, after the storage change is visible.
//! 3. While a dispatch is in flight, mutations are refused iff the
//!    collection channel has more than one listener.
//! 4. Every stored element of a tracking container holds exactly one hook
//!    per occurrence, kept in storage order; elements that leave are
//!    unhooked before dispatch.
//! 5. Set-algebra operations publish one `Reset` or nothing.
//!
//! Everything here is single-threaded (`Rc`/`RefCell`), like the rest of
//! the reactive layer.

pub mod bridge;
pub mod channel;
pub mod collection;
pub mod delta;
pub mod dispatch;
mod engine;
pub mod error;
pub mod event;
pub mod guard;
pub mod list;
pub mod options;
pub mod property;
pub mod set;
pub mod storage;

pub use bridge::{ItemChange, ItemChangeHandler, NotifyItemChanged, PositionCache};
pub use channel::{EventChannel, Subscription};
pub use collection::{NotifyCollection, ObservableCollection};
pub use delta::{ChangeDelta, Mutation, SetDiff};
pub use dispatch::{Channels, Dispatcher, ListenerCounts};
pub use error::{CollectionError, Result};
pub use event::{CollectionAction, CollectionChanged, ListChangeKind, ListChanged, PropertyChanged};
pub use guard::{DispatchScope, ReentrancyGuard};
pub use list::ObservableList;
pub use options::CollectionOptions;
pub use property::{DescribeProperties, ElementType, PropertyId, PropertyMap, PropertyRegistry};
pub use set::ObservableSet;
pub use storage::{ListStorage, SetStorage, Storage};

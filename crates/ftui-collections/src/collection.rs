#![forbid(unsafe_code)]

//! Container facade shared by both shapes.
//!
//! [`ObservableCollection<T, St>`] is a cheap, cloneable handle to one
//! engine; clones share the same storage and listeners. The storage shape
//! `St` decides which mutating operations exist: see
//! [`ObservableList`](crate::ObservableList) and
//! [`ObservableSet`](crate::ObservableSet). Everything that does not depend
//! on the shape (reads, subscriptions, diagnostics) lives here.
//!
//! [`NotifyCollection<T>`] is the shape-agnostic, object-safe view for code
//! that accepts "any notifying container". Positional operations that the
//! shape cannot honor fail with
//! [`CollectionError::UnsupportedMutation`](crate::CollectionError).

use std::fmt;
use std::rc::Rc;

use crate::channel::Subscription;
use crate::delta::{ChangeDelta, Mutation};
use crate::dispatch::ListenerCounts;
use crate::engine::Engine;
use crate::error::Result;
use crate::event::{CollectionChanged, ListChanged, PropertyChanged};
use crate::storage::Storage;

/// A notifying container over storage shape `St`.
pub struct ObservableCollection<T, St> {
    pub(crate) engine: Rc<Engine<T, St>>,
}

impl<T, St> Clone for ObservableCollection<T, St> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
        }
    }
}

impl<T, St: fmt::Debug> fmt::Debug for ObservableCollection<T, St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableCollection")
            .field("engine", &self.engine)
            .finish()
    }
}

impl<T, St> ObservableCollection<T, St>
where
    T: Clone + PartialEq + 'static,
    St: Storage<T> + 'static,
{
    pub(crate) fn from_engine(engine: Rc<Engine<T, St>>) -> Self {
        Self { engine }
    }

    // ---- reads (bypass the pipeline) ----

    #[must_use]
    pub fn len(&self) -> usize {
        self.engine.storage().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.engine.storage().is_empty()
    }

    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.engine.storage().contains(item)
    }

    /// Position of `item` in enumeration order.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.engine.storage().index_of(item)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.engine.storage().get(index).cloned()
    }

    /// Copy of the contents in enumeration order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.engine.storage().snapshot()
    }

    /// Iterate over a snapshot, so the container may be mutated while
    /// iterating without invalidating the iterator.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    // ---- subscriptions ----

    /// Structural channel: positional and element-reported changes.
    pub fn subscribe_list_changed(
        &self,
        callback: impl Fn(&ListChanged) + 'static,
    ) -> Subscription {
        self.engine.dispatcher().subscribe_list_changed(callback)
    }

    /// Collection channel: coarse add/remove/replace/reset.
    pub fn subscribe_collection_changed(
        &self,
        callback: impl Fn(&CollectionChanged<T>) + 'static,
    ) -> Subscription {
        self.engine.dispatcher().subscribe_collection_changed(callback)
    }

    /// Property channel: `Count` and `Item[]`.
    pub fn subscribe_property_changed(
        &self,
        callback: impl Fn(&PropertyChanged) + 'static,
    ) -> Subscription {
        self.engine.dispatcher().subscribe_property_changed(callback)
    }

    #[must_use]
    pub fn listener_counts(&self) -> ListenerCounts {
        self.engine.dispatcher().listener_counts()
    }

    /// Whether a dispatch on this container is in flight.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.engine.dispatcher().guard().is_dispatching()
    }

    // ---- notification control ----

    #[must_use]
    pub fn raise_events(&self) -> bool {
        self.engine.raise_events()
    }

    /// Enable or disable dispatch. Mutations still commit and element hooks
    /// are still maintained while disabled.
    pub fn set_raise_events(&self, raise: bool) {
        self.engine.set_raise_events(raise);
    }

    /// Tell every listener to re-read the whole container.
    pub fn reset_bindings(&self) {
        let refresh = Mutation::<T>::refresh();
        self.engine.publish(&refresh.delta, refresh.count_changed);
    }

    // ---- item tracking diagnostics ----

    /// Whether elements are hooked for self-reported changes.
    #[must_use]
    pub fn is_tracking_items(&self) -> bool {
        self.engine.is_tracking()
    }

    /// Number of live element hooks.
    #[must_use]
    pub fn active_item_subscriptions(&self) -> usize {
        self.engine.active_item_subscriptions()
    }

    /// Element changes whose position came from the position cache.
    #[must_use]
    pub fn position_cache_hits(&self) -> u64 {
        self.engine.position_cache_hits()
    }

    pub(crate) fn publish(&self, delta: &ChangeDelta<T>, count_changed: bool) {
        self.engine.publish(delta, count_changed);
    }
}

/// Shape-agnostic notifying container.
pub trait NotifyCollection<T> {
    fn count(&self) -> usize;

    fn contains_item(&self, item: &T) -> bool;

    fn items(&self) -> Vec<T>;

    /// Add `item`; returns whether the container changed.
    fn add_item(&self, item: T) -> Result<bool>;

    /// Remove one occurrence of `item`; returns whether it was present.
    fn remove_item(&self, item: &T) -> Result<bool>;

    fn insert_at(&self, index: usize, item: T) -> Result<()>;

    fn set_at(&self, index: usize, item: T) -> Result<T>;

    fn remove_at(&self, index: usize) -> Result<T>;

    fn clear_items(&self) -> Result<()>;

    fn on_list_changed(&self, callback: Box<dyn Fn(&ListChanged)>) -> Subscription;

    fn on_collection_changed(&self, callback: Box<dyn Fn(&CollectionChanged<T>)>) -> Subscription;

    fn on_property_changed(&self, callback: Box<dyn Fn(&PropertyChanged)>) -> Subscription;
}

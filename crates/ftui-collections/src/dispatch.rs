#![forbid(unsafe_code)]

//! Notification dispatcher.
//!
//! Owns the three independently subscribable channels and turns one
//! [`ChangeDelta`] into the event(s) each active channel carries.
//!
//! # Dispatch order
//!
//! Within one delta: property channel (`Count`, then `Item[]`), then the
//! collection channel, then the structural channel. The whole fan-out runs
//! inside one [`DispatchScope`](crate::guard::DispatchScope).

use bitflags::bitflags;

use crate::channel::{EventChannel, Subscription};
use crate::delta::ChangeDelta;
use crate::error::Result;
use crate::event::{CollectionChanged, ListChanged, PropertyChanged};
use crate::guard::ReentrancyGuard;

bitflags! {
    /// Which notification channels a container publishes on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Channels: u8 {
        /// Positional and element-reported changes ([`ListChanged`]).
        const STRUCTURAL = 1 << 0;
        /// Coarse add/remove/replace/reset ([`CollectionChanged`]).
        const COLLECTION = 1 << 1;
        /// Derived scalar properties ([`PropertyChanged`]).
        const PROPERTY = 1 << 2;
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::all()
    }
}

/// Live listener count per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenerCounts {
    pub structural: usize,
    pub collection: usize,
    pub property: usize,
}

pub struct Dispatcher<T> {
    structural: EventChannel<ListChanged>,
    collection: EventChannel<CollectionChanged<T>>,
    property: EventChannel<PropertyChanged>,
    active: Channels,
    guard: ReentrancyGuard,
}

impl<T: Clone + 'static> Dispatcher<T> {
    #[must_use]
    pub fn new(active: Channels) -> Self {
        Self {
            structural: EventChannel::new(),
            collection: EventChannel::new(),
            property: EventChannel::new(),
            active,
            guard: ReentrancyGuard::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn active(&self) -> Channels {
        self.active
    }

    #[inline]
    #[must_use]
    pub fn guard(&self) -> &ReentrancyGuard {
        &self.guard
    }

    pub fn subscribe_list_changed(
        &self,
        callback: impl Fn(&ListChanged) + 'static,
    ) -> Subscription {
        self.structural.subscribe(callback)
    }

    pub fn subscribe_collection_changed(
        &self,
        callback: impl Fn(&CollectionChanged<T>) + 'static,
    ) -> Subscription {
        self.collection.subscribe(callback)
    }

    pub fn subscribe_property_changed(
        &self,
        callback: impl Fn(&PropertyChanged) + 'static,
    ) -> Subscription {
        self.property.subscribe(callback)
    }

    #[must_use]
    pub fn listener_counts(&self) -> ListenerCounts {
        ListenerCounts {
            structural: self.structural.listener_count(),
            collection: self.collection.listener_count(),
            property: self.property.listener_count(),
        }
    }

    /// Refuse a mutation that would land inside a multi-listener dispatch.
    ///
    /// Listeners on an inactive collection channel never observe an event,
    /// so they do not count.
    pub fn check_mutation(&self) -> Result<()> {
        let listeners = if self.active.contains(Channels::COLLECTION) {
            self.collection.listener_count()
        } else {
            0
        };
        self.guard.check(listeners)
    }

    /// Fan `delta` out to every active channel.
    pub fn publish(&self, delta: &ChangeDelta<T>, count_changed: bool) {
        let _scope = self.guard.enter();
        tracing::trace!(
            depth = self.guard.depth(),
            reset = delta.is_reset(),
            count_changed,
            "dispatching change"
        );

        if self.active.contains(Channels::PROPERTY) && self.property.has_listeners() {
            if count_changed {
                self.property.emit(&PropertyChanged::COUNT);
            }
            if delta.touches_positions() {
                self.property.emit(&PropertyChanged::INDEXER);
            }
        }

        if self.active.contains(Channels::COLLECTION) && self.collection.has_listeners() {
            if let Some(event) = delta.to_collection_changed() {
                self.collection.emit(&event);
            }
        }

        if self.active.contains(Channels::STRUCTURAL) && self.structural.has_listeners() {
            self.structural.emit(&delta.to_list_changed());
        }
    }

    /// Publish an element-reported change. Only the structural channel
    /// carries these, including the `Reset` used for unresolvable signals.
    pub fn publish_structural(&self, delta: &ChangeDelta<T>) {
        let _scope = self.guard.enter();
        if self.active.contains(Channels::STRUCTURAL) && self.structural.has_listeners() {
            self.structural.emit(&delta.to_list_changed());
        }
    }
}

impl<T> std::fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("active", &self.active)
            .field("structural", &self.structural)
            .field("collection", &self.collection)
            .field("property", &self.property)
            .field("depth", &self.guard.depth())
            .finish()
    }
}

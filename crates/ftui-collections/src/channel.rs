#![forbid(unsafe_code)]

//! Single-threaded event channels with RAII subscriptions.
//!
//! An [`EventChannel<E>`] is one independently subscribable notification
//! point. Containers own three of them (structural, collection, property);
//! element types may use one to report their own changes.
//!
//! # Architecture
//!
//! The channel stores listeners as `Weak` pointers. The strong reference
//! lives inside the [`Subscription`] returned by
//! [`subscribe()`](EventChannel::subscribe), so dropping the subscription is
//! the unsubscribe operation. Dead entries are pruned lazily on the next
//! emit or subscribe.
//!
//! # Invariants
//!
//! 1. Listeners are invoked in subscription order.
//! 2. No internal borrow is held while a listener runs, so listeners may
//!    subscribe, unsubscribe or emit on the same channel.
//! 3. A listener subscribed during an emit is not invoked by that emit.
//! 4. Dropping a [`Subscription`] removes the callback before the next emit.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

struct Listener<E> {
    callback: Box<dyn Fn(&E)>,
}

struct ChannelInner<E> {
    listeners: Vec<Weak<Listener<E>>>,
    emitted: u64,
}

/// An ordered, synchronous fan-out point for events of type `E`.
///
/// Cloning a channel creates a new handle to the **same** listener list.
pub struct EventChannel<E> {
    inner: Rc<RefCell<ChannelInner<E>>>,
}

impl<E> Clone for EventChannel<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventChannel<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventChannel")
            .field(
                "listeners",
                &inner
                    .listeners
                    .iter()
                    .filter(|w| w.strong_count() > 0)
                    .count(),
            )
            .field("emitted", &inner.emitted)
            .finish()
    }
}

impl<E: 'static> EventChannel<E> {
    /// Create a channel with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ChannelInner {
                listeners: Vec::new(),
                emitted: 0,
            })),
        }
    }

    /// Attach a listener. It stays attached until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let listener = Rc::new(Listener {
            callback: Box::new(callback),
        });
        {
            let mut inner = self.inner.borrow_mut();
            inner.listeners.retain(|w| w.strong_count() > 0);
            inner.listeners.push(Rc::downgrade(&listener));
        }
        Subscription::retain(listener)
    }

    /// Number of listeners currently attached.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .borrow()
            .listeners
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn has_listeners(&self) -> bool {
        self.listener_count() > 0
    }

    /// Total number of events emitted on this channel.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.inner.borrow().emitted
    }

    /// Deliver `event` to every attached listener in subscription order.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: &E) -> usize {
        let live: Vec<Rc<Listener<E>>> = {
            let mut inner = self.inner.borrow_mut();
            inner.emitted += 1;
            inner.listeners.retain(|w| w.strong_count() > 0);
            inner.listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in &live {
            (listener.callback)(event);
        }
        live.len()
    }
}

/// RAII guard for an attached listener or an element hook.
///
/// Dropping the subscription detaches it. [`Subscription::on_drop`] wraps an
/// arbitrary release action, which is how element types that keep their own
/// listener bookkeeping hand an unsubscribe capability to the item bridge.
#[must_use = "dropping a Subscription detaches the listener"]
pub struct Subscription {
    release: Option<Release>,
}

enum Release {
    Retain(#[allow(dead_code)] Rc<dyn Any>),
    Callback(Box<dyn FnOnce()>),
}

impl Subscription {
    fn retain(keep: Rc<dyn Any>) -> Self {
        Self {
            release: Some(Release::Retain(keep)),
        }
    }

    /// Build a subscription that runs `release` exactly once when dropped.
    pub fn on_drop(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Release::Callback(Box::new(release))),
        }
    }

    /// Detach now. Equivalent to dropping the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(Release::Callback(release)) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.release {
            Some(Release::Retain(_)) => "listener",
            Some(Release::Callback(_)) => "callback",
            None => "released",
        };
        f.debug_struct("Subscription").field("kind", &kind).finish()
    }
}

#![forbid(unsafe_code)]

//! The generic notifying engine shared by every container shape.
//!
//! # Pipeline
//!
//! Every mutating call runs, in order:
//!
//! 1. reentrancy check ([`Dispatcher::check_mutation`]),
//! 2. the storage operation, which also computes the [`Mutation`],
//! 3. item bridge hook/unhook for the items that entered or left,
//! 4. dispatch on the active channels.
//!
//! The storage borrow is released before step 3, so listeners and element
//! hooks always observe the committed state and may read the container.
//! A call whose storage step reports no mutation stops after step 2.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bridge::{ItemBridge, ItemChange, ItemChangeHandler, NotifyItemChanged};
use crate::delta::{ChangeDelta, Mutation};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::options::CollectionOptions;
use crate::property::{ElementType, PropertyCache};
use crate::storage::Storage;

pub(crate) struct Engine<T, St> {
    storage: RefCell<St>,
    dispatcher: Dispatcher<T>,
    bridge: Option<ItemBridge<T>>,
    raise_events: Cell<bool>,
}

impl<T, St> Engine<T, St>
where
    T: Clone + PartialEq + 'static,
    St: Storage<T> + 'static,
{
    /// Engine without item tracking.
    pub(crate) fn new(storage: St, options: &CollectionOptions) -> Rc<Self> {
        Rc::new(Self {
            storage: RefCell::new(storage),
            dispatcher: Dispatcher::new(options.channels),
            bridge: None,
            raise_events: Cell::new(options.raise_events),
        })
    }

    /// Engine that hooks every element, including those already in `storage`.
    pub(crate) fn tracked(storage: St, options: &CollectionOptions) -> Rc<Self>
    where
        T: NotifyItemChanged,
    {
        let engine = Rc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let handler: ItemChangeHandler = Rc::new(move |change: &ItemChange<'_>| {
                if let Some(engine) = weak.upgrade() {
                    engine.on_item_changed(change);
                }
            });
            let properties =
                PropertyCache::new(ElementType::of::<T>(), options.descriptors.clone());
            let bridge = ItemBridge::new(T::on_change, T::same_item, handler, properties);
            Self {
                storage: RefCell::new(storage),
                dispatcher: Dispatcher::new(options.channels),
                bridge: Some(bridge),
                raise_events: Cell::new(options.raise_events),
            }
        });

        // Hooks are appended in storage order.
        if let Some(bridge) = &engine.bridge {
            let existing = engine.storage.borrow().snapshot();
            for item in &existing {
                bridge.hook(item);
            }
        }
        engine
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub(crate) fn storage(&self) -> Ref<'_, St> {
        self.storage.borrow()
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.bridge.is_some()
    }

    pub(crate) fn active_item_subscriptions(&self) -> usize {
        self.bridge.as_ref().map_or(0, ItemBridge::active)
    }

    pub(crate) fn position_cache_hits(&self) -> u64 {
        self.bridge.as_ref().map_or(0, |bridge| bridge.cache().hits())
    }

    pub(crate) fn raise_events(&self) -> bool {
        self.raise_events.get()
    }

    pub(crate) fn set_raise_events(&self, raise: bool) {
        self.raise_events.set(raise);
    }

    /// Run one mutating call through the pipeline.
    ///
    /// `op` performs the storage operation and returns its output plus the
    /// committed [`Mutation`], or `None` when nothing changed.
    pub(crate) fn mutate<R>(
        &self,
        op: impl FnOnce(&mut St) -> Result<(R, Option<Mutation<T>>)>,
    ) -> Result<R> {
        self.dispatcher.check_mutation()?;

        let (output, mutation) = {
            let mut storage = self.storage.borrow_mut();
            op(&mut storage)?
        };

        match mutation {
            Some(mutation) => self.commit(mutation),
            None => tracing::debug!("mutation was a no-op; nothing dispatched"),
        }
        Ok(output)
    }

    fn commit(&self, mutation: Mutation<T>) {
        tracing::trace!(
            hooked = mutation.hooked.len(),
            unhooked = mutation.unhooked.len(),
            count_changed = mutation.count_changed,
            "committed mutation"
        );
        if let Some(bridge) = &self.bridge {
            bridge.apply(&mutation);
        }
        self.publish(&mutation.delta, mutation.count_changed);
    }

    /// Dispatch without touching storage or hooks.
    pub(crate) fn publish(&self, delta: &ChangeDelta<T>, count_changed: bool) {
        if self.raise_events.get() {
            self.dispatcher.publish(delta, count_changed);
        }
    }

    fn on_item_changed(&self, change: &ItemChange<'_>) {
        let Some(bridge) = &self.bridge else {
            return;
        };
        let delta = match self.storage.try_borrow() {
            Ok(storage) => bridge.resolve(change, &*storage),
            // An element reported a change while the store is being mutated.
            Err(_) => ChangeDelta::Reset,
        };
        if self.raise_events.get() {
            self.dispatcher.publish_structural(&delta);
        }
    }
}

impl<T, St: fmt::Debug> fmt::Debug for Engine<T, St> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("storage", &self.storage)
            .field("dispatcher", &self.dispatcher)
            .field("bridge", &self.bridge)
            .field("raise_events", &self.raise_events.get())
            .finish()
    }
}

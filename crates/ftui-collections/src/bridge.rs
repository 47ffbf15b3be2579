#![forbid(unsafe_code)]

//! Item change bridge.
//!
//! Elements that report their own changes implement [`NotifyItemChanged`].
//! A container built with item tracking hooks one shared handler into every
//! element that enters it and drops the hook when the element leaves. When
//! an element reports a change, the bridge republishes it on the structural
//! channel as `ItemChanged { position, property }`.
//!
//! # Resolution
//!
//! 1. Missing or empty property name: the change is unknown, publish `Reset`.
//! 2. Sender is not a `T`: publish `Reset`.
//! 3. Position lookup goes through a single-slot [`PositionCache`], then a
//!    linear search. Matching uses [`NotifyItemChanged::same_item`], so a
//!    value-equal twin never answers for the sender. A sender that is not in
//!    the container is stale: its hooks are dropped and `Reset` is published.
//!
//! # Hook table
//!
//! Hooks are kept in storage order, one per stored occurrence. Positional
//! mutations insert, drop or replace the hook at the delta's position, so
//! removing an element releases exactly that occurrence's subscription.
//! 4. Otherwise publish `ItemChanged` with the resolved [`PropertyId`], or
//!    with no property if the name is not described.
//!
//! None of these paths returns an error to anyone.
//!
//! [`PropertyId`]: crate::property::PropertyId

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::channel::Subscription;
use crate::delta::{ChangeDelta, Mutation};
use crate::property::PropertyCache;
use crate::storage::Storage;

/// A change reported by an element.
#[derive(Clone, Copy)]
pub struct ItemChange<'a> {
    sender: &'a dyn Any,
    property: Option<&'a str>,
}

impl<'a> ItemChange<'a> {
    /// `sender` changed its property `property`.
    #[must_use]
    pub fn new<T: Any>(sender: &'a T, property: &'a str) -> Self {
        Self {
            sender,
            property: Some(property),
        }
    }

    /// `sender` changed in an unspecified way.
    #[must_use]
    pub fn unknown<T: Any>(sender: &'a T) -> Self {
        Self {
            sender,
            property: None,
        }
    }

    #[must_use]
    pub fn sender(&self) -> &'a dyn Any {
        self.sender
    }

    /// The property name, treating an empty name as absent.
    #[must_use]
    pub fn property(&self) -> Option<&'a str> {
        self.property.filter(|name| !name.is_empty())
    }
}

impl fmt::Debug for ItemChange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemChange")
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

/// Shared callback handed to every tracked element.
pub type ItemChangeHandler = Rc<dyn Fn(&ItemChange<'_>)>;

/// Capability of an element type to report its own changes.
///
/// Implementors call `handler` with an [`ItemChange`] whose sender is the
/// element itself (the same `Self` value that sits in the container), and
/// return a [`Subscription`] that detaches the handler when dropped.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use ftui_collections::{
///     EventChannel, ItemChange, ItemChangeHandler, NotifyItemChanged, Subscription,
/// };
///
/// struct Person {
///     changed: EventChannel<&'static str>,
/// }
///
/// #[derive(Clone)]
/// struct PersonRef(Rc<Person>);
///
/// impl PartialEq for PersonRef {
///     fn eq(&self, other: &Self) -> bool {
///         Rc::ptr_eq(&self.0, &other.0)
///     }
/// }
///
/// impl NotifyItemChanged for PersonRef {
///     fn on_change(&self, handler: ItemChangeHandler) -> Subscription {
///         let me = self.clone();
///         self.0.changed.subscribe(move |name| handler(&ItemChange::new(&me, name)))
///     }
/// }
/// ```
pub trait NotifyItemChanged: PartialEq + Sized + 'static {
    fn on_change(&self, handler: ItemChangeHandler) -> Subscription;

    /// Whether `self` and `other` are the same element.
    ///
    /// Defaults to `==`. Override it when `PartialEq` compares the values of
    /// a reference-like element, so that only the occurrence that actually
    /// sent a change is matched. Must imply `self == other`.
    fn same_item(&self, other: &Self) -> bool {
        self == other
    }
}

pub(crate) type AttachFn<T> = fn(&T, ItemChangeHandler) -> Subscription;
pub(crate) type SameFn<T> = fn(&T, &T) -> bool;

/// Single most-recently-used `(position, item)` pair.
#[derive(Debug)]
pub struct PositionCache<T> {
    slot: RefCell<Option<(usize, T)>>,
    hits: Cell<u64>,
}

impl<T> Default for PositionCache<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
            hits: Cell::new(0),
        }
    }
}

impl<T: Clone + PartialEq> PositionCache<T> {
    /// Current position of `item`, or `None` if it is not stored.
    pub fn locate<St: Storage<T> + ?Sized>(&self, item: &T, storage: &St) -> Option<usize> {
        self.locate_by(item, storage, PartialEq::eq)
    }

    /// Like [`locate`](Self::locate), matching stored elements with `same`.
    ///
    /// `same` must imply `==`: candidates come from `index_of` first, and a
    /// full walk only runs when the first value match is not the sender.
    pub fn locate_by<St: Storage<T> + ?Sized>(
        &self,
        item: &T,
        storage: &St,
        same: impl Fn(&T, &T) -> bool,
    ) -> Option<usize> {
        let holds = |position: usize| {
            storage
                .get(position)
                .is_some_and(|stored| same(stored, item))
        };

        let cached = self
            .slot
            .borrow()
            .as_ref()
            .and_then(|(position, cached)| same(cached, item).then_some(*position));
        if let Some(position) = cached {
            if holds(position) {
                self.hits.set(self.hits.get() + 1);
                return Some(position);
            }
        }

        let found = match storage.index_of(item) {
            Some(position) if holds(position) => Some(position),
            Some(_) => (0..storage.len()).find(|&position| holds(position)),
            None => None,
        };
        *self.slot.borrow_mut() = found.map(|position| (position, item.clone()));
        found
    }

    pub fn invalidate(&self) {
        self.slot.borrow_mut().take();
    }

    /// Number of lookups answered from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.get()
    }
}

/// Per-container element hook table plus resolution state.
///
/// `hooks[i]` belongs to the element stored at position `i`.
pub(crate) struct ItemBridge<T> {
    attach: AttachFn<T>,
    same: SameFn<T>,
    handler: ItemChangeHandler,
    hooks: RefCell<Vec<(T, Subscription)>>,
    cache: PositionCache<T>,
    properties: PropertyCache,
}

impl<T: Clone + PartialEq + 'static> ItemBridge<T> {
    pub(crate) fn new(
        attach: AttachFn<T>,
        same: SameFn<T>,
        handler: ItemChangeHandler,
        properties: PropertyCache,
    ) -> Self {
        Self {
            attach,
            same,
            handler,
            hooks: RefCell::new(Vec::new()),
            cache: PositionCache::default(),
            properties,
        }
    }

    fn subscribe(&self, item: &T) -> (T, Subscription) {
        let subscription = (self.attach)(item, Rc::clone(&self.handler));
        (item.clone(), subscription)
    }

    /// Hook `item` as the last stored element.
    pub(crate) fn hook(&self, item: &T) {
        let entry = self.subscribe(item);
        self.hooks.borrow_mut().push(entry);
    }

    fn hook_at(&self, position: usize, item: &T) {
        let entry = self.subscribe(item);
        let mut hooks = self.hooks.borrow_mut();
        let position = position.min(hooks.len());
        hooks.insert(position, entry);
    }

    fn unhook_at(&self, position: usize) -> Option<(T, Subscription)> {
        let mut hooks = self.hooks.borrow_mut();
        (position < hooks.len()).then(|| hooks.remove(position))
    }

    fn rehook_at(&self, position: usize, item: &T) -> Option<(T, Subscription)> {
        let entry = self.subscribe(item);
        let mut hooks = self.hooks.borrow_mut();
        match hooks.get_mut(position) {
            Some(slot) => Some(std::mem::replace(slot, entry)),
            None => {
                hooks.push(entry);
                None
            }
        }
    }

    /// Drop the first hook held for `item`.
    fn unhook(&self, item: &T) -> Option<(T, Subscription)> {
        let mut hooks = self.hooks.borrow_mut();
        let index = hooks.iter().position(|(hooked, _)| (self.same)(hooked, item));
        index.map(|index| hooks.remove(index))
    }

    /// Drop every hook held for `item`.
    pub(crate) fn unhook_all(&self, item: &T) -> usize {
        let removed: Vec<(T, Subscription)> = {
            let mut hooks = self.hooks.borrow_mut();
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *hooks)
                .into_iter()
                .partition(|(hooked, _)| (self.same)(hooked, item));
            *hooks = kept;
            gone
        };
        removed.len()
    }

    /// Bring the hook table in line with a committed mutation.
    ///
    /// Subscriptions are dropped only after the table borrow is released.
    pub(crate) fn apply(&self, mutation: &Mutation<T>) {
        match &mutation.delta {
            ChangeDelta::Added { item, position } => self.hook_at(*position, item),
            ChangeDelta::Removed { position, .. } => drop(self.unhook_at(*position)),
            ChangeDelta::Replaced {
                new_item, position, ..
            } => drop(self.rehook_at(*position, new_item)),
            // Clearing drains everything; set algebra removes members in
            // place and appends new ones, which keeps the table aligned.
            ChangeDelta::Reset | ChangeDelta::ItemPropertyChanged { .. } => {
                for item in &mutation.unhooked {
                    drop(self.unhook(item));
                }
                for item in &mutation.hooked {
                    self.hook(item);
                }
            }
        }
        self.cache.invalidate();
    }

    #[must_use]
    pub(crate) fn active(&self) -> usize {
        self.hooks.borrow().len()
    }

    #[must_use]
    pub(crate) fn cache(&self) -> &PositionCache<T> {
        &self.cache
    }

    /// Turn an element-reported change into the delta to publish.
    pub(crate) fn resolve<St: Storage<T> + ?Sized>(
        &self,
        change: &ItemChange<'_>,
        storage: &St,
    ) -> ChangeDelta<T> {
        let Some(name) = change.property() else {
            tracing::trace!("element reported an unnamed change");
            return ChangeDelta::Reset;
        };

        let Some(item) = change.sender().downcast_ref::<T>() else {
            tracing::debug!(
                property = name,
                expected = std::any::type_name::<T>(),
                "change sender is not an element of this container"
            );
            return ChangeDelta::Reset;
        };

        let Some(position) = self.cache.locate_by(item, storage, self.same) else {
            let dropped = self.unhook_all(item);
            tracing::warn!(
                property = name,
                dropped_hooks = dropped,
                "stale element change signal; publishing reset"
            );
            return ChangeDelta::Reset;
        };

        ChangeDelta::ItemPropertyChanged {
            position,
            property: self.properties.resolve(name),
        }
    }
}

impl<T> fmt::Debug for ItemBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemBridge")
            .field("hooks", &self.hooks.borrow().len())
            .field("cache_hits", &self.cache.hits.get())
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::EventChannel;
    use crate::property::{ElementType, PropertyRegistry};
    use crate::storage::ListStorage;
    use tracing_test::traced_test;

    /// Compares by id; identity is the channel.
    #[derive(Clone, Debug)]
    struct Tile(Rc<EventChannel<&'static str>>, u32);

    impl PartialEq for Tile {
        fn eq(&self, other: &Self) -> bool {
            self.1 == other.1
        }
    }

    impl NotifyItemChanged for Tile {
        fn on_change(&self, handler: ItemChangeHandler) -> Subscription {
            let me = self.clone();
            self.0.subscribe(move |name| handler(&ItemChange::new(&me, name)))
        }

        fn same_item(&self, other: &Self) -> bool {
            Rc::ptr_eq(&self.0, &other.0)
        }
    }

    fn cell(id: u32) -> Tile {
        Tile(Rc::new(EventChannel::new()), id)
    }

    fn bridge(service: Option<PropertyRegistry>) -> ItemBridge<Tile> {
        let handler: ItemChangeHandler = Rc::new(|_: &ItemChange<'_>| {});
        let properties = PropertyCache::new(
            ElementType::of::<Tile>(),
            service.map(|s| Rc::new(s) as Rc<dyn crate::property::DescribeProperties>),
        );
        ItemBridge::new(Tile::on_change, Tile::same_item, handler, properties)
    }

    #[test]
    fn empty_property_name_means_unknown_change() {
        let item = cell(1);
        let change = ItemChange::new(&item, "");
        assert_eq!(change.property(), None);

        let storage = ListStorage::from_vec(vec![item.clone()]);
        assert_eq!(bridge(None).resolve(&change, &storage), ChangeDelta::Reset);
    }

    #[test]
    fn foreign_sender_resolves_to_reset() {
        let storage = ListStorage::from_vec(vec![cell(1)]);
        let stranger = 42_u64;
        let change = ItemChange::new(&stranger, "Name");
        assert_eq!(bridge(None).resolve(&change, &storage), ChangeDelta::Reset);
    }

    #[test]
    fn resolves_position_and_property() {
        let registry = PropertyRegistry::new().with::<Tile>(["Name", "Value"]);
        let b = bridge(Some(registry));
        let target = cell(3);
        let storage = ListStorage::from_vec(vec![cell(1), cell(2), target.clone()]);

        let delta = b.resolve(&ItemChange::new(&target, "Value"), &storage);
        match delta {
            ChangeDelta::ItemPropertyChanged { position, property } => {
                assert_eq!(position, 2);
                assert_eq!(property.map(|p| p.ordinal()), Some(1));
            }
            other => panic!("unexpected delta: {other:?}"),
        }

        // Unknown property: still published, without an identifier.
        let delta = b.resolve(&ItemChange::new(&target, "Colour"), &storage);
        assert_eq!(
            delta,
            ChangeDelta::ItemPropertyChanged {
                position: 2,
                property: None
            }
        );
        assert_eq!(b.cache().hits(), 1);
    }

    #[test]
    fn position_cache_revalidates_against_storage() {
        let cache = PositionCache::default();
        let mut storage = ListStorage::from_vec(vec![1, 2, 3]);
        assert_eq!(cache.locate(&3, &storage), Some(2));
        assert_eq!(cache.locate(&3, &storage), Some(2));
        assert_eq!(cache.hits(), 1);

        storage.remove_at(0).unwrap();
        assert_eq!(cache.locate(&3, &storage), Some(1));
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn hooks_follow_mutations() {
        let b = bridge(None);
        let a = cell(1);
        b.apply(&Mutation::inserted(a.clone(), 0));
        b.apply(&Mutation::inserted(a.clone(), 1));
        assert_eq!(b.active(), 2);
        assert_eq!(a.0.listener_count(), 2);

        b.apply(&Mutation::removed(a.clone(), 0));
        assert_eq!(b.active(), 1);
        assert_eq!(a.0.listener_count(), 1);
    }

    #[test]
    fn removal_releases_the_hook_at_its_position() {
        let b = bridge(None);
        let (first, second) = (cell(5), cell(5));
        b.apply(&Mutation::inserted(first.clone(), 0));
        b.apply(&Mutation::inserted(second.clone(), 1));

        // `first == second`; only the occurrence at position 1 leaves.
        b.apply(&Mutation::removed(second.clone(), 1));

        assert_eq!(first.0.listener_count(), 1);
        assert_eq!(second.0.listener_count(), 0);
        assert_eq!(b.active(), 1);
    }

    #[test]
    fn replacement_swaps_the_hook_at_its_position() {
        let b = bridge(None);
        let (left, right, fresh) = (cell(1), cell(1), cell(2));
        b.apply(&Mutation::inserted(left.clone(), 0));
        b.apply(&Mutation::inserted(right.clone(), 1));

        b.apply(&Mutation::replaced(right.clone(), fresh.clone(), 1));

        assert_eq!(
            (
                left.0.listener_count(),
                right.0.listener_count(),
                fresh.0.listener_count()
            ),
            (1, 0, 1)
        );
    }

    #[test]
    fn value_equal_twin_does_not_answer_for_sender() {
        let b = bridge(None);
        let (kept, gone) = (cell(4), cell(4));
        let storage = ListStorage::from_vec(vec![cell(1), kept.clone()]);

        assert_eq!(
            b.resolve(&ItemChange::new(&kept, "Name"), &storage),
            ChangeDelta::ItemPropertyChanged {
                position: 1,
                property: None
            }
        );
        assert_eq!(
            b.resolve(&ItemChange::new(&gone, "Name"), &storage),
            ChangeDelta::Reset
        );
    }

    #[test]
    fn locate_by_walks_past_value_matches() {
        let cache = PositionCache::default();
        let (a, b) = (cell(7), cell(7));
        let storage = ListStorage::from_vec(vec![a.clone(), b.clone()]);

        assert_eq!(cache.locate(&b, &storage), Some(0));
        assert_eq!(cache.locate_by(&b, &storage, Tile::same_item), Some(1));
        assert_eq!(cache.locate_by(&a, &storage, Tile::same_item), Some(0));
    }

    #[traced_test]
    #[test]
    fn stale_sender_is_unhooked_and_logged() {
        let b = bridge(None);
        let gone = cell(9);
        b.hook(&gone);
        assert_eq!(gone.0.listener_count(), 1);

        let storage = ListStorage::from_vec(vec![cell(1)]);
        let delta = b.resolve(&ItemChange::new(&gone, "Name"), &storage);

        assert_eq!(delta, ChangeDelta::Reset);
        assert_eq!(b.active(), 0);
        assert_eq!(gone.0.listener_count(), 0);
        assert!(logs_contain("stale element change signal"));
    }
}

#![forbid(unsafe_code)]

//! Set-shaped notifying container.
//!
//! Members keep insertion order, so every member has a stable enumeration
//! position; that position is what `Added`/`Removed` and element-reported
//! `ItemChanged` events carry.
//!
//! Set-algebra operations (`union_with`, `intersect_with`, `except_with`,
//! `symmetric_except_with`) publish a single `Reset` when membership changes
//! and nothing at all when it does not. Elements that enter or leave through
//! them are still hooked and unhooked individually.
//!
//! # Example
//!
//! ```
//! use ftui_collections::ObservableSet;
//!
//! let set: ObservableSet<i32> = [1, 2, 3].into_iter().collect();
//! assert!(set.symmetric_except_with([2, 3, 4])?);
//! assert_eq!(set.to_vec(), vec![1, 4]);
//! # Ok::<(), ftui_collections::CollectionError>(())
//! ```

use std::hash::{BuildHasher, Hash};

use ahash::AHashSet;
use indexmap::IndexSet;

use crate::bridge::NotifyItemChanged;
use crate::channel::Subscription;
use crate::collection::{NotifyCollection, ObservableCollection};
use crate::delta::{Mutation, SetDiff};
use crate::engine::Engine;
use crate::error::{CollectionError, Result};
use crate::event::{CollectionChanged, ListChanged, PropertyChanged};
use crate::options::CollectionOptions;
use crate::storage::{SetStorage, Storage};

/// Membership notifying container. `S` is the hash function.
pub type ObservableSet<T, S = ahash::RandomState> = ObservableCollection<T, SetStorage<T, S>>;

impl<T: Clone + Eq + Hash + 'static> ObservableSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CollectionOptions::default())
    }

    #[must_use]
    pub fn with_options(options: CollectionOptions) -> Self {
        Self::with_hasher(ahash::RandomState::new(), options)
    }

    /// Copy `items` into a new set. No events fire during construction.
    pub fn from_iter_with(items: impl IntoIterator<Item = T>, options: CollectionOptions) -> Self {
        Self::from_iter_with_hasher(items, ahash::RandomState::new(), options)
    }
}

impl<T, S> ObservableSet<T, S>
where
    T: Clone + Eq + Hash + 'static,
    S: BuildHasher + Clone + 'static,
{
    #[must_use]
    pub fn with_hasher(hasher: S, options: CollectionOptions) -> Self {
        Self::from_iter_with_hasher(std::iter::empty(), hasher, options)
    }

    pub fn from_iter_with_hasher(
        items: impl IntoIterator<Item = T>,
        hasher: S,
        options: CollectionOptions,
    ) -> Self {
        let storage = initial_storage(items, hasher, &options);
        Self::from_engine(Engine::new(storage, &options))
    }

    /// Add `item`. Returns `false` (and fires nothing) if already a member.
    pub fn add(&self, item: T) -> Result<bool> {
        self.engine.mutate(|storage| match storage.insert(item.clone()) {
            Some(position) => Ok((true, Some(Mutation::inserted(item, position)))),
            None => Ok((false, None)),
        })
    }

    /// Remove `item`. Returns `false` (and fires nothing) if not a member.
    pub fn remove(&self, item: &T) -> Result<bool> {
        self.engine.mutate(|storage| match storage.remove(item) {
            Some((position, removed)) => Ok((true, Some(Mutation::removed(removed, position)))),
            None => Ok((false, None)),
        })
    }

    /// Remove every member. Clearing an empty set fires nothing.
    pub fn clear(&self) -> Result<()> {
        self.engine.mutate(|storage| Ok(((), Mutation::cleared(storage.drain_all()))))
    }

    /// Add every item of `other`. Returns whether membership changed.
    pub fn union_with(&self, other: impl IntoIterator<Item = T>) -> Result<bool> {
        self.set_algebra(|storage| storage.union(other))
    }

    /// Keep only members also in `other`.
    pub fn intersect_with(&self, other: impl IntoIterator<Item = T>) -> Result<bool> {
        self.set_algebra(|storage| storage.intersect(other))
    }

    /// Remove every member that is in `other`.
    pub fn except_with(&self, other: impl IntoIterator<Item = T>) -> Result<bool> {
        self.set_algebra(|storage| storage.except(other))
    }

    /// Keep members in exactly one of `self` and `other`.
    pub fn symmetric_except_with(&self, other: impl IntoIterator<Item = T>) -> Result<bool> {
        self.set_algebra(|storage| storage.symmetric_except(other))
    }

    fn set_algebra(&self, op: impl FnOnce(&mut SetStorage<T, S>) -> SetDiff<T>) -> Result<bool> {
        self.engine.mutate(|storage| {
            let mutation = Mutation::from_set_diff(op(storage));
            Ok((mutation.is_some(), mutation))
        })
    }

    /// Run `f` over the stored set. `f` must not mutate this set.
    pub fn with_set<R>(&self, f: impl FnOnce(&IndexSet<T, S>) -> R) -> R {
        f(self.engine.storage().as_set())
    }

    /// Whether `self` and `other` have exactly the same members.
    #[must_use]
    pub fn set_equals<'a>(&self, other: impl IntoIterator<Item = &'a T>) -> bool
    where
        T: 'a,
    {
        let other: AHashSet<&T> = other.into_iter().collect();
        self.with_set(|members| {
            other.len() == members.len() && other.iter().all(|item| members.contains(*item))
        })
    }
}

impl<T: Clone + Eq + Hash + NotifyItemChanged> ObservableSet<T> {
    /// Set that republishes element-reported changes.
    #[must_use]
    pub fn tracked() -> Self {
        Self::tracked_with(CollectionOptions::default())
    }

    #[must_use]
    pub fn tracked_with(options: CollectionOptions) -> Self {
        Self::tracked_from(std::iter::empty(), ahash::RandomState::new(), options)
    }
}

impl<T, S> ObservableSet<T, S>
where
    T: Clone + Eq + Hash + NotifyItemChanged,
    S: BuildHasher + Clone + 'static,
{
    /// Copy `items` into a tracking set; each member is hooked.
    pub fn tracked_from(
        items: impl IntoIterator<Item = T>,
        hasher: S,
        options: CollectionOptions,
    ) -> Self {
        let storage = initial_storage(items, hasher, &options);
        Self::from_engine(Engine::tracked(storage, &options))
    }
}

fn initial_storage<T, S>(
    items: impl IntoIterator<Item = T>,
    hasher: S,
    options: &CollectionOptions,
) -> SetStorage<T, S>
where
    T: Clone + Eq + Hash,
    S: BuildHasher + Clone,
{
    let mut storage = SetStorage::with_capacity_and_hasher(options.capacity, hasher);
    for item in items {
        storage.insert(item);
    }
    storage
}

impl<T: Clone + Eq + Hash + 'static> Default for ObservableSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Eq + Hash + 'static> FromIterator<T> for ObservableSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_with(iter, CollectionOptions::default())
    }
}

impl<T, S> NotifyCollection<T> for ObservableSet<T, S>
where
    T: Clone + Eq + Hash + 'static,
    S: BuildHasher + Clone + 'static,
{
    fn count(&self) -> usize {
        self.len()
    }

    fn contains_item(&self, item: &T) -> bool {
        self.contains(item)
    }

    fn items(&self) -> Vec<T> {
        self.to_vec()
    }

    fn add_item(&self, item: T) -> Result<bool> {
        self.add(item)
    }

    fn remove_item(&self, item: &T) -> Result<bool> {
        self.remove(item)
    }

    fn insert_at(&self, _index: usize, _item: T) -> Result<()> {
        Err(CollectionError::unsupported("insert_at"))
    }

    fn set_at(&self, _index: usize, _item: T) -> Result<T> {
        Err(CollectionError::unsupported("set_at"))
    }

    fn remove_at(&self, _index: usize) -> Result<T> {
        Err(CollectionError::unsupported("remove_at"))
    }

    fn clear_items(&self) -> Result<()> {
        self.clear()
    }

    fn on_list_changed(&self, callback: Box<dyn Fn(&ListChanged)>) -> Subscription {
        self.subscribe_list_changed(callback)
    }

    fn on_collection_changed(&self, callback: Box<dyn Fn(&CollectionChanged<T>)>) -> Subscription {
        self.subscribe_collection_changed(callback)
    }

    fn on_property_changed(&self, callback: Box<dyn Fn(&PropertyChanged)>) -> Subscription {
        self.subscribe_property_changed(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CollectionAction;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn actions(set: &ObservableSet<i32>) -> (Rc<RefCell<Vec<CollectionAction>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let sub = set.subscribe_collection_changed(move |ev| l.borrow_mut().push(ev.action));
        (log, sub)
    }

    #[test]
    fn add_existing_member_is_silent() {
        let set: ObservableSet<i32> = [1, 2].into_iter().collect();
        let (log, _sub) = actions(&set);

        assert_eq!(set.add(2), Ok(false));
        assert_eq!(set.add(3), Ok(true));
        assert_eq!(*log.borrow(), vec![CollectionAction::Add]);
        assert_eq!(set.index_of(&3), Some(2));
    }

    #[test]
    fn remove_reports_former_position() {
        let set: ObservableSet<i32> = [5, 6, 7].into_iter().collect();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        let _sub = set.subscribe_collection_changed(move |ev| *s.borrow_mut() = Some(ev.clone()));

        assert_eq!(set.remove(&6), Ok(true));
        assert_eq!(*seen.borrow(), Some(CollectionChanged::remove(6, 1)));
        assert_eq!(set.remove(&6), Ok(false));
    }

    #[test]
    fn set_algebra_collapses_to_reset() {
        let set: ObservableSet<i32> = [1, 2, 3, 4].into_iter().collect();
        let (log, _sub) = actions(&set);

        assert_eq!(set.intersect_with([1, 2, 3, 4, 5]), Ok(false));
        assert_eq!(set.except_with([9]), Ok(false));
        assert!(log.borrow().is_empty());

        assert_eq!(set.except_with([4]), Ok(true));
        assert_eq!(set.intersect_with([1, 2]), Ok(true));
        assert_eq!(
            *log.borrow(),
            vec![CollectionAction::Reset, CollectionAction::Reset]
        );
        assert!(set.set_equals(&[2, 1]));
    }

    #[test]
    fn positional_operations_are_unsupported() {
        let set: ObservableSet<i32> = [1].into_iter().collect();
        let view: &dyn NotifyCollection<i32> = &set;

        assert_eq!(
            view.insert_at(0, 2),
            Err(CollectionError::unsupported("insert_at"))
        );
        assert!(matches!(
            view.set_at(0, 2),
            Err(CollectionError::UnsupportedMutation { operation: "set_at" })
        ));
        assert!(view.remove_at(0).is_err());
        assert_eq!(view.items(), vec![1]);
        assert_eq!(view.add_item(1), Ok(false));
    }

    #[test]
    fn custom_hasher_is_accepted() {
        use std::collections::hash_map::RandomState;

        let set = ObservableSet::<&str, RandomState>::with_hasher(
            RandomState::new(),
            CollectionOptions::default().with_capacity(8),
        );
        assert_eq!(set.add("a"), Ok(true));
        assert!(set.contains(&"a"));
    }
}

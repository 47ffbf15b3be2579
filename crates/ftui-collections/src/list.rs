#![forbid(unsafe_code)]

//! List-shaped notifying container.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ftui_collections::{CollectionAction, ObservableList};
//!
//! let list = ObservableList::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let _sub = list.subscribe_collection_changed(move |ev| {
//!     log.borrow_mut().push((ev.action, ev.index));
//! });
//!
//! list.insert(0, "a")?;
//! assert_eq!(*seen.borrow(), vec![(CollectionAction::Add, Some(0))]);
//! assert_eq!(list.len(), 1);
//! # Ok::<(), ftui_collections::CollectionError>(())
//! ```

use crate::bridge::NotifyItemChanged;
use crate::channel::Subscription;
use crate::collection::{NotifyCollection, ObservableCollection};
use crate::delta::{ChangeDelta, Mutation};
use crate::engine::Engine;
use crate::error::{CollectionError, Result};
use crate::event::{CollectionChanged, ListChanged, PropertyChanged};
use crate::options::CollectionOptions;
use crate::storage::{ListStorage, Storage};

/// Positional notifying container.
pub type ObservableList<T> = ObservableCollection<T, ListStorage<T>>;

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(CollectionOptions::default())
    }

    #[must_use]
    pub fn with_options(options: CollectionOptions) -> Self {
        Self::from_iter_with(std::iter::empty(), options)
    }

    /// Copy `items` into a new list. No events fire during construction.
    pub fn from_iter_with(items: impl IntoIterator<Item = T>, options: CollectionOptions) -> Self {
        let storage = Self::initial_storage(items, &options);
        Self::from_engine(Engine::new(storage, &options))
    }

    fn initial_storage(
        items: impl IntoIterator<Item = T>,
        options: &CollectionOptions,
    ) -> ListStorage<T> {
        let mut copied = Vec::with_capacity(options.capacity);
        copied.extend(items);
        ListStorage::from_vec(copied)
    }

    /// Append `item`.
    pub fn add(&self, item: T) -> Result<()> {
        self.engine.mutate(|storage| {
            let position = storage.len();
            storage.insert_at(position, item.clone())?;
            Ok(((), Some(Mutation::inserted(item, position))))
        })
    }

    /// Insert `item` at `index` in `[0, len]`.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.engine.mutate(|storage| {
            storage.insert_at(index, item.clone())?;
            Ok(((), Some(Mutation::inserted(item, index))))
        })
    }

    /// Append every item, one mutation per item.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    /// Remove the first occurrence of `item`. Returns `false` (and fires
    /// nothing) when it is absent.
    pub fn remove(&self, item: &T) -> Result<bool> {
        self.engine.mutate(|storage| {
            let Some(position) = storage.index_of(item) else {
                return Ok((false, None));
            };
            let removed = storage.remove_at(position)?;
            Ok((true, Some(Mutation::removed(removed, position))))
        })
    }

    /// Remove and return the element at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.engine.mutate(|storage| {
            let removed = storage.remove_at(index)?;
            Ok((removed.clone(), Some(Mutation::removed(removed, index))))
        })
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        self.engine.mutate(|storage| {
            let old = storage.set_at(index, item.clone())?;
            Ok((old.clone(), Some(Mutation::replaced(old, item, index))))
        })
    }

    /// Remove everything. Clearing an empty list fires nothing.
    pub fn clear(&self) -> Result<()> {
        self.engine.mutate(|storage| Ok(((), Mutation::cleared(storage.drain_all()))))
    }

    /// Re-announce the element at `index` as changed without mutating it.
    pub fn reset_item(&self, index: usize) -> Result<()> {
        let item = self
            .get(index)
            .ok_or_else(|| CollectionError::out_of_range(index, self.len()))?;
        let delta = ChangeDelta::Replaced {
            old_item: item.clone(),
            new_item: item,
            position: index,
        };
        self.publish(&delta, false);
        Ok(())
    }

    /// Run `f` over the stored slice. `f` must not mutate this list.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(self.engine.storage().as_slice())
    }
}

impl<T: Clone + PartialEq + NotifyItemChanged> ObservableList<T> {
    /// List that republishes element-reported changes.
    #[must_use]
    pub fn tracked() -> Self {
        Self::tracked_with(CollectionOptions::default())
    }

    #[must_use]
    pub fn tracked_with(options: CollectionOptions) -> Self {
        Self::tracked_from(std::iter::empty(), options)
    }

    /// Copy `items` into a tracking list; each one is hooked.
    pub fn tracked_from(items: impl IntoIterator<Item = T>, options: CollectionOptions) -> Self {
        let storage = Self::initial_storage(items, &options);
        Self::from_engine(Engine::tracked(storage, &options))
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_with(iter, CollectionOptions::default())
    }
}

impl<T: Clone + PartialEq + 'static> NotifyCollection<T> for ObservableList<T> {
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
        self.add(item).map(|()| true)
    }

    fn remove_item(&self, item: &T) -> Result<bool> {
        self.remove(item)
    }

    fn insert_at(&self, index: usize, item: T) -> Result<()> {
        self.insert(index, item)
    }

    fn set_at(&self, index: usize, item: T) -> Result<T> {
        self.set(index, item)
    }

    fn remove_at(&self, index: usize) -> Result<T> {
        ObservableList::remove_at(self, index)
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

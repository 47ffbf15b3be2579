#![forbid(unsafe_code)]

//! Storage adapters: the authoritative element stores.
//!
//! [`ListStorage`] wraps a `Vec`, [`SetStorage`] wraps an insertion-ordered
//! `IndexSet` so that set members have a stable enumeration position. The
//! shared read surface is the [`Storage`] trait, which is all the engine and
//! the item bridge need.
//!
//! Positional arguments are validated before the store is touched, so a
//! failed call leaves the contents unchanged.

use std::hash::{BuildHasher, Hash};

use indexmap::IndexSet;

use crate::delta::SetDiff;
use crate::error::{CollectionError, Result};

/// Read surface shared by every storage shape.
pub trait Storage<T> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&T>;

    fn index_of(&self, item: &T) -> Option<usize>;

    fn contains(&self, item: &T) -> bool {
        self.index_of(item).is_some()
    }

    /// Remove every element, returning them in enumeration order.
    fn drain_all(&mut self) -> Vec<T>;

    /// Clone the contents in enumeration order.
    fn snapshot(&self) -> Vec<T>
    where
        T: Clone;
}

// ---------------------------------------------------------------------------
// ListStorage
// ---------------------------------------------------------------------------

/// Positional sequence store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListStorage<T> {
    items: Vec<T>,
}

impl<T> Default for ListStorage<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: PartialEq> ListStorage<T> {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Insert at `index` in `[0, len]`.
    pub fn insert_at(&mut self, index: usize, item: T) -> Result<()> {
        if index > self.items.len() {
            return Err(CollectionError::out_of_range(index, self.items.len()));
        }
        self.items.insert(index, item);
        Ok(())
    }

    /// Remove the element at `index` in `[0, len)`.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set_at(&mut self, index: usize, item: T) -> Result<T> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    pub fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(CollectionError::out_of_range(index, self.items.len()));
        }
        Ok(())
    }
}

impl<T: PartialEq> Storage<T> for ListStorage<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }

    fn drain_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    fn snapshot(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.clone()
    }
}

// ---------------------------------------------------------------------------
// SetStorage
// ---------------------------------------------------------------------------

/// Membership store keeping insertion order.
///
/// `S` is the hash function; equality comes from `T: Eq`.
#[derive(Debug, Clone)]
pub struct SetStorage<T, S = ahash::RandomState> {
    items: IndexSet<T, S>,
}

impl<T, S> SetStorage<T, S>
where
    T: Clone + Eq + Hash,
    S: BuildHasher + Clone,
{
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            items: IndexSet::with_capacity_and_hasher(capacity, hasher),
        }
    }

    #[must_use]
    pub fn as_set(&self) -> &IndexSet<T, S> {
        &self.items
    }

    /// Add `item`; returns its position if it was not already a member.
    pub fn insert(&mut self, item: T) -> Option<usize> {
        let (index, inserted) = self.items.insert_full(item);
        inserted.then_some(index)
    }

    /// Remove `item`, returning its former position and the stored value.
    pub fn remove(&mut self, item: &T) -> Option<(usize, T)> {
        self.items.shift_remove_full(item)
    }

    pub fn union(&mut self, other: impl IntoIterator<Item = T>) -> SetDiff<T> {
        self.apply(|candidate| {
            for item in other {
                candidate.insert(item);
            }
        })
    }

    pub fn intersect(&mut self, other: impl IntoIterator<Item = T>) -> SetDiff<T> {
        let keep = self.collect_other(other);
        self.apply(|candidate| candidate.retain(|item| keep.contains(item)))
    }

    pub fn except(&mut self, other: impl IntoIterator<Item = T>) -> SetDiff<T> {
        self.apply(|candidate| {
            for item in other {
                candidate.shift_remove(&item);
            }
        })
    }

    pub fn symmetric_except(&mut self, other: impl IntoIterator<Item = T>) -> SetDiff<T> {
        // Dedupe first so a repeated item does not toggle twice.
        let other = self.collect_other(other);
        let before = &self.items;
        let mut candidate = before.clone();
        for item in other {
            if before.contains(&item) {
                candidate.shift_remove(&item);
            } else {
                candidate.insert(item);
            }
        }
        self.commit(candidate)
    }

    fn collect_other(&self, other: impl IntoIterator<Item = T>) -> IndexSet<T, S> {
        let mut set = IndexSet::with_hasher(self.items.hasher().clone());
        set.extend(other);
        set
    }

    /// Run `op` on a copy and commit the copy only if membership changed.
    fn apply(&mut self, op: impl FnOnce(&mut IndexSet<T, S>)) -> SetDiff<T> {
        let mut candidate = self.items.clone();
        op(&mut candidate);
        self.commit(candidate)
    }

    fn commit(&mut self, candidate: IndexSet<T, S>) -> SetDiff<T> {
        let diff = SetDiff::between(&self.items, &candidate);
        if !diff.is_empty() {
            self.items = candidate;
        }
        diff
    }
}

impl<T, S> Storage<T> for SetStorage<T, S>
where
    T: Clone + Eq + Hash,
    S: BuildHasher + Clone,
{
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.items.get_index(index)
    }

    fn index_of(&self, item: &T) -> Option<usize> {
        self.items.get_index_of(item)
    }

    fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    fn drain_all(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(items: &[i32]) -> SetStorage<i32> {
        let mut set = SetStorage::with_capacity_and_hasher(items.len(), ahash::RandomState::new());
        for &item in items {
            set.insert(item);
        }
        set
    }

    #[test]
    fn list_rejects_out_of_range_without_touching_items() {
        let mut list = ListStorage::from_vec(vec!['a', 'b']);
        assert_eq!(
            list.insert_at(3, 'z'),
            Err(CollectionError::out_of_range(3, 2))
        );
        assert!(list.remove_at(2).is_err());
        assert!(list.set_at(7, 'q').is_err());
        assert_eq!(list.as_slice(), &['a', 'b']);
    }

    #[test]
    fn list_positional_ops() {
        let mut list = ListStorage::default();
        list.insert_at(0, "b").unwrap();
        list.insert_at(0, "a").unwrap();
        list.insert_at(2, "c").unwrap();
        assert_eq!(list.index_of(&"c"), Some(2));

        assert_eq!(list.set_at(1, "B").unwrap(), "b");
        assert_eq!(list.remove_at(0).unwrap(), "a");
        assert_eq!(list.snapshot(), vec!["B", "c"]);
        assert_eq!(list.drain_all(), vec!["B", "c"]);
        assert!(list.is_empty());
    }

    #[test]
    fn set_insert_reports_new_members_only() {
        let mut set = set_of(&[1, 2]);
        assert_eq!(set.insert(3), Some(2));
        assert_eq!(set.insert(1), None);
        assert_eq!(set.remove(&2), Some((1, 2)));
        assert_eq!(set.index_of(&3), Some(1));
    }

    #[test]
    fn union_without_new_members_commits_nothing() {
        let mut set = set_of(&[1, 2, 3]);
        let diff = set.union([1, 2]);
        assert!(diff.is_empty());
        assert_eq!(set.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn intersect_and_except() {
        let mut set = set_of(&[1, 2, 3, 4]);
        let diff = set.intersect([2, 4, 6]);
        assert_eq!(diff.removed, vec![1, 3]);
        assert!(diff.added.is_empty());
        assert_eq!(set.snapshot(), vec![2, 4]);

        let diff = set.except([4, 5]);
        assert_eq!(diff.removed, vec![4]);
        assert_eq!(set.snapshot(), vec![2]);
    }

    #[test]
    fn symmetric_except_toggles_membership_once() {
        let mut set = set_of(&[1, 2, 3]);
        let diff = set.symmetric_except([2, 3, 4, 4]);
        assert_eq!(diff.added, vec![4]);
        assert_eq!(diff.removed, vec![2, 3]);
        assert_eq!(set.snapshot(), vec![1, 4]);
    }
}

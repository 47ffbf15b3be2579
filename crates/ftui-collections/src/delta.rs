#![forbid(unsafe_code)]

//! Delta computation.
//!
//! Every mutating call that commits produces exactly one [`ChangeDelta`],
//! wrapped in a [`Mutation`] that also lists the items entering and leaving
//! the container (for the item bridge). A mutation that changes nothing
//! produces no `Mutation` at all, and nothing is dispatched.
//!
//! Set-algebra operations always collapse to [`ChangeDelta::Reset`]; their
//! [`SetDiff`] feeds hook/unhook only and never a positional event.

use std::hash::{BuildHasher, Hash};

use indexmap::IndexSet;

use crate::event::{CollectionChanged, ListChangeKind, ListChanged};
use crate::property::PropertyId;

/// The precise effect of one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDelta<T> {
    Added {
        item: T,
        position: usize,
    },
    Removed {
        item: T,
        position: usize,
    },
    Replaced {
        old_item: T,
        new_item: T,
        position: usize,
    },
    /// Bulk change with no single position.
    Reset,
    /// Raised by the item bridge only.
    ItemPropertyChanged {
        position: usize,
        property: Option<PropertyId>,
    },
}

impl<T: Clone> ChangeDelta<T> {
    /// Structural channel rendition.
    #[must_use]
    pub fn to_list_changed(&self) -> ListChanged {
        match self {
            Self::Added { position, .. } => ListChanged::at(ListChangeKind::Added, *position),
            Self::Removed { position, .. } => ListChanged::at(ListChangeKind::Removed, *position),
            Self::Replaced { position, .. } => {
                ListChanged::at(ListChangeKind::ItemChanged, *position)
            }
            Self::Reset => ListChanged::reset(),
            Self::ItemPropertyChanged { position, property } => {
                ListChanged::item_changed(*position, property.clone())
            }
        }
    }

    /// Collection channel rendition. Element-reported changes have none.
    #[must_use]
    pub fn to_collection_changed(&self) -> Option<CollectionChanged<T>> {
        match self {
            Self::Added { item, position } => Some(CollectionChanged::add(item.clone(), *position)),
            Self::Removed { item, position } => {
                Some(CollectionChanged::remove(item.clone(), *position))
            }
            Self::Replaced {
                old_item,
                new_item,
                position,
            } => Some(CollectionChanged::replace(
                old_item.clone(),
                new_item.clone(),
                *position,
            )),
            Self::Reset => Some(CollectionChanged::reset()),
            Self::ItemPropertyChanged { .. } => None,
        }
    }
}

impl<T> ChangeDelta<T> {
    /// Whether any positional value may have changed.
    #[must_use]
    pub fn touches_positions(&self) -> bool {
        !matches!(self, Self::ItemPropertyChanged { .. })
    }

    #[must_use]
    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }
}

/// Membership difference produced by a set-algebra operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

impl<T> SetDiff<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl<T: Clone + Eq + Hash> SetDiff<T> {
    /// Full membership diff of `after` against the `before` snapshot.
    ///
    /// Both lists follow the iteration order of the set they came from.
    #[must_use]
    pub fn between<S: BuildHasher>(before: &IndexSet<T, S>, after: &IndexSet<T, S>) -> Self {
        Self {
            added: after
                .iter()
                .filter(|item| !before.contains(*item))
                .cloned()
                .collect(),
            removed: before
                .iter()
                .filter(|item| !after.contains(*item))
                .cloned()
                .collect(),
        }
    }
}

/// A committed mutation: its delta plus bridge bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<T> {
    pub delta: ChangeDelta<T>,
    /// Items that entered the container.
    pub hooked: Vec<T>,
    /// Items that left the container.
    pub unhooked: Vec<T>,
    pub count_changed: bool,
}

impl<T: Clone> Mutation<T> {
    #[must_use]
    pub fn inserted(item: T, position: usize) -> Self {
        Self {
            hooked: vec![item.clone()],
            delta: ChangeDelta::Added { item, position },
            unhooked: Vec::new(),
            count_changed: true,
        }
    }

    #[must_use]
    pub fn removed(item: T, position: usize) -> Self {
        Self {
            unhooked: vec![item.clone()],
            delta: ChangeDelta::Removed { item, position },
            hooked: Vec::new(),
            count_changed: true,
        }
    }

    #[must_use]
    pub fn replaced(old_item: T, new_item: T, position: usize) -> Self {
        Self {
            hooked: vec![new_item.clone()],
            unhooked: vec![old_item.clone()],
            delta: ChangeDelta::Replaced {
                old_item,
                new_item,
                position,
            },
            count_changed: false,
        }
    }
}

impl<T> Mutation<T> {
    /// Clearing `drained`. Clearing an empty container is a no-op.
    #[must_use]
    pub fn cleared(drained: Vec<T>) -> Option<Self> {
        if drained.is_empty() {
            return None;
        }
        Some(Self {
            delta: ChangeDelta::Reset,
            hooked: Vec::new(),
            unhooked: drained,
            count_changed: true,
        })
    }

    /// Set-algebra outcome. An empty diff is a no-op.
    #[must_use]
    pub fn from_set_diff(diff: SetDiff<T>) -> Option<Self> {
        if diff.is_empty() {
            return None;
        }
        let count_changed = diff.added.len() != diff.removed.len();
        Some(Self {
            delta: ChangeDelta::Reset,
            hooked: diff.added,
            unhooked: diff.removed,
            count_changed,
        })
    }

    /// A `Reset` that commits nothing; used to force listeners to re-read.
    #[must_use]
    pub fn refresh() -> Self {
        Self {
            delta: ChangeDelta::Reset,
            hooked: Vec::new(),
            unhooked: Vec::new(),
            count_changed: false,
        }
    }
}

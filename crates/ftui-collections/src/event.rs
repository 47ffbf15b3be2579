#![forbid(unsafe_code)]

//! Payloads delivered on the three notification channels.

use crate::property::PropertyId;

/// Change kind carried on the structural channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ListChangeKind {
    Added,
    Removed,
    /// A positional value was replaced, or an element reported a change.
    ItemChanged,
    /// Too much changed to describe positionally; re-read everything.
    Reset,
}

/// Structural channel event: positional change plus, for element-reported
/// changes, the property that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChanged {
    pub kind: ListChangeKind,
    /// Affected position. `None` for [`ListChangeKind::Reset`].
    pub index: Option<usize>,
    /// Resolved property for element-reported changes. `None` when the
    /// change is positional or the property could not be resolved.
    pub property: Option<PropertyId>,
}

impl ListChanged {
    #[must_use]
    pub const fn reset() -> Self {
        Self {
            kind: ListChangeKind::Reset,
            index: None,
            property: None,
        }
    }

    #[must_use]
    pub const fn at(kind: ListChangeKind, index: usize) -> Self {
        Self {
            kind,
            index: Some(index),
            property: None,
        }
    }

    #[must_use]
    pub fn item_changed(index: usize, property: Option<PropertyId>) -> Self {
        Self {
            kind: ListChangeKind::ItemChanged,
            index: Some(index),
            property,
        }
    }

    /// Index in the signed convention where `-1` means "no position".
    #[must_use]
    pub fn signed_index(&self) -> isize {
        self.index
            .and_then(|i| isize::try_from(i).ok())
            .unwrap_or(-1)
    }

    /// Name of the resolved property, if any.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        self.property.as_ref().map(PropertyId::name)
    }
}

/// Action carried on the collection channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CollectionAction {
    Add,
    Remove,
    Replace,
    Reset,
}

/// Collection channel event: coarse add/remove/replace/reset with the
/// affected items. `Reset` carries no items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChanged<T> {
    pub action: CollectionAction,
    pub new_items: Vec<T>,
    pub old_items: Vec<T>,
    pub index: Option<usize>,
}

impl<T> CollectionChanged<T> {
    #[must_use]
    pub fn reset() -> Self {
        Self {
            action: CollectionAction::Reset,
            new_items: Vec::new(),
            old_items: Vec::new(),
            index: None,
        }
    }

    #[must_use]
    pub fn add(item: T, index: usize) -> Self {
        Self {
            action: CollectionAction::Add,
            new_items: vec![item],
            old_items: Vec::new(),
            index: Some(index),
        }
    }

    #[must_use]
    pub fn remove(item: T, index: usize) -> Self {
        Self {
            action: CollectionAction::Remove,
            new_items: Vec::new(),
            old_items: vec![item],
            index: Some(index),
        }
    }

    #[must_use]
    pub fn replace(old: T, new: T, index: usize) -> Self {
        Self {
            action: CollectionAction::Replace,
            new_items: vec![new],
            old_items: vec![old],
            index: Some(index),
        }
    }
}

/// Property channel event naming a derived scalar property that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    pub name: &'static str,
}

impl PropertyChanged {
    /// Element count changed.
    pub const COUNT: Self = Self { name: "Count" };
    /// Some positional value changed.
    pub const INDEXER: Self = Self { name: "Item[]" };

    #[must_use]
    pub fn is_count(&self) -> bool {
        *self == Self::COUNT
    }

    #[must_use]
    pub fn is_indexer(&self) -> bool {
        *self == Self::INDEXER
    }
}

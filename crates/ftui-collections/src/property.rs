#![forbid(unsafe_code)]

//! Property descriptors for element types.
//!
//! The item bridge reports *which* property of an element changed. Elements
//! name the property with a string; the bridge maps that name to a stable
//! [`PropertyId`] through a [`DescribeProperties`] service. Lookups are
//! memoized per element type for the lifetime of the container.

use std::any::TypeId;
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

/// Runtime identity of an element type, used as the descriptor lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(self) -> TypeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }
}

/// Stable identifier of one property of an element type.
///
/// The ordinal is the property's position in the descriptor list it was
/// registered with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyId {
    ordinal: u32,
    name: Rc<str>,
}

impl PropertyId {
    #[must_use]
    pub fn new(ordinal: u32, name: &str) -> Self {
        Self {
            ordinal,
            name: Rc::from(name),
        }
    }

    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Name → identifier mapping for one element type.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    by_name: AHashMap<Box<str>, PropertyId>,
}

impl PropertyMap {
    /// Build a map whose ordinals follow the order of `names`.
    ///
    /// A repeated name keeps its first ordinal.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_name = AHashMap::new();
        for name in names {
            let name = name.as_ref();
            if by_name.contains_key(name) {
                continue;
            }
            let ordinal = u32::try_from(by_name.len()).unwrap_or(u32::MAX);
            by_name.insert(Box::from(name), PropertyId::new(ordinal, name));
        }
        Self { by_name }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropertyId> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// External lookup service: `describe(type) -> {name -> PropertyId}`.
pub trait DescribeProperties {
    /// Describe the properties of `element`. Unknown types yield an empty map.
    fn properties_of(&self, element: ElementType) -> PropertyMap;
}

/// In-memory descriptor service keyed by element type.
///
/// # Example
///
/// ```
/// use ftui_collections::property::{DescribeProperties, ElementType, PropertyRegistry};
///
/// struct Person;
///
/// let registry = PropertyRegistry::new().with::<Person>(["Name", "Age"]);
/// let props = registry.properties_of(ElementType::of::<Person>());
/// assert_eq!(props.get("Age").map(|p| p.ordinal()), Some(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    types: AHashMap<TypeId, PropertyMap>,
}

impl PropertyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the property names of `T`.
    pub fn register<T: 'static>(
        &mut self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> &mut Self {
        self.types
            .insert(TypeId::of::<T>(), PropertyMap::from_names(names));
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<T: 'static>(mut self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.register::<T>(names);
        self
    }
}

impl DescribeProperties for PropertyRegistry {
    fn properties_of(&self, element: ElementType) -> PropertyMap {
        self.types.get(&element.id()).cloned().unwrap_or_default()
    }
}

/// Per-container memo of the descriptor lookup for its element type.
pub(crate) struct PropertyCache {
    element: ElementType,
    service: Option<Rc<dyn DescribeProperties>>,
    resolved: OnceCell<PropertyMap>,
}

impl PropertyCache {
    pub(crate) fn new(element: ElementType, service: Option<Rc<dyn DescribeProperties>>) -> Self {
        Self {
            element,
            service,
            resolved: OnceCell::new(),
        }
    }

    /// Resolve `name`, describing the element type on first use.
    pub(crate) fn resolve(&self, name: &str) -> Option<PropertyId> {
        let map = self.resolved.get_or_init(|| match &self.service {
            Some(service) => {
                let map = service.properties_of(self.element);
                tracing::trace!(
                    element = self.element.name(),
                    properties = map.len(),
                    "described element type"
                );
                map
            }
            None => PropertyMap::default(),
        });
        map.get(name).cloned()
    }
}

impl fmt::Debug for PropertyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyCache")
            .field("element", &self.element.name())
            .field("has_service", &self.service.is_some())
            .field("resolved", &self.resolved.get().map(PropertyMap::len))
            .finish()
    }
}

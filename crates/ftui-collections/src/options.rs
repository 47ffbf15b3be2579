#![forbid(unsafe_code)]

//! Construction parameters for notifying containers.

use std::fmt;
use std::rc::Rc;

use crate::dispatch::Channels;
use crate::property::DescribeProperties;

/// Container configuration.
///
/// All fields have working defaults: no capacity reservation, every channel
/// active, events raised, no property descriptor service.
///
/// # Example
///
/// ```
/// use ftui_collections::{Channels, CollectionOptions};
///
/// let opts = CollectionOptions::default()
///     .with_capacity(64)
///     .with_channels(Channels::COLLECTION | Channels::PROPERTY);
/// assert!(!opts.channels.contains(Channels::STRUCTURAL));
/// ```
#[derive(Clone)]
pub struct CollectionOptions {
    /// Initial capacity hint for the storage adapter.
    pub capacity: usize,

    /// Channels the dispatcher publishes on. Listeners may still subscribe
    /// to an inactive channel; they are simply never called.
    pub channels: Channels,

    /// When `false`, mutations commit and item hooks are maintained, but
    /// nothing is dispatched. Can be toggled later on the container.
    pub raise_events: bool,

    /// Maps element property names to [`PropertyId`](crate::PropertyId)s for
    /// element-reported changes.
    pub descriptors: Option<Rc<dyn DescribeProperties>>,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            capacity: 0,
            channels: Channels::default(),
            raise_events: true,
            descriptors: None,
        }
    }
}

impl CollectionOptions {
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    #[must_use]
    pub fn with_raise_events(mut self, raise: bool) -> Self {
        self.raise_events = raise;
        self
    }

    #[must_use]
    pub fn with_descriptors(mut self, service: impl DescribeProperties + 'static) -> Self {
        self.descriptors = Some(Rc::new(service));
        self
    }

    /// Share an existing descriptor service between containers.
    #[must_use]
    pub fn with_shared_descriptors(mut self, service: Rc<dyn DescribeProperties>) -> Self {
        self.descriptors = Some(service);
        self
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("capacity", &self.capacity)
            .field("channels", &self.channels)
            .field("raise_events", &self.raise_events)
            .field("descriptors", &self.descriptors.is_some())
            .finish()
    }
}

//! Collection provider.
//!
//! Code that emits events without being handed a collection asks an
//! [`EventCollectionProvider`] for one. The application defines the factory
//! once, typically at startup:
//!
//! ```rust,ignore
//! let provider = EventCollectionProvider::new();
//! let events = EventCollection::new();
//! provider.define(move || events.clone());
//!
//! provider.emit(SaveEvent { base: EventBase::untargeted::<SaveEvent>() })?;
//! ```

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::registry::EventCollection;
use hookshot_core::{Event, EventError, EventResult, HookError};

/// Builds the collection a provider hands out.
pub type EventsFactory = Arc<dyn Fn() -> EventCollection + Send + Sync>;

/// Holds the factory producing the current collection.
#[derive(Default)]
pub struct EventCollectionProvider {
    factory: RwLock<Option<EventsFactory>>,
}

impl EventCollectionProvider {
    /// Creates a provider with no factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the factory, returning the previous one.
    pub fn define<F>(&self, factory: F) -> Option<EventsFactory>
    where
        F: Fn() -> EventCollection + Send + Sync + 'static,
    {
        debug!("Event collection provider defined");
        self.factory.write().replace(Arc::new(factory))
    }

    /// Returns `true` if a factory is set.
    pub fn defined(&self) -> bool {
        self.factory.read().is_some()
    }

    /// Removes the factory, returning it.
    pub fn undefine(&self) -> Option<EventsFactory> {
        self.factory.write().take()
    }

    /// Returns the collection built by the factory.
    ///
    /// # Errors
    ///
    /// [`EventError::NoProviderDefined`] when no factory is set.
    pub fn provide(&self) -> EventResult<EventCollection> {
        let factory = self
            .factory
            .read()
            .clone()
            .ok_or(EventError::NoProviderDefined)?;
        Ok(factory())
    }

    /// Returns the current collection, first defining a factory that always
    /// hands out the same new collection when none is set.
    pub fn get_events(&self) -> EventCollection {
        let factory = {
            let mut slot = self.factory.write();
            slot.get_or_insert_with(|| {
                debug!("No event collection provider, defining a single-instance one");
                let events = OnceLock::new();
                let factory: EventsFactory =
                    Arc::new(move || events.get_or_init(EventCollection::new).clone());
                factory
            })
            .clone()
        };
        factory()
    }

    /// Emits `event` on the current collection.
    ///
    /// # Errors
    ///
    /// [`EventError::NoProviderDefined`] when no factory is set, or the
    /// first error returned by a hook.
    pub fn emit<E: Event>(&self, event: E) -> Result<E, HookError> {
        self.provide()?.emit(event)
    }
}

impl std::fmt::Debug for EventCollectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCollectionProvider")
            .field("defined", &self.defined())
            .finish()
    }
}

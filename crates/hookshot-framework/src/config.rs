//! Bulk listener configuration.
//!
//! [`EventConfig`] is the `type -> hooks` mapping merged into a collection by
//! [`attach_many`](crate::EventCollection::attach_many). Build it in code with
//! [`ConfigBuilder`]:
//!
//! ```rust,ignore
//! let config = ConfigBuilder::new()
//!     .attach::<SaveEvent, _>(on_any_save)
//!     .attach_to::<Processor, ValidateEvent, _>(HookRef::static_method("app::hooks", "on_validate"))
//!     .attach_as("render", on_render)
//!     .build();
//!
//! let events = EventCollection::builder().config(config).build()?;
//! ```
//!
//! Unlike [`attach`](crate::EventCollection::attach), the builder takes the
//! type from its type arguments, so references whose signature is only known
//! to a catalog can be filed before the catalog exists.

use std::collections::BTreeMap;

use hookshot_core::{Event, HookRef, Listener, SenderType, qualify_type, type_path};

/// Hooks to attach, by event type. Hooks are attached after any hook already
/// present, in list order.
#[derive(Debug, Clone, Default)]
pub struct EventConfig {
    pub listeners: BTreeMap<String, Vec<HookRef>>,
}

impl EventConfig {
    /// Returns `true` if no hook is configured.
    pub fn is_empty(&self) -> bool {
        self.listeners.values().all(Vec::is_empty)
    }
}

/// Builder for [`EventConfig`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    listeners: BTreeMap<String, Vec<HookRef>>,
}

fn event_type_of<E: Event>() -> &'static str {
    E::declared_type().unwrap_or_else(type_path::<E>)
}

impl ConfigBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook for `E` emitted without a sender.
    pub fn attach<E: Event, A>(self, hook: impl Listener<A>) -> Self {
        self.attach_as(event_type_of::<E>(), hook)
    }

    /// Adds a hook for `E` sent by `S` or a class deriving from it.
    pub fn attach_to<S: SenderType, E: Event, A>(self, hook: impl Listener<A>) -> Self {
        self.attach_as(qualify_type(S::CLASS.name(), event_type_of::<E>()), hook)
    }

    /// Adds a hook under an explicit type.
    pub fn attach_as<A>(mut self, event_type: impl Into<String>, hook: impl Listener<A>) -> Self {
        self.listeners
            .entry(event_type.into())
            .or_default()
            .push(hook.into_hook_ref());
        self
    }

    /// Finishes the configuration.
    pub fn build(self) -> EventConfig {
        EventConfig {
            listeners: self.listeners,
        }
    }
}

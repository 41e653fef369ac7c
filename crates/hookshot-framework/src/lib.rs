//! # Hookshot Framework
//!
//! The hook registry and the dispatch engine.
//!
//! This layer provides:
//! - [`EventCollection`]: hooks by event type, with hierarchy consolidation,
//!   `once` and per-sender hooks
//! - Dispatch: [`EventCollection::emit`] runs the main phase then the chain
//! - [`TypeResolver`]: event types derived from hook signatures
//! - [`HookCatalog`]: `Class::method` names for hooks, filled by `#[listen]`
//! - [`EventCollectionProvider`]: hands out the application's collection
//!
//! ```rust,ignore
//! use hookshot_framework::EventCollection;
//!
//! let events = EventCollection::new();
//! events.attach(|event: &mut ValidateEvent, _: &Processor| event.stop())?;
//!
//! let event = events.emit(ValidateEvent::new(processor))?;
//! assert!(event.stopped());
//! ```

pub mod catalog;
pub mod config;
mod dispatcher;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use catalog::{HookCatalog, LISTENERS, ListenerEntry};
pub use config::{ConfigBuilder, EventConfig};
pub use provider::{EventCollectionProvider, EventsFactory};
pub use registry::{DetachHandle, EventCollection, EventCollectionBuilder};
pub use resolver::{DeclaredSignatures, SignatureInspector, TypeResolver, type_from_signature};

//! Listener catalog.
//!
//! Configuration names hooks as `Class::method` strings. The catalog maps
//! those names to hook references, so a [`HookRef::StaticMethod`] can be
//! resolved at attach or dispatch time.
//!
//! Functions marked `#[listen]` are collected at link time into
//! [`LISTENERS`] and loaded with [`HookCatalog::from_listeners`]:
//!
//! ```rust,ignore
//! mod hooks {
//!     #[listen]
//!     fn on_validate(event: &mut ValidateEvent, _: &Processor) {}
//! }
//!
//! let catalog = HookCatalog::from_listeners();
//! assert!(catalog.get("my_app::hooks::on_validate").is_some());
//! ```

use std::collections::BTreeMap;

use linkme::distributed_slice;
use parking_lot::RwLock;
use tracing::warn;

use hookshot_core::{EventError, EventResult, Hook, HookRef, Listener, qualify_type};

// ============================================================================
// Link-time registry
// ============================================================================

/// A listener registered with `#[listen]`.
#[derive(Debug, Clone, Copy)]
pub struct ListenerEntry {
    /// The class part of the listener's name; the module path by default.
    pub class: &'static str,
    /// The function name.
    pub method: &'static str,
    /// Builds the hook reference.
    pub make: fn() -> HookRef,
}

impl ListenerEntry {
    /// The `Class::method` name of the listener.
    pub fn name(&self) -> String {
        qualify_type(self.class, self.method)
    }
}

/// Listeners registered at link time by `#[listen]`.
#[distributed_slice]
pub static LISTENERS: [ListenerEntry];

// ============================================================================
// Catalog
// ============================================================================

/// A table of named hooks resolving `Class::method` references.
#[derive(Default)]
pub struct HookCatalog {
    entries: RwLock<BTreeMap<String, HookRef>>,
}

impl HookCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding every `#[listen]` function.
    pub fn from_listeners() -> Self {
        let catalog = Self::new();
        {
            let mut entries = catalog.entries.write();
            for entry in LISTENERS.iter() {
                let name = entry.name();
                if entries.insert(name.clone(), (entry.make)()).is_some() {
                    warn!(listener = %name, "Listener registered twice, keeping the last");
                }
            }
        }
        catalog
    }

    /// Registers a hook under `class::method`, returning the one it replaces.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidHook`] when the hook is itself a static reference.
    pub fn register<L, A>(
        &self,
        class: &str,
        method: &str,
        hook: L,
    ) -> EventResult<Option<HookRef>>
    where
        L: Listener<A>,
    {
        let hook = hook.into_hook_ref();
        if let HookRef::StaticMethod { .. } = hook {
            return Err(EventError::invalid_hook(
                "a static reference cannot be registered as a listener",
            ));
        }
        Ok(self.entries.write().insert(qualify_type(class, method), hook))
    }

    /// Looks up a listener by its `Class::method` name.
    pub fn get(&self, name: &str) -> Option<HookRef> {
        self.entries.read().get(name).cloned()
    }

    /// Resolves `class::method` to a registered hook reference.
    pub fn resolve(&self, class: &str, method: &str) -> EventResult<HookRef> {
        let name = qualify_type(class, method);
        self.get(&name)
            .ok_or_else(|| EventError::invalid_hook(format!("`{name}` is not a known listener")))
    }

    /// Returns the hook to call for `hook`, resolving static references.
    pub fn resolve_hook(&self, hook: &HookRef) -> EventResult<Hook> {
        match hook {
            HookRef::StaticMethod { class, method } => self.resolve_hook(&self.resolve(class, method)?),
            other => other.hook().cloned().ok_or_else(|| {
                EventError::invalid_hook(format!("{other:?} cannot be called"))
            }),
        }
    }

    /// A snapshot of every entry, ordered by name.
    pub fn entries(&self) -> Vec<(String, HookRef)> {
        self.entries
            .read()
            .iter()
            .map(|(name, hook)| (name.clone(), hook.clone()))
            .collect()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for HookCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookCatalog")
            .field("entries", &self.entries.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

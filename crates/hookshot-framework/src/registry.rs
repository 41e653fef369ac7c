//! Hook registry.
//!
//! An [`EventCollection`] maps event types to ordered lists of hooks. Hooks
//! attached later run first. Lookups of qualified types walk the sender's
//! class hierarchy, so hooks attached for a base class also run for events
//! sent by derived classes:
//!
//! ```text
//! hooks["Batch::ValidateEvent"]     = [b1]
//! hooks["Processor::ValidateEvent"] = [p2, p1]
//!
//! get_hooks("Batch::ValidateEvent") = [b1, p2, p1]
//! ```
//!
//! Two caches keep repeated dispatch cheap: the consolidated lists of
//! qualified types, and the set of types known to have no hooks. Every
//! mutation clears both.
//!
//! # Example
//!
//! ```rust,ignore
//! let events = EventCollection::new();
//!
//! let handle = events.attach(|event: &mut ValidateEvent, _: &Processor| {
//!     event.valid = event.values.iter().all(|v| *v > 0);
//! })?;
//! assert_eq!(handle.event_type(), "app::Processor::app.ValidateEvent");
//!
//! handle.detach()?;
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::catalog::HookCatalog;
use crate::config::EventConfig;
use crate::resolver::{DeclaredSignatures, SignatureInspector, TypeResolver};
use hookshot_core::{
    EventError, EventProfiler, EventResult, Hook, HookRef, HookResult, Listener, Sender,
    is_qualified, lookup_class, qualify_type, sender_ptr, split_qualified,
};

// ============================================================================
// State
// ============================================================================

#[derive(Default)]
struct State {
    hooks: HashMap<String, Vec<Hook>>,
    consolidated: HashMap<String, Vec<Hook>>,
    skippable: HashSet<String>,
    /// Wrapper hooks installed by `once` and `attach_to`, to the hooks they wrap.
    originals: HashMap<Hook, Hook>,
}

impl State {
    fn invalidate(&mut self) {
        self.consolidated.clear();
        self.skippable.clear();
    }

    fn is_attached(&self, hook: &Hook) -> bool {
        self.hooks.values().flatten().any(|attached| attached.ptr_eq(hook))
    }
}

pub(crate) struct Inner {
    state: Mutex<State>,
    resolver: TypeResolver,
    catalog: Arc<HookCatalog>,
    profiler: Arc<EventProfiler>,
}

impl Inner {
    fn insert(&self, event_type: &str, hook: Hook) {
        let mut state = self.state.lock();
        state
            .hooks
            .entry(event_type.to_owned())
            .or_default()
            .insert(0, hook.clone());
        state.invalidate();
        debug!(event_type = %event_type, hook = hook.label(), "Hook attached");
    }

    fn remove(&self, event_type: &str, addr: usize) -> EventResult<()> {
        let mut state = self.state.lock();
        let hooks = state
            .hooks
            .get_mut(event_type)
            .ok_or_else(|| EventError::not_attached(event_type))?;
        let index = hooks
            .iter()
            .position(|hook| hook.addr() == addr)
            .ok_or_else(|| EventError::not_attached(event_type))?;

        let removed = hooks.remove(index);
        if hooks.is_empty() {
            state.hooks.remove(event_type);
        }
        if !state.is_attached(&removed) {
            state.originals.remove(&removed);
        }
        state.invalidate();
        debug!(event_type = %event_type, hook = removed.label(), "Hook detached");
        Ok(())
    }
}

// ============================================================================
// EventCollection
// ============================================================================

/// A registry of hooks keyed by event type.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone)]
pub struct EventCollection {
    pub(crate) inner: Arc<Inner>,
}

impl EventCollection {
    /// Creates an empty collection with its own catalog, recording into the
    /// global profiler.
    pub fn new() -> Self {
        Self::builder().build_empty()
    }

    /// Starts building a collection.
    pub fn builder() -> EventCollectionBuilder {
        EventCollectionBuilder::default()
    }

    // ------------------------------------------------------------------------
    // Attaching
    // ------------------------------------------------------------------------

    /// Attaches a hook under the type its signature declares.
    ///
    /// The hook runs before every hook already attached to that type.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidHook`] when no event type can be resolved for the
    /// hook, or when a static reference names an unknown listener.
    pub fn attach<L, A>(&self, hook: L) -> EventResult<DetachHandle>
    where
        L: Listener<A>,
    {
        let hook_ref = hook.into_hook_ref();
        let event_type = self.inner.resolver.resolve(&hook_ref)?;
        let hook = self.resolve_hook(&hook_ref)?;
        Ok(self.insert(event_type, hook))
    }

    /// Attaches a hook under an explicit type, skipping resolution.
    pub fn attach_as<L, A>(&self, event_type: impl Into<String>, hook: L) -> EventResult<DetachHandle>
    where
        L: Listener<A>,
    {
        let event_type = checked_type(event_type.into())?;
        let hook = self.resolve_hook(&hook.into_hook_ref())?;
        Ok(self.insert(event_type, hook))
    }

    /// Attaches a hook that only runs for events sent by `target`.
    ///
    /// The hook must resolve to a qualified type. Senders are compared by
    /// address; the collection does not keep `target` alive.
    pub fn attach_to<T, L, A>(&self, target: &Arc<T>, hook: L) -> EventResult<DetachHandle>
    where
        T: Sender + ?Sized,
        L: Listener<A>,
    {
        let hook_ref = hook.into_hook_ref();
        let event_type = self.inner.resolver.resolve(&hook_ref)?;
        if !is_qualified(&event_type) {
            return Err(EventError::invalid_hook(format!(
                "`{event_type}` has no sender class, the hook would never see `target`"
            )));
        }
        let original = self.resolve_hook(&hook_ref)?;

        let target = Arc::downgrade(target);
        let target_ptr = Weak::as_ptr(&target).cast::<()>();
        let wrapped = original.clone();
        let wrapper = Hook::new(
            format!("{}@{:p}", original.label(), target_ptr),
            move |event, sender| -> HookResult {
                match sender {
                    Some(sender) if sender_ptr(sender) == Weak::as_ptr(&target).cast::<()>() => {
                        wrapped.call(event, Some(sender))
                    }
                    _ => Ok(()),
                }
            },
        );

        self.inner
            .state
            .lock()
            .originals
            .insert(wrapper.clone(), original);
        Ok(self.insert(event_type, wrapper))
    }

    /// Attaches a hook that runs at most once and then detaches itself.
    ///
    /// The hook is detached after its first call whether it succeeded or
    /// failed.
    pub fn once<L, A>(&self, hook: L) -> EventResult<DetachHandle>
    where
        L: Listener<A>,
    {
        let hook_ref = hook.into_hook_ref();
        let event_type = self.inner.resolver.resolve(&hook_ref)?;
        let original = self.resolve_hook(&hook_ref)?;
        Ok(self.insert_once(event_type, original))
    }

    /// [`once`](Self::once) under an explicit type.
    pub fn once_as<L, A>(&self, event_type: impl Into<String>, hook: L) -> EventResult<DetachHandle>
    where
        L: Listener<A>,
    {
        let event_type = checked_type(event_type.into())?;
        let original = self.resolve_hook(&hook.into_hook_ref())?;
        Ok(self.insert_once(event_type, original))
    }

    fn insert_once(&self, event_type: String, original: Hook) -> DetachHandle {
        let events = Arc::downgrade(&self.inner);
        let wrapper_addr = Arc::new(OnceLock::<usize>::new());
        let fired = AtomicBool::new(false);

        let slot = wrapper_addr.clone();
        let wrapped = original.clone();
        let attached_as = event_type.clone();
        let wrapper = Hook::new(
            format!("once({})", original.label()),
            move |event, sender| -> HookResult {
                if fired.swap(true, Ordering::SeqCst) {
                    return Ok(());
                }
                let result = wrapped.call(event, sender);
                if let (Some(inner), Some(addr)) = (events.upgrade(), slot.get()) {
                    // Already gone when detached through its handle meanwhile.
                    let _ = inner.remove(&attached_as, *addr);
                }
                result
            },
        );
        let _ = wrapper_addr.set(wrapper.addr());

        self.inner
            .state
            .lock()
            .originals
            .insert(wrapper.clone(), original);
        self.insert(event_type, wrapper)
    }

    /// Merges a bulk mapping of types to hooks.
    ///
    /// Every reference is resolved before anything is attached, so a failure
    /// leaves the collection unchanged. New hooks run after the hooks already
    /// attached; each list keeps only the first occurrence of a hook.
    pub fn attach_many<I, K, V>(&self, listeners: I) -> EventResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = HookRef>,
    {
        let mut resolved = Vec::new();
        for (event_type, hooks) in listeners {
            let event_type = checked_type(event_type.into())?;
            let hooks = hooks
                .into_iter()
                .map(|hook| self.resolve_hook(&hook))
                .collect::<EventResult<Vec<_>>>()?;
            resolved.push((event_type, hooks));
        }

        let mut state = self.inner.state.lock();
        for (event_type, hooks) in resolved {
            debug!(event_type = %event_type, count = hooks.len(), "Hooks merged");
            state.hooks.entry(event_type).or_default().extend(hooks);
        }
        for hooks in state.hooks.values_mut() {
            let mut seen = HashSet::new();
            hooks.retain(|hook| seen.insert(hook.addr()));
        }
        state.hooks.retain(|_, hooks| !hooks.is_empty());
        state.invalidate();
        Ok(())
    }

    /// Attaches every listener of `catalog` under its resolved type.
    ///
    /// Returns the number of hooks attached.
    pub fn attach_listeners(&self, catalog: &HookCatalog) -> EventResult<usize> {
        let entries = catalog.entries();
        let mut attached = Vec::with_capacity(entries.len());
        for (name, hook_ref) in entries {
            let event_type = self.inner.resolver.resolve(&hook_ref).map_err(|err| {
                EventError::invalid_hook(format!("listener `{name}`: {err}"))
            })?;
            attached.push((event_type, self.resolve_hook(&hook_ref)?));
        }

        let count = attached.len();
        for (event_type, hook) in attached {
            self.insert(event_type, hook);
        }
        Ok(count)
    }

    fn insert(&self, event_type: String, hook: Hook) -> DetachHandle {
        self.inner.insert(&event_type, hook.clone());
        DetachHandle {
            events: self.clone(),
            event_type,
            hook,
        }
    }

    // ------------------------------------------------------------------------
    // Detaching
    // ------------------------------------------------------------------------

    /// Detaches the first occurrence of `hook` from `event_type`.
    ///
    /// # Errors
    ///
    /// [`EventError::HookNotAttached`] when the hook is not attached to that
    /// type.
    pub fn detach(&self, event_type: &str, hook: &Hook) -> EventResult<()> {
        self.inner.remove(event_type, hook.addr())
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// The hooks to run for `event_type`, in call order.
    ///
    /// For a qualified type, the lists of every class in the sender's
    /// hierarchy are concatenated from the most derived class to the root.
    /// Classes that were never registered only contribute their own level.
    pub fn get_hooks(&self, event_type: &str) -> Vec<Hook> {
        let mut state = self.inner.state.lock();
        let Some((class, unqualified)) = split_qualified(event_type) else {
            return state.hooks.get(event_type).cloned().unwrap_or_default();
        };
        if let Some(cached) = state.consolidated.get(event_type) {
            return cached.clone();
        }

        let hooks: Vec<Hook> = match lookup_class(class) {
            Some(class) => {
                let stored = &state.hooks;
                class
                    .ancestors()
                    .filter_map(|level| stored.get(&qualify_type(level.name(), unqualified)))
                    .flatten()
                    .cloned()
                    .collect()
            }
            None => state.hooks.get(event_type).cloned().unwrap_or_default(),
        };
        state
            .consolidated
            .insert(event_type.to_owned(), hooks.clone());
        hooks
    }

    /// Marks `event_type` as having no hooks.
    pub fn skip(&self, event_type: &str) {
        self.inner
            .state
            .lock()
            .skippable
            .insert(event_type.to_owned());
    }

    /// Returns `true` if `event_type` is known to have no hooks.
    pub fn is_skippable(&self, event_type: &str) -> bool {
        self.inner.state.lock().skippable.contains(event_type)
    }

    /// The hook the caller attached, looking through `once` and `attach_to`
    /// wrappers.
    pub fn resolve_original_hook(&self, hook: &Hook) -> Hook {
        self.inner
            .state
            .lock()
            .originals
            .get(hook)
            .cloned()
            .unwrap_or_else(|| hook.clone())
    }

    /// The hook to call for `hook`, resolving static references through the
    /// catalog.
    pub fn resolve_hook(&self, hook: &HookRef) -> EventResult<Hook> {
        self.inner.catalog.resolve_hook(hook)
    }

    /// A snapshot of every attached hook, by type.
    pub fn hooks(&self) -> BTreeMap<String, Vec<Hook>> {
        self.inner
            .state
            .lock()
            .hooks
            .iter()
            .map(|(event_type, hooks)| (event_type.clone(), hooks.clone()))
            .collect()
    }

    /// The types with at least one hook, sorted.
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.inner.state.lock().hooks.keys().cloned().collect();
        types.sort();
        types
    }

    /// The resolver used for hooks attached without a type.
    pub fn resolver(&self) -> &TypeResolver {
        &self.inner.resolver
    }

    /// The catalog resolving static references.
    pub fn catalog(&self) -> &Arc<HookCatalog> {
        &self.inner.catalog
    }

    /// The profiler dispatch records into.
    pub fn profiler(&self) -> &Arc<EventProfiler> {
        &self.inner.profiler
    }
}

impl Default for EventCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCollection")
            .field("types", &self.types())
            .finish()
    }
}

fn checked_type(event_type: String) -> EventResult<String> {
    if event_type.is_empty() {
        return Err(EventError::invalid_hook("event types cannot be empty"));
    }
    Ok(event_type)
}

// ============================================================================
// DetachHandle
// ============================================================================

/// Returned by the attach operations; detaches the hook it was returned for.
#[derive(Debug, Clone)]
pub struct DetachHandle {
    events: EventCollection,
    event_type: String,
    hook: Hook,
}

impl DetachHandle {
    /// Detaches the hook.
    ///
    /// # Errors
    ///
    /// [`EventError::HookNotAttached`] when the hook was already detached.
    pub fn detach(&self) -> EventResult<()> {
        self.events.detach(&self.event_type, &self.hook)
    }

    /// The type the hook was attached under.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The attached hook. For `once` and `attach_to` this is the wrapper.
    pub fn hook(&self) -> &Hook {
        &self.hook
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`EventCollection`].
#[derive(Default)]
pub struct EventCollectionBuilder {
    catalog: Option<Arc<HookCatalog>>,
    inspector: Option<Arc<dyn SignatureInspector>>,
    profiler: Option<Arc<EventProfiler>>,
    config: Option<EventConfig>,
}

impl EventCollectionBuilder {
    /// Resolves static references with `catalog`.
    pub fn catalog(mut self, catalog: Arc<HookCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Reads hook signatures with `inspector`.
    pub fn inspector(mut self, inspector: Arc<dyn SignatureInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Records into `profiler` rather than the global one.
    pub fn profiler(mut self, profiler: Arc<EventProfiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// Attaches the listeners of `config` when built.
    pub fn config(mut self, config: EventConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the collection.
    ///
    /// # Errors
    ///
    /// Fails when a configured listener cannot be resolved.
    pub fn build(mut self) -> EventResult<EventCollection> {
        let config = self.config.take();
        let events = self.build_empty();
        if let Some(config) = config {
            events.attach_many(config.listeners)?;
        }
        Ok(events)
    }

    fn build_empty(self) -> EventCollection {
        let catalog = self.catalog.unwrap_or_default();
        let inspector = self
            .inspector
            .unwrap_or_else(|| Arc::new(DeclaredSignatures::new(catalog.clone())));
        EventCollection {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                resolver: TypeResolver::new(inspector),
                catalog,
                profiler: self.profiler.unwrap_or_else(EventProfiler::global),
            }),
        }
    }
}

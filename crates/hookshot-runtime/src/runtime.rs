//! Startup wiring.
//!
//! [`EventRuntime`] loads the configuration, sets up logging, builds the
//! application's [`EventCollection`] with the configured listeners, and
//! defines a provider handing it out.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hookshot_runtime::EventRuntime;
//!
//! // hookshot.toml in the current directory, HOOKSHOT_* overrides.
//! let runtime = EventRuntime::builder().init_logging(true).build()?;
//!
//! let event = runtime.emit(ValidateEvent::new(processor))?;
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigLoader, HookshotConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use hookshot_core::{Event, EventProfiler, HookError};
use hookshot_framework::{EventCollection, EventCollectionProvider, HookCatalog};

/// Counts describing a running [`EventRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Types with at least one hook.
    pub event_types: usize,
    /// Attached hooks, over all types.
    pub hooks: usize,
    /// Entries in the listener catalog.
    pub listeners: usize,
}

/// The configured event collection of an application.
pub struct EventRuntime {
    config: HookshotConfig,
    catalog: Arc<HookCatalog>,
    events: EventCollection,
    provider: EventCollectionProvider,
}

impl EventRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Builds a runtime from an already loaded configuration, using the
    /// `#[listen]` catalog.
    pub fn from_config(config: HookshotConfig) -> RuntimeResult<Self> {
        Self::builder().config(config).build()
    }

    /// The configuration the runtime was built from.
    pub fn config(&self) -> &HookshotConfig {
        &self.config
    }

    /// The catalog static references are resolved with.
    pub fn catalog(&self) -> &Arc<HookCatalog> {
        &self.catalog
    }

    /// The application's collection.
    pub fn events(&self) -> &EventCollection {
        &self.events
    }

    /// A provider handing out [`events`](Self::events).
    pub fn provider(&self) -> &EventCollectionProvider {
        &self.provider
    }

    /// Emits `event` on the application's collection.
    pub fn emit<E: Event>(&self, event: E) -> Result<E, HookError> {
        self.events.emit(event)
    }

    /// Returns counts describing the runtime.
    pub fn stats(&self) -> RuntimeStats {
        let hooks = self.events.hooks();
        RuntimeStats {
            event_types: hooks.len(),
            hooks: hooks.values().map(Vec::len).sum(),
            listeners: self.catalog.len(),
        }
    }
}

impl std::fmt::Debug for EventRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRuntime")
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`EventRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<HookshotConfig>,
    catalog: Option<Arc<HookCatalog>>,
    profiler: Option<Arc<EventProfiler>>,
    init_logging: bool,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder loading configuration from the default locations.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            catalog: None,
            profiler: None,
            init_logging: false,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Uses `config` instead of loading one.
    pub fn config(mut self, config: HookshotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Resolves static references with `catalog` instead of the `#[listen]`
    /// catalog.
    pub fn catalog(mut self, catalog: Arc<HookCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Records into `profiler` rather than the global one.
    pub fn profiler(mut self, profiler: Arc<EventProfiler>) -> Self {
        self.profiler = Some(profiler);
        self
    }

    /// Installs the global `tracing` subscriber from the logging config.
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Builds the runtime.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be loaded or is invalid, or when a
    /// configured listener cannot be attached.
    pub fn build(self) -> RuntimeResult<EventRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        validate_config(&config)?;
        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let catalog = self
            .catalog
            .unwrap_or_else(|| Arc::new(HookCatalog::from_listeners()));
        debug!(listeners = catalog.len(), "Listener catalog ready");

        let mut builder = EventCollection::builder()
            .catalog(catalog.clone())
            .config(config.events.to_event_config()?);
        if let Some(profiler) = self.profiler {
            builder = builder.profiler(profiler);
        }
        let events = builder.build()?;

        if config.events.collect_listeners {
            let attached = events.attach_listeners(&catalog)?;
            debug!(attached, "Collected listeners attached");
        }

        let provider = EventCollectionProvider::new();
        let shared = events.clone();
        provider.define(move || shared.clone());

        let runtime = EventRuntime {
            config,
            catalog,
            events,
            provider,
        };
        info!(
            event_types = runtime.stats().event_types,
            hooks = runtime.stats().hooks,
            "Event runtime ready"
        );
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::RuntimeError;
    use hookshot_core::{EventError, PayloadEvent};

    fn catalog() -> Arc<HookCatalog> {
        let catalog = Arc::new(HookCatalog::new());
        catalog
            .register("hooks", "on_payload", |event: &mut PayloadEvent| {
                event.insert("seen", true).map(drop)
            })
            .unwrap();
        catalog
    }

    fn config(listeners: &[(&str, &str)]) -> HookshotConfig {
        let mut config = HookshotConfig::default();
        config.events.listeners = listeners
            .iter()
            .fold(BTreeMap::new(), |mut map, (event_type, reference)| {
                map.entry((*event_type).to_owned())
                    .or_insert_with(Vec::new)
                    .push((*reference).to_owned());
                map
            });
        config
    }

    #[test]
    fn test_configured_listeners_are_attached() {
        let runtime = EventRuntime::builder()
            .config(config(&[("audit", "hooks::on_payload")]))
            .catalog(catalog())
            .profiler(Arc::new(EventProfiler::new()))
            .build()
            .unwrap();

        assert_eq!(
            runtime.stats(),
            RuntimeStats {
                event_types: 1,
                hooks: 1,
                listeners: 1,
            }
        );

        let event = runtime
            .emit(PayloadEvent::untargeted("audit", Default::default()).unwrap())
            .unwrap();
        assert_eq!(event.get("seen").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn test_provider_hands_out_runtime_events() {
        let runtime = EventRuntime::builder()
            .config(HookshotConfig::default())
            .catalog(catalog())
            .build()
            .unwrap();

        runtime.provider().provide().unwrap().skip("Marker");
        assert!(runtime.events().is_skippable("Marker"));
    }

    #[test]
    fn test_unknown_listener_fails() {
        let err = EventRuntime::builder()
            .config(config(&[("audit", "hooks::missing")]))
            .catalog(catalog())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Event(EventError::InvalidHook { .. })
        ));
    }

    #[test]
    fn test_invalid_config_fails() {
        let err = EventRuntime::builder()
            .config(config(&[("audit", "on_payload")]))
            .catalog(catalog())
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Config(_)));
    }

    #[test]
    fn test_collect_listeners_needs_resolvable_types() {
        // PayloadEvent has no static type, so its listeners can only be
        // attached through explicit configuration.
        let mut config = HookshotConfig::default();
        config.events.collect_listeners = true;
        let err = EventRuntime::builder()
            .config(config)
            .catalog(catalog())
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Event(_)));
    }
}

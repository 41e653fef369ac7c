//! Starts an application's shared [`EventCollection`](hookshot_framework::EventCollection) from a
//! configuration file: logging is installed through [`LoggingBuilder`], the
//! listeners named in `[events.listeners]` are attached, and the collection
//! is published through the [`EventRuntime`]'s provider.
//!
//! # Configuration
//!
//! Values are read from `hookshot.toml` (or `hookshot.yaml` with the
//! `yaml-config` feature) in the working directory or the user config
//! directory, then overridden by `HOOKSHOT_*` environment variables:
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [logging.filters]
//! hookshot_framework = "trace"
//!
//! [events]
//! collect_listeners = true
//!
//! [events.listeners]
//! "Processor::ValidateEvent" = ["app::hooks::on_validate"]
//! ```
//!
//! A profile file such as `hookshot.production.toml` is read first when
//! `HOOKSHOT_PROFILE` selects that profile; keys set in the base file win.
//!
//! # Startup
//!
//! ```ignore
//! use hookshot_runtime::EventRuntime;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = EventRuntime::builder().init_logging(true).build()?;
//!
//!     let events = runtime.provider().provide()?;
//!     events.emit(StartedEvent::default())?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, EventsConfig, HookshotConfig, LoggingConfig, Profile,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{EventRuntime, RuntimeBuilder, RuntimeStats};

pub use tracing;
pub use tracing_subscriber;

/// Tracing macros for use in listeners.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}

//! Runtime configuration: the [`HookshotConfig`] schema, the layered
//! [`ConfigLoader`], and the checks run before listeners are attached.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    EventsConfig, HookshotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig,
};
pub use validation::validate_config;

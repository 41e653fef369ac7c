use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Why [`EventRuntime`](crate::EventRuntime) failed to start.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// A configured listener is unknown or does not fit its event type.
    #[error("listener setup: {0}")]
    Event(#[from] hookshot_core::EventError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

//! Errors raised while reading or checking a [`HookshotConfig`](super::HookshotConfig).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("no configuration file at {}", .0.display())]
    FileNotFound(PathBuf),

    /// A source could not be read, or its values do not fit the schema.
    #[error("unreadable configuration: {0}")]
    ParseError(String),

    /// The values were read but are inconsistent.
    #[error("invalid configuration: {message}")]
    ValidationError { message: String },

    /// An `events.listeners` entry is not a `Class::method` name.
    #[error("listener `{reference}` for `{event_type}` is not a `Class::method` name")]
    InvalidHookReference {
        event_type: String,
        reference: String,
    },
}

impl ConfigError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn invalid_reference(event_type: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::InvalidHookReference {
            event_type: event_type.into(),
            reference: reference.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

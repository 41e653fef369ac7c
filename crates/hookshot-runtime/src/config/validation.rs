//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{EventsConfig, HookshotConfig, LogOutput, LoggingConfig};
use hookshot_core::{HookRef, SEPARATOR};

/// Validates the entire configuration.
pub fn validate_config(config: &HookshotConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_events_config(&config.events)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output is `file` but logging.file_path is not set",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter module name: {module:?}"
        )));
    }

    Ok(())
}

fn validate_events_config(events: &EventsConfig) -> ConfigResult<()> {
    for (event_type, references) in &events.listeners {
        validate_event_type(event_type)?;
        for reference in references {
            if HookRef::parse_static(reference).is_none() {
                return Err(ConfigError::invalid_reference(event_type, reference));
            }
        }
    }
    Ok(())
}

/// An event type is either `Type` or `Class::Type`, with non-empty parts.
fn validate_event_type(event_type: &str) -> ConfigResult<()> {
    if event_type.trim().is_empty() {
        return Err(ConfigError::validation("Event types cannot be empty"));
    }
    if let Some((class, unqualified)) = event_type.rsplit_once(SEPARATOR) {
        if class.is_empty() || unqualified.is_empty() {
            return Err(ConfigError::validation(format!(
                "Invalid event type `{event_type}`, expected `Type` or `Class::Type`"
            )));
        }
    }
    Ok(())
}

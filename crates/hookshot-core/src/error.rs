//! Error types shared by every Hookshot layer.
//!
//! [`EventError`] covers the failures the library itself raises: malformed
//! hooks, missing registrations, reserved payload keys and an unset provider.
//! Errors raised *by hooks* are never wrapped into it; they travel as a
//! [`HookError`] so the caller of `emit` can downcast them back to their own
//! error type.

use thiserror::Error;

// =============================================================================
// Event Errors
// =============================================================================

/// Errors raised by the event system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The hook cannot be attached: it is not invocable, or its signature does
    /// not describe an event type.
    #[error("invalid event hook: {reason}")]
    InvalidHook {
        /// What is wrong with the hook.
        reason: String,
    },

    /// `detach` was asked to remove a hook that is not attached to the type.
    #[error("the specified event hook is not attached to `{event_type}`")]
    HookNotAttached {
        /// The type the hook was looked up under.
        event_type: String,
    },

    /// An event payload used one of the structural property names.
    #[error("property `{property}` is reserved")]
    ReservedProperty {
        /// The offending payload key.
        property: String,
    },

    /// The provider was asked for a collection before one was defined.
    #[error("no provider is defined yet")]
    NoProviderDefined,

    /// A typed hook received an event of another type.
    #[error("event type mismatch: expected `{expected}`, got `{got}`")]
    EventTypeMismatch {
        /// The Rust type the hook declares.
        expected: &'static str,
        /// The type string of the event it received.
        got: String,
    },

    /// A typed hook received a sender it cannot view as its declared type.
    #[error("sender mismatch: expected `{expected}`, got `{got}`")]
    SenderMismatch {
        /// The Rust type the hook declares.
        expected: &'static str,
        /// The class of the sender it received, or `none`.
        got: String,
    },

    /// Event parameters could not be turned into an event value.
    #[error("invalid event parameters: {0}")]
    InvalidParams(String),
}

impl EventError {
    /// Creates an invalid hook error.
    pub fn invalid_hook(reason: impl Into<String>) -> Self {
        Self::InvalidHook {
            reason: reason.into(),
        }
    }

    /// Creates a not-attached error for the given type.
    pub fn not_attached(event_type: impl Into<String>) -> Self {
        Self::HookNotAttached {
            event_type: event_type.into(),
        }
    }

    /// Creates a reserved property error.
    pub fn reserved(property: impl Into<String>) -> Self {
        Self::ReservedProperty {
            property: property.into(),
        }
    }
}

// =============================================================================
// Hook Errors
// =============================================================================

/// Error returned by a hook, propagated unchanged by dispatch.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single hook invocation.
pub type HookResult = Result<(), HookError>;

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for event system operations.
pub type EventResult<T> = Result<T, EventError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            EventError::not_attached("A::ValidateEvent").to_string(),
            "the specified event hook is not attached to `A::ValidateEvent`"
        );
        assert_eq!(
            EventError::reserved("chain").to_string(),
            "property `chain` is reserved"
        );
    }

    #[test]
    fn test_event_error_boxes_into_hook_error() {
        let err: HookError = EventError::NoProviderDefined.into();
        assert_eq!(
            err.downcast_ref::<EventError>(),
            Some(&EventError::NoProviderDefined)
        );
    }
}

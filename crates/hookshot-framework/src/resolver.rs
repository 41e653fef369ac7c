//! Event type resolution.
//!
//! Hooks attached without an explicit type are filed under the type their
//! parameters declare:
//!
//! ```text
//! fn(&mut app::ValidateEvent)                  -> "app.ValidateEvent"
//! fn(&mut app::ValidateEvent, &app::Processor) -> "app::Processor::app.ValidateEvent"
//! ```
//!
//! The parameters are read by a [`SignatureInspector`]. Results are memoized
//! per [`HookKey`], so a closure type or a bound method is only inspected once.
//! `Class::method` references are looked up again on every call, since the
//! catalog may replace the listener behind a name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::catalog::HookCatalog;
use hookshot_core::{EventError, EventResult, HookKey, HookRef, ParamType, Signature, qualify_type};

// ============================================================================
// Signature inspection
// ============================================================================

/// Reads the declared parameters of a hook reference.
pub trait SignatureInspector: Send + Sync {
    /// Returns the parameters `hook` declares.
    fn inspect(&self, hook: &HookRef) -> EventResult<Signature>;
}

/// The default inspector: reads the signature carried by the reference.
///
/// Static references are looked up in the catalog first.
#[derive(Debug, Clone)]
pub struct DeclaredSignatures {
    catalog: Arc<HookCatalog>,
}

impl DeclaredSignatures {
    /// Creates an inspector resolving static references through `catalog`.
    pub fn new(catalog: Arc<HookCatalog>) -> Self {
        Self { catalog }
    }
}

impl SignatureInspector for DeclaredSignatures {
    fn inspect(&self, hook: &HookRef) -> EventResult<Signature> {
        match hook {
            HookRef::Function { signature, .. } | HookRef::BoundMethod { signature, .. } => {
                Ok(signature.clone())
            }
            HookRef::Invokable { target, .. } => Ok(target.signature()),
            HookRef::StaticMethod { class, method } => {
                let resolved = self.catalog.resolve(class, method)?;
                self.inspect(&resolved)
            }
            HookRef::Erased(_) => Ok(Signature::new()),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Computes the event type a hook listens to.
pub struct TypeResolver {
    inspector: Arc<dyn SignatureInspector>,
    memo: Mutex<HashMap<HookKey, String>>,
}

impl TypeResolver {
    /// Creates a resolver reading signatures with `inspector`.
    pub fn new(inspector: Arc<dyn SignatureInspector>) -> Self {
        Self {
            inspector,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the event type `hook` listens to.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidHook`] when the hook does not take one or two
    /// parameters, when its first parameter is not an event with a static
    /// type, or when its second parameter has no declared type.
    pub fn resolve(&self, hook: &HookRef) -> EventResult<String> {
        let key = match hook {
            HookRef::StaticMethod { .. } => None,
            other => Some(other.key()),
        };
        if let Some(event_type) = key.as_ref().and_then(|key| self.memo.lock().get(key).cloned()) {
            return Ok(event_type);
        }

        let signature = self.inspector.inspect(hook)?;
        let event_type = type_from_signature(&signature)?;
        trace!(hook = ?hook, event_type = %event_type, "Resolved hook event type");

        if let Some(key) = key {
            self.memo.lock().insert(key, event_type.clone());
        }
        Ok(event_type)
    }

    /// Number of memoized resolutions.
    pub fn memoized(&self) -> usize {
        self.memo.lock().len()
    }
}

impl std::fmt::Debug for TypeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeResolver")
            .field("memoized", &self.memoized())
            .finish()
    }
}

/// Computes an event type from declared parameters.
pub fn type_from_signature(signature: &Signature) -> EventResult<String> {
    let params = signature.params();
    if params.is_empty() || params.len() > 2 {
        return Err(EventError::invalid_hook(format!(
            "Invalid number of parameters, expected 1 or 2 got {}.",
            params.len()
        )));
    }

    let event_type = match &params[0] {
        ParamType::Event {
            event_type: Some(event_type),
            ..
        } => *event_type,
        ParamType::Event {
            rust_type,
            event_type: None,
        } => {
            return Err(EventError::invalid_hook(format!(
                "`{rust_type}` has no static event type, attach it with an explicit type"
            )));
        }
        other => {
            return Err(EventError::invalid_hook(format!(
                "the first parameter must be an event, got {other:?}"
            )));
        }
    };

    match params.get(1) {
        None => Ok(event_type.to_owned()),
        Some(ParamType::Sender(class)) => Ok(qualify_type(class.name(), event_type)),
        Some(ParamType::Named(name)) => Ok(qualify_type(name, event_type)),
        Some(other) => Err(EventError::invalid_hook(format!(
            "the second parameter must be a sender type, got {other:?}"
        ))),
    }
}

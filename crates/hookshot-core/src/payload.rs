//! Events carrying named payload data.
//!
//! [`PayloadEvent`] is the dynamic counterpart of a derived event: its type is
//! a runtime string and its data a JSON object. [`from_params`] goes the other
//! way and builds a typed event from named parameters. Both refuse payload
//! keys that collide with the structural properties of an event.

use std::any::Any;
use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{EventError, EventResult};
use crate::event::{Event, EventBase};
use crate::event_type::is_qualified;
use crate::sender::SenderRef;

/// Property names payloads may not use.
pub const RESERVED_PROPERTIES: [&str; 6] = ["sender", "target", "stopped", "chain", "used", "used_by"];

/// Returns whether `name` is a reserved property name.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_PROPERTIES.contains(&name)
}

/// Fails with [`EventError::ReservedProperty`] on the first reserved key.
pub fn check_reserved<'a>(keys: impl IntoIterator<Item = &'a str>) -> EventResult<()> {
    match keys.into_iter().find(|key| is_reserved(key)) {
        Some(key) => Err(EventError::reserved(key)),
        None => Ok(()),
    }
}

// =============================================================================
// Payload Event
// =============================================================================

/// An event with a runtime type and a JSON object payload.
///
/// ```rust,ignore
/// let event = PayloadEvent::new(Some(sender), "Saved", json_map!{ "id": 42 })?;
/// ```
#[derive(Debug, Clone)]
pub struct PayloadEvent {
    base: EventBase,
    payload: Map<String, Value>,
}

impl PayloadEvent {
    /// Creates a payload event.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidParams`] when the type is empty or already
    /// qualified, and [`EventError::ReservedProperty`] when the payload uses
    /// a reserved name.
    pub fn new(
        sender: Option<SenderRef>,
        event_type: impl Into<Cow<'static, str>>,
        payload: Map<String, Value>,
    ) -> EventResult<Self> {
        let event_type = event_type.into();
        if event_type.is_empty() || is_qualified(&event_type) {
            return Err(EventError::InvalidParams(format!(
                "`{event_type}` is not an unqualified event type"
            )));
        }
        check_reserved(payload.keys().map(String::as_str))?;
        Ok(Self {
            base: EventBase::new(sender, event_type),
            payload,
        })
    }

    /// Creates a payload event without a sender.
    pub fn untargeted(
        event_type: impl Into<Cow<'static, str>>,
        payload: Map<String, Value>,
    ) -> EventResult<Self> {
        Self::new(None, event_type, payload)
    }

    /// The payload.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// A payload value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// A mutable payload value.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.payload.get_mut(key)
    }

    /// Sets a payload value, returning the previous one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> EventResult<Option<Value>> {
        let key = key.into();
        check_reserved([key.as_str()])?;
        Ok(self.payload.insert(key, value.into()))
    }

    /// Deserializes the payload.
    pub fn deserialize<T: DeserializeOwned>(&self) -> EventResult<T> {
        serde_json::from_value(Value::Object(self.payload.clone()))
            .map_err(|e| EventError::InvalidParams(e.to_string()))
    }

    /// Consumes the event, returning its payload.
    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }
}

impl Event for PayloadEvent {
    fn base(&self) -> &EventBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EventBase {
        &mut self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn declared_type() -> Option<&'static str> {
        None
    }
}

// =============================================================================
// Typed Events From Parameters
// =============================================================================

/// Builds a typed event from named parameters.
///
/// The event's base must be skipped by serde; it is replaced with a fresh base
/// for `E` once the parameters are deserialized.
///
/// ```rust,ignore
/// #[derive(Event, Deserialize)]
/// struct RenameEvent {
///     #[event(base)]
///     #[serde(skip)]
///     base: EventBase,
///     from: String,
///     to: String,
/// }
///
/// let event: RenameEvent = from_params(Some(sender), params)?;
/// ```
pub fn from_params<E>(sender: Option<SenderRef>, params: Map<String, Value>) -> EventResult<E>
where
    E: Event + DeserializeOwned,
{
    check_reserved(params.keys().map(String::as_str))?;
    let mut event: E = serde_json::from_value(Value::Object(params))
        .map_err(|e| EventError::InvalidParams(e.to_string()))?;
    *event.base_mut() = EventBase::typed::<E>(sender);
    Ok(event)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::event_type::type_path;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct RenameEvent {
        #[serde(skip)]
        base: EventBase,
        from: String,
        to: String,
    }

    impl Event for RenameEvent {
        fn base(&self) -> &EventBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut EventBase {
            &mut self.base
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_reserved_keys_rejected() {
        for key in RESERVED_PROPERTIES {
            let mut payload = Map::new();
            payload.insert("value".into(), json!(1));
            payload.insert(key.into(), json!(true));

            let err = PayloadEvent::untargeted("Saved", payload).unwrap_err();
            assert_eq!(err, EventError::reserved(key));
        }
    }

    #[test]
    fn test_chain_key_mentioned() {
        let err = PayloadEvent::untargeted("Saved", object(json!({ "chain": [] }))).unwrap_err();
        assert!(err.to_string().contains("chain"));
    }

    #[test]
    fn test_payload_access() {
        let mut event =
            PayloadEvent::untargeted("Saved", object(json!({ "id": 42, "name": "a" }))).unwrap();
        assert_eq!(event.qualified_type(), "Saved");
        assert_eq!(event.get("id"), Some(&json!(42)));

        assert_eq!(event.insert("name", "b").unwrap(), Some(json!("a")));
        assert!(event.insert("stopped", true).is_err());
        assert_eq!(event.payload().len(), 2);
    }

    #[test]
    fn test_payload_type_must_be_unqualified() {
        let err = PayloadEvent::untargeted("Processor::Saved", Map::new()).unwrap_err();
        assert!(matches!(err, EventError::InvalidParams(msg) if msg.contains("Processor::Saved")));
        assert!(PayloadEvent::untargeted("", Map::new()).is_err());
        assert!(PayloadEvent::untargeted("order.saved", Map::new()).is_ok());
    }

    #[test]
    fn test_payload_has_no_declared_type() {
        assert_eq!(PayloadEvent::declared_type(), None);
    }

    #[test]
    fn test_from_params() {
        let event: RenameEvent =
            from_params(None, object(json!({ "from": "a", "to": "b" }))).unwrap();
        assert_eq!(event.from, "a");
        assert_eq!(event.to, "b");
        assert_eq!(event.qualified_type(), type_path::<RenameEvent>());
    }

    #[test]
    fn test_from_params_errors() {
        let err = from_params::<RenameEvent>(None, object(json!({ "from": "a" }))).unwrap_err();
        assert!(matches!(err, EventError::InvalidParams(msg) if msg.contains("to")));

        let err = from_params::<RenameEvent>(
            None,
            object(json!({ "from": "a", "to": "b", "extra": 1 })),
        )
        .unwrap_err();
        assert!(matches!(err, EventError::InvalidParams(msg) if msg.contains("extra")));

        let err =
            from_params::<RenameEvent>(None, object(json!({ "target": 1, "to": "b" }))).unwrap_err();
        assert_eq!(err, EventError::reserved("target"));
    }
}

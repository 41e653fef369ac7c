//! Event values.
//!
//! Every event embeds an [`EventBase`] holding the structural state the
//! dispatch engine works with: the sender, the unqualified and qualified type,
//! the stop flag, the chain of hooks to run after the main phase, and the log
//! of hooks that have been called.
//!
//! # Defining an event
//!
//! ```rust,ignore
//! use hookshot::prelude::*;
//!
//! #[derive(Event)]
//! struct ValidateEvent {
//!     #[event(base)]
//!     base: EventBase,
//!     values: Vec<i32>,
//!     valid: bool,
//! }
//!
//! let event = ValidateEvent {
//!     base: EventBase::of::<ValidateEvent>(processor.clone()),
//!     values: vec![1, 2, 3],
//!     valid: false,
//! };
//! ```
//!
//! # Chaining
//!
//! A hook can schedule more hooks to run once every main-phase hook is done:
//!
//! ```rust,ignore
//! fn on_validate(event: &mut ValidateEvent, _: &Processor) {
//!     event.chain(|event: &mut ValidateEvent| {
//!         event.valid = event.values.iter().all(|v| *v > 0);
//!     });
//! }
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::time::{Duration, SystemTime};

use crate::event_type::{qualify_type, type_path};
use crate::hook::{Hook, HookRef, Listener};
use crate::sender::SenderRef;

// ============================================================================
// Event Trait
// ============================================================================

/// The trait implemented by every event.
///
/// Use `#[derive(Event)]` rather than implementing it by hand.
pub trait Event: Any + Send + Sync {
    /// The structural state of the event.
    fn base(&self) -> &EventBase;

    /// Mutable access to the structural state of the event.
    ///
    /// For derived implementations and the dispatch engine only. Replacing
    /// the whole base changes the sender and type the event was built with;
    /// hooks use [`stop`](Self::stop) and [`chain`](Self::chain) instead.
    fn base_mut(&mut self) -> &mut EventBase;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable reference to self as `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The event type hooks declaring this Rust type are attached to.
    ///
    /// Defaults to the [`type_path`] of the struct, so same-named events in
    /// different modules never share hooks. Events whose type is only known
    /// at runtime return `None`, which makes typed hooks for them
    /// unresolvable.
    fn declared_type() -> Option<&'static str>
    where
        Self: Sized,
    {
        Some(type_path::<Self>())
    }

    /// The sender the event is emitted on behalf of.
    fn sender(&self) -> Option<&SenderRef> {
        self.base().sender()
    }

    /// The event type without sender qualification.
    fn unqualified_type(&self) -> &str {
        self.base().unqualified_type()
    }

    /// The type hooks are looked up with: qualified when a sender is set.
    fn qualified_type(&self) -> &str {
        self.base().qualified_type()
    }

    /// Whether a hook stopped the event.
    fn stopped(&self) -> bool {
        self.base().stopped()
    }

    /// Stops the event: no further hook runs for this emission.
    fn stop(&mut self) {
        self.base_mut().stop();
    }

    /// Number of hook calls made while dispatching this event.
    fn used(&self) -> usize {
        self.base().used()
    }

    /// The hook calls made while dispatching this event, in call order.
    fn used_by(&self) -> &[UsedBy] {
        self.base().used_by()
    }

    /// Adds a hook to run after the main phase.
    fn chain<L, A>(&mut self, hook: L) -> &mut Self
    where
        Self: Sized,
        L: Listener<A>,
    {
        self.base_mut().push_chain(hook.into_hook_ref());
        self
    }
}

// ============================================================================
// Event Base
// ============================================================================

/// One hook call recorded on an event.
#[derive(Debug, Clone)]
pub struct UsedBy {
    /// The hook as it was attached by the caller.
    pub hook: Hook,
    /// When the call started.
    pub started_at: SystemTime,
    /// When the call returned.
    pub finished_at: SystemTime,
}

impl UsedBy {
    /// Wall time spent in the call.
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or_default()
    }
}

/// Structural state shared by all events.
///
/// The default value has no type and no sender; it exists so event structs can
/// be deserialized with `#[serde(skip)]` on their base before the real base
/// is installed.
#[derive(Clone, Default)]
pub struct EventBase {
    sender: Option<SenderRef>,
    unqualified_type: Cow<'static, str>,
    qualified_type: String,
    stopped: bool,
    chain: Vec<HookRef>,
    used_by: Vec<UsedBy>,
}

impl EventBase {
    /// Creates the base of an event of the given type.
    ///
    /// The qualified type is computed here, from the sender's runtime class.
    pub fn new(sender: Option<SenderRef>, event_type: impl Into<Cow<'static, str>>) -> Self {
        let unqualified_type = event_type.into();
        let qualified_type = match &sender {
            Some(sender) => qualify_type(sender.class().name(), &unqualified_type),
            None => unqualified_type.clone().into_owned(),
        };
        Self {
            sender,
            unqualified_type,
            qualified_type,
            stopped: false,
            chain: Vec::new(),
            used_by: Vec::new(),
        }
    }

    /// Creates the base of an `E` emitted on behalf of `sender`.
    pub fn of<E: Event>(sender: SenderRef) -> Self {
        Self::typed::<E>(Some(sender))
    }

    /// Creates the base of an `E` emitted without a sender.
    pub fn untargeted<E: Event>() -> Self {
        Self::typed::<E>(None)
    }

    /// Creates the base of an `E`, typed with its declared type.
    pub fn typed<E: Event>(sender: Option<SenderRef>) -> Self {
        Self::new(sender, E::declared_type().unwrap_or_else(type_path::<E>))
    }

    /// The sender the event is emitted on behalf of.
    pub fn sender(&self) -> Option<&SenderRef> {
        self.sender.as_ref()
    }

    /// The event type without sender qualification.
    pub fn unqualified_type(&self) -> &str {
        &self.unqualified_type
    }

    /// The type hooks are looked up with.
    pub fn qualified_type(&self) -> &str {
        &self.qualified_type
    }

    /// Whether the event was stopped.
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Marks the event as stopped. Idempotent.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// The hooks scheduled to run after the main phase.
    pub fn chain(&self) -> &[HookRef] {
        &self.chain
    }

    /// Appends a hook to the chain.
    pub fn push_chain(&mut self, hook: HookRef) {
        self.chain.push(hook);
    }

    /// Number of hook calls recorded.
    pub fn used(&self) -> usize {
        self.used_by.len()
    }

    /// The hook calls recorded, in call order.
    pub fn used_by(&self) -> &[UsedBy] {
        &self.used_by
    }

    /// Records a hook call.
    pub fn record_use(&mut self, used: UsedBy) {
        self.used_by.push(used);
    }
}

impl std::fmt::Debug for EventBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBase")
            .field("sender", &self.sender.as_ref().map(|s| s.class().name()))
            .field("qualified_type", &self.qualified_type)
            .field("stopped", &self.stopped)
            .field("chain", &self.chain.len())
            .field("used", &self.used_by.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sender::{Sender, SenderClass};

    static PROCESSOR: SenderClass = SenderClass::new("Processor");

    struct Processor;

    impl Sender for Processor {
        fn class(&self) -> &'static SenderClass {
            &PROCESSOR
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct ValidateEvent {
        base: EventBase,
    }

    impl Event for ValidateEvent {
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
    fn test_qualified_type_from_sender_class() {
        let event = ValidateEvent {
            base: EventBase::of::<ValidateEvent>(Arc::new(Processor)),
        };
        assert_eq!(
            event.unqualified_type(),
            "hookshot_core.event.tests.ValidateEvent"
        );
        assert_eq!(
            event.qualified_type(),
            "Processor::hookshot_core.event.tests.ValidateEvent"
        );
        assert_eq!(event.sender().unwrap().class().name(), "Processor");
    }

    #[test]
    fn test_untargeted_type_is_unqualified() {
        let event = ValidateEvent {
            base: EventBase::untargeted::<ValidateEvent>(),
        };
        assert_eq!(event.qualified_type(), event.unqualified_type());
        assert!(event.sender().is_none());
    }

    mod billing {
        use std::any::Any;

        use crate::event::{Event, EventBase};

        pub struct ValidateEvent {
            pub base: EventBase,
        }

        impl Event for ValidateEvent {
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
    }

    #[test]
    fn test_same_named_events_have_distinct_types() {
        let local = EventBase::of::<ValidateEvent>(Arc::new(Processor));
        let billing = EventBase::of::<billing::ValidateEvent>(Arc::new(Processor));

        assert_ne!(local.unqualified_type(), billing.unqualified_type());
        assert_ne!(local.qualified_type(), billing.qualified_type());
        assert_eq!(
            billing::ValidateEvent::declared_type(),
            Some("hookshot_core.event.tests.billing.ValidateEvent")
        );
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut event = ValidateEvent {
            base: EventBase::untargeted::<ValidateEvent>(),
        };
        assert!(!event.stopped());
        event.stop();
        event.stop();
        assert!(event.stopped());
    }

    #[test]
    fn test_chain_appends_in_order() {
        let mut event = ValidateEvent {
            base: EventBase::untargeted::<ValidateEvent>(),
        };
        let first = Hook::new("first", |_: &mut dyn Event, _: Option<&SenderRef>| {});
        let second = Hook::new("second", |_: &mut dyn Event, _: Option<&SenderRef>| {});
        event.chain(first.clone()).chain(second.clone());

        let chained: Vec<_> = event
            .base()
            .chain()
            .iter()
            .map(|hook| hook.hook().unwrap().clone())
            .collect();
        assert_eq!(chained, [first, second]);
    }
}

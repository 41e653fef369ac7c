//! Hooks and hook references.
//!
//! A [`Hook`] is the erased form every listener is stored and called as. A
//! [`HookRef`] describes what the caller handed in before erasure: a closure
//! or function, a method bound to a receiver, a `Class::method` reference
//! resolved later by a catalog, an [`Invokable`] object, or an already erased
//! hook. Each invocable variant carries its hook and the declared
//! [`Signature`] the type resolver reads.
//!
//! # Listeners
//!
//! Functions and closures become hooks through [`Listener`], implemented for
//! every `Fn(&mut E)` and `Fn(&mut E, &S)` where `E` is an [`Event`] and `S` a
//! [`SenderType`]:
//!
//! ```rust,ignore
//! // Attached to `ValidateEvent`.
//! fn on_any_validate(event: &mut ValidateEvent) {}
//!
//! // Attached to `Processor::ValidateEvent`.
//! fn on_validate(event: &mut ValidateEvent, processor: &Processor) -> Result<(), MyError> {
//!     Ok(())
//! }
//! ```

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::panic::Location;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::error::{EventError, HookError, HookResult};
use crate::event::Event;
use crate::event_type::{SEPARATOR, qualify_type, short_type_name, type_path};
use crate::sender::{SenderClass, SenderRef, SenderType, downcast_sender};

// ============================================================================
// IntoHookResult - Handle hook return values
// ============================================================================

/// Return types accepted from hooks.
pub trait IntoHookResult {
    /// Converts the value into a hook result.
    fn into_hook_result(self) -> HookResult;
}

impl IntoHookResult for () {
    fn into_hook_result(self) -> HookResult {
        Ok(())
    }
}

impl<E: Into<HookError>> IntoHookResult for Result<(), E> {
    fn into_hook_result(self) -> HookResult {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Hook - Erased callable
// ============================================================================

/// The erased hook signature.
pub type HookFn = dyn Fn(&mut dyn Event, Option<&SenderRef>) -> HookResult + Send + Sync;

fn erase<F>(f: F) -> Arc<HookFn>
where
    F: Fn(&mut dyn Event, Option<&SenderRef>) -> HookResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered listener, callable with any event.
///
/// Hooks compare by identity. Clones of a hook are equal, and a function item
/// or non-capturing closure always turns into the same hook. Two hooks built
/// from a capturing closure are not equal.
#[derive(Clone)]
pub struct Hook {
    callable: Arc<HookFn>,
    label: Arc<str>,
}

impl Hook {
    /// Creates a hook from an erased callable.
    pub fn new<F, R>(label: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&mut dyn Event, Option<&SenderRef>) -> R + Send + Sync + 'static,
        R: IntoHookResult,
    {
        Self {
            callable: erase(move |event, sender| f(event, sender).into_hook_result()),
            label: label.into(),
        }
    }

    /// Creates a hook labelled with the callable's type name.
    pub fn from_fn<F, R>(f: F) -> Self
    where
        F: Fn(&mut dyn Event, Option<&SenderRef>) -> R + Send + Sync + 'static,
        R: IntoHookResult,
    {
        Self::new(type_name::<F>(), f)
    }

    /// Returns the same hook under another label.
    pub fn with_label(self, label: impl Into<Arc<str>>) -> Self {
        Self {
            callable: self.callable,
            label: label.into(),
        }
    }

    /// A human-readable description of the hook.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Calls the hook.
    pub fn call(&self, event: &mut dyn Event, sender: Option<&SenderRef>) -> HookResult {
        (self.callable)(event, sender)
    }

    /// The address identifying this hook.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.callable).cast::<()>() as usize
    }

    /// Returns whether both hooks are the same hook.
    pub fn ptr_eq(&self, other: &Hook) -> bool {
        self.addr() == other.addr()
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Hook {}

impl std::hash::Hash for Hook {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Hook").field(&self.label).finish()
    }
}

/// Borrows a type-erased event as `E`.
pub fn downcast_event<E: Event>(event: &mut dyn Event) -> Result<&mut E, EventError> {
    if !event.as_any().is::<E>() {
        return Err(EventError::EventTypeMismatch {
            expected: type_name::<E>(),
            got: event.qualified_type().to_owned(),
        });
    }
    event
        .as_any_mut()
        .downcast_mut::<E>()
        .ok_or_else(|| EventError::EventTypeMismatch {
            expected: type_name::<E>(),
            got: type_path::<E>().to_owned(),
        })
}

fn sender_as<'a, S: SenderType>(sender: Option<&'a SenderRef>) -> Result<&'a S, EventError> {
    sender
        .and_then(|s| downcast_sender::<S>(s.as_ref()))
        .ok_or_else(|| EventError::SenderMismatch {
            expected: type_name::<S>(),
            got: sender.map_or("none", |s| s.class().name()).to_owned(),
        })
}

// ============================================================================
// Signature
// ============================================================================

/// The declared type of one hook parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// An event type.
    Event {
        /// The Rust type name.
        rust_type: &'static str,
        /// The event type it is attached under, if statically known.
        event_type: Option<&'static str>,
    },
    /// A sender type.
    Sender(&'static SenderClass),
    /// Any other named type; used as the qualifying class name.
    Named(&'static str),
    /// No declared type.
    Untyped,
}

/// The declared parameters of a hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ParamType>,
}

impl Signature {
    /// An empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// The signature `(&mut E)`.
    pub fn of<E: Event>() -> Self {
        Self::new().event::<E>()
    }

    /// Appends an event parameter.
    pub fn event<E: Event>(self) -> Self {
        self.param(ParamType::Event {
            rust_type: type_name::<E>(),
            event_type: E::declared_type(),
        })
    }

    /// Appends a sender parameter.
    pub fn sender<S: SenderType>(self) -> Self {
        self.param(ParamType::Sender(S::CLASS))
    }

    /// Appends a parameter of a named type.
    pub fn named(self, name: &'static str) -> Self {
        self.param(ParamType::Named(name))
    }

    /// Appends an untyped parameter.
    pub fn untyped(self) -> Self {
        self.param(ParamType::Untyped)
    }

    /// Appends a parameter.
    pub fn param(mut self, param: ParamType) -> Self {
        self.params.push(param);
        self
    }

    /// The declared parameters.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }
}

// ============================================================================
// Invokable
// ============================================================================

/// An object that can be attached as a hook.
///
/// ```rust,ignore
/// struct Audit { log: Mutex<Vec<String>> }
///
/// impl Invokable for Audit {
///     fn signature(&self) -> Signature {
///         Signature::of::<ValidateEvent>().sender::<Processor>()
///     }
///
///     fn invoke(&self, event: &mut dyn Event, _: Option<&SenderRef>) -> HookResult {
///         self.log.lock().push(event.qualified_type().to_owned());
///         Ok(())
///     }
/// }
/// ```
pub trait Invokable: Send + Sync + 'static {
    /// The parameters the object declares.
    fn signature(&self) -> Signature;

    /// Handles an event.
    fn invoke(&self, event: &mut dyn Event, sender: Option<&SenderRef>) -> HookResult;
}

// ============================================================================
// HookRef
// ============================================================================

/// Memoization key identifying a hook reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookKey {
    /// A function or closure, by Rust type.
    Function(TypeId),
    /// A bound method, by receiver class, method name and call site.
    Method {
        class: &'static str,
        method: &'static str,
        file: &'static str,
        line: u32,
        column: u32,
    },
    /// A `Class::method` reference.
    Static(String),
    /// An invokable object, by address.
    Object(usize),
    /// An erased hook, by address.
    Erased(usize),
}

/// A hook as handed in by the caller.
#[derive(Clone)]
pub enum HookRef {
    /// A function or closure.
    Function {
        id: TypeId,
        signature: Signature,
        hook: Hook,
    },
    /// A method bound to a receiver.
    BoundMethod {
        class: &'static str,
        method: &'static str,
        location: &'static Location<'static>,
        signature: Signature,
        hook: Hook,
    },
    /// A `Class::method` reference, resolved by a catalog.
    StaticMethod { class: String, method: String },
    /// An invokable object.
    Invokable {
        target: Arc<dyn Invokable>,
        hook: Hook,
    },
    /// An already erased hook. It declares no parameters.
    Erased(Hook),
}

impl HookRef {
    /// Describes a function or closure.
    pub fn function<L, A>(listener: L) -> Self
    where
        L: Listener<A>,
    {
        listener.into_hook_ref()
    }

    /// Describes `method` bound to `receiver`.
    ///
    /// ```rust,ignore
    /// HookRef::method(counter.clone(), "on_validate", Counter::on_validate)
    /// ```
    #[track_caller]
    pub fn method<T, M, A>(receiver: Arc<T>, name: &'static str, method: M) -> Self
    where
        T: Send + Sync + 'static,
        M: MethodListener<T, A>,
    {
        let (signature, hook) = method.bind(receiver);
        Self::BoundMethod {
            class: type_name::<T>(),
            method: name,
            location: Location::caller(),
            signature,
            hook: hook.with_label(qualify_type(short_type_name::<T>(), name)),
        }
    }

    /// Describes a `Class::method` reference.
    pub fn static_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::StaticMethod {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Parses a `Class::method` reference, splitting at the last separator.
    pub fn parse_static(path: &str) -> Option<Self> {
        let (class, method) = path.rsplit_once(SEPARATOR)?;
        if class.is_empty() || method.is_empty() {
            return None;
        }
        Some(Self::static_method(class, method))
    }

    /// Describes an invokable object.
    pub fn invokable<T: Invokable>(target: Arc<T>) -> Self {
        let invoker = target.clone();
        let hook = Hook::new(type_name::<T>(), move |event, sender| {
            invoker.invoke(event, sender)
        });
        Self::Invokable { target, hook }
    }

    /// The memoization key of this reference.
    pub fn key(&self) -> HookKey {
        match self {
            Self::Function { id, .. } => HookKey::Function(*id),
            Self::BoundMethod {
                class,
                method,
                location,
                ..
            } => HookKey::Method {
                class: *class,
                method: *method,
                file: location.file(),
                line: location.line(),
                column: location.column(),
            },
            Self::StaticMethod { class, method } => HookKey::Static(qualify_type(class, method)),
            Self::Invokable { target, .. } => {
                HookKey::Object(Arc::as_ptr(target).cast::<()>() as usize)
            }
            Self::Erased(hook) => HookKey::Erased(hook.addr()),
        }
    }

    /// The hook to call, unless the reference still needs a catalog.
    pub fn hook(&self) -> Option<&Hook> {
        match self {
            Self::Function { hook, .. }
            | Self::BoundMethod { hook, .. }
            | Self::Invokable { hook, .. }
            | Self::Erased(hook) => Some(hook),
            Self::StaticMethod { .. } => None,
        }
    }
}

impl std::fmt::Debug for HookRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function { hook, .. } => f.debug_tuple("Function").field(hook).finish(),
            Self::BoundMethod {
                class,
                method,
                location,
                ..
            } => f
                .debug_struct("BoundMethod")
                .field("class", class)
                .field("method", method)
                .field("location", location)
                .finish(),
            Self::StaticMethod { class, method } => f
                .debug_struct("StaticMethod")
                .field("class", class)
                .field("method", method)
                .finish(),
            Self::Invokable { hook, .. } => f.debug_tuple("Invokable").field(hook).finish(),
            Self::Erased(hook) => f.debug_tuple("Erased").field(hook).finish(),
        }
    }
}

// ============================================================================
// Listener implementations for functions
// ============================================================================

/// Hooks of zero-sized callables, by callable type.
static STATELESS_HOOKS: LazyLock<Mutex<HashMap<TypeId, Hook>>> = LazyLock::new(Default::default);

/// The hook for `F`, shared across calls when `F` carries no state.
fn function_hook<F: 'static>(make: impl FnOnce() -> Hook) -> Hook {
    if size_of::<F>() != 0 {
        return make();
    }
    STATELESS_HOOKS
        .lock()
        .entry(TypeId::of::<F>())
        .or_insert_with(make)
        .clone()
}

/// Values that can be attached as hooks.
///
/// Implemented for closures and functions taking `(&mut E)` or
/// `(&mut E, &S)`, for [`Hook`] and for [`HookRef`] itself.
pub trait Listener<Args>: Sized {
    /// Describes the listener as a hook reference.
    fn into_hook_ref(self) -> HookRef;
}

impl<F, E, R> Listener<(E,)> for F
where
    F: Fn(&mut E) -> R + Send + Sync + 'static,
    E: Event,
    R: IntoHookResult,
{
    fn into_hook_ref(self) -> HookRef {
        let hook = function_hook::<F>(|| {
            Hook::new(type_name::<F>(), move |event, _sender| -> HookResult {
                let event = downcast_event::<E>(event)?;
                (self)(event).into_hook_result()
            })
        });
        HookRef::Function {
            id: TypeId::of::<F>(),
            signature: Signature::of::<E>(),
            hook,
        }
    }
}

impl<F, E, S, R> Listener<(E, S)> for F
where
    F: Fn(&mut E, &S) -> R + Send + Sync + 'static,
    E: Event,
    S: SenderType,
    R: IntoHookResult,
{
    fn into_hook_ref(self) -> HookRef {
        let hook = function_hook::<F>(|| {
            Hook::new(type_name::<F>(), move |event, sender| -> HookResult {
                let sender = sender_as::<S>(sender)?;
                let event = downcast_event::<E>(event)?;
                (self)(event, sender).into_hook_result()
            })
        });
        HookRef::Function {
            id: TypeId::of::<F>(),
            signature: Signature::of::<E>().sender::<S>(),
            hook,
        }
    }
}

impl Listener<Hook> for Hook {
    fn into_hook_ref(self) -> HookRef {
        HookRef::Erased(self)
    }
}

impl Listener<HookRef> for HookRef {
    fn into_hook_ref(self) -> HookRef {
        self
    }
}

/// Methods that can be bound to a receiver with [`HookRef::method`].
///
/// Implemented for `Fn(&T, &mut E)` and `Fn(&T, &mut E, &S)`.
pub trait MethodListener<T, Args>: Sized {
    /// Binds the method, returning its signature and hook.
    fn bind(self, receiver: Arc<T>) -> (Signature, Hook);
}

impl<T, F, E, R> MethodListener<T, (E,)> for F
where
    T: Send + Sync + 'static,
    F: Fn(&T, &mut E) -> R + Send + Sync + 'static,
    E: Event,
    R: IntoHookResult,
{
    fn bind(self, receiver: Arc<T>) -> (Signature, Hook) {
        let hook = Hook::new(type_name::<F>(), move |event, _sender| -> HookResult {
            let event = downcast_event::<E>(event)?;
            (self)(&receiver, event).into_hook_result()
        });
        (Signature::of::<E>(), hook)
    }
}

impl<T, F, E, S, R> MethodListener<T, (E, S)> for F
where
    T: Send + Sync + 'static,
    F: Fn(&T, &mut E, &S) -> R + Send + Sync + 'static,
    E: Event,
    S: SenderType,
    R: IntoHookResult,
{
    fn bind(self, receiver: Arc<T>) -> (Signature, Hook) {
        let hook = Hook::new(type_name::<F>(), move |event, sender| -> HookResult {
            let sender = sender_as::<S>(sender)?;
            let event = downcast_event::<E>(event)?;
            (self)(&receiver, event, sender).into_hook_result()
        });
        (Signature::of::<E>().sender::<S>(), hook)
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::event::EventBase;
    use crate::sender::Sender;

    struct Processor;

    impl Sender for Processor {
        fn class(&self) -> &'static SenderClass {
            Self::CLASS
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl SenderType for Processor {
        const CLASS: &'static SenderClass = &SenderClass::new("Processor");
    }

    struct Other;

    impl Sender for Other {
        fn class(&self) -> &'static SenderClass {
            Self::CLASS
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl SenderType for Other {
        const CLASS: &'static SenderClass = &SenderClass::new("Other");
    }

    struct ValidateEvent {
        base: EventBase,
        values: Vec<i32>,
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

    struct RenderEvent {
        base: EventBase,
    }

    impl Event for RenderEvent {
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

    fn validate_event(sender: SenderRef) -> ValidateEvent {
        ValidateEvent {
            base: EventBase::of::<ValidateEvent>(sender),
            values: vec![1, 2],
        }
    }

    #[test]
    fn test_hook_identity() {
        let hook = Hook::new("a", |_: &mut dyn Event, _: Option<&SenderRef>| {});
        let other = Hook::new("a", |_: &mut dyn Event, _: Option<&SenderRef>| {});
        assert_eq!(hook, hook.clone());
        assert_ne!(hook, other);
        assert_eq!(hook.clone().with_label("b"), hook);
    }

    #[test]
    fn test_function_items_share_a_hook() {
        fn on_validate(event: &mut ValidateEvent) {
            event.values.push(3);
        }

        let first = HookRef::function(on_validate);
        let second = HookRef::function(on_validate);
        assert_eq!(first.hook(), second.hook());

        let offset = 10;
        let capturing = || HookRef::function(move |event: &mut ValidateEvent| event.values.push(offset));
        assert_ne!(capturing().hook(), capturing().hook());
    }

    #[test]
    fn test_typed_listener_calls_through() {
        let hook_ref = HookRef::function(|event: &mut ValidateEvent, _: &Processor| {
            event.values.push(3);
        });
        assert!(hook_ref.hook().is_some());

        let sender: SenderRef = Arc::new(Processor);
        let mut event = validate_event(sender.clone());
        hook_ref
            .hook()
            .unwrap()
            .call(&mut event, Some(&sender))
            .unwrap();
        assert_eq!(event.values, [1, 2, 3]);
    }

    #[test]
    fn test_typed_listener_rejects_other_event() {
        let hook_ref = HookRef::function(|_: &mut ValidateEvent| {});
        let mut event = RenderEvent {
            base: EventBase::untargeted::<RenderEvent>(),
        };
        let err = hook_ref.hook().unwrap().call(&mut event, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EventError>(),
            Some(EventError::EventTypeMismatch { got, .. }) if got == type_path::<RenderEvent>()
        ));
    }

    #[test]
    fn test_typed_listener_rejects_other_sender() {
        let hook_ref = HookRef::function(|_: &mut ValidateEvent, _: &Processor| {});
        let sender: SenderRef = Arc::new(Other);
        let mut event = validate_event(sender.clone());
        let err = hook_ref
            .hook()
            .unwrap()
            .call(&mut event, Some(&sender))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EventError>(),
            Some(&EventError::SenderMismatch {
                expected: type_name::<Processor>(),
                got: "Other".to_owned(),
            })
        );
    }

    #[test]
    fn test_signatures() {
        let one = HookRef::function(|_: &mut ValidateEvent| {});
        let two = HookRef::function(|_: &mut ValidateEvent, _: &Processor| {});

        let HookRef::Function { signature, .. } = one else {
            panic!("expected a function reference");
        };
        assert_eq!(signature, Signature::of::<ValidateEvent>());

        let HookRef::Function { signature, .. } = two else {
            panic!("expected a function reference");
        };
        assert_eq!(
            signature.params()[1],
            ParamType::Sender(Processor::CLASS)
        );
    }

    #[test]
    fn test_hook_result_errors_pass_through() {
        #[derive(Debug, thiserror::Error)]
        #[error("boom")]
        struct Boom;

        let hook_ref = HookRef::function(|_: &mut ValidateEvent| Err::<(), _>(Boom));
        let sender: SenderRef = Arc::new(Processor);
        let mut event = validate_event(sender.clone());
        let err = hook_ref
            .hook()
            .unwrap()
            .call(&mut event, Some(&sender))
            .unwrap_err();
        assert!(err.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn test_bound_method() {
        struct Counter {
            calls: AtomicUsize,
        }

        impl Counter {
            fn on_validate(&self, _: &mut ValidateEvent, _: &Processor) {
                self.calls.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(Counter {
            calls: AtomicUsize::new(0),
        });
        let hook_ref = HookRef::method(counter.clone(), "on_validate", Counter::on_validate);
        let HookKey::Method { method, line, .. } = hook_ref.key() else {
            panic!("expected a method key");
        };
        assert_eq!(method, "on_validate");
        assert!(line > 0);

        let sender: SenderRef = Arc::new(Processor);
        let mut event = validate_event(sender.clone());
        let hook = hook_ref.hook().unwrap();
        assert_eq!(hook.label(), "Counter::on_validate");
        hook.call(&mut event, Some(&sender)).unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_static() {
        let HookRef::StaticMethod { class, method } =
            HookRef::parse_static("app::hooks::on_validate").unwrap()
        else {
            panic!("expected a static reference");
        };
        assert_eq!(class, "app::hooks");
        assert_eq!(method, "on_validate");
        assert!(HookRef::parse_static("on_validate").is_none());
        assert!(HookRef::parse_static("::on_validate").is_none());
    }
}

//! # Hookshot Core
//!
//! Foundation types of the Hookshot event dispatch library.
//!
//! ## Building Blocks
//!
//! - **Events**: values implementing [`Event`], built around an [`EventBase`]
//!   holding sender, type, stop flag, chain and call log
//! - **Senders**: objects events are emitted for, with a static
//!   [`SenderClass`] hierarchy used to qualify event types
//! - **Hooks**: erased listeners ([`Hook`]) and the descriptions callers hand
//!   in ([`HookRef`]), typed through [`Listener`] and [`Signature`]
//! - **Payload events**: runtime-typed events with JSON payloads
//! - **Profiler**: append-only logs of unused types and hook calls
//!
//! The registry and the dispatch engine live in `hookshot-framework`.
//!
//! ## Event Types
//!
//! ```text
//! ValidateEvent                 unqualified: events emitted without a sender
//! Processor::ValidateEvent      qualified: senders of class Processor
//!                               (and classes deriving from it)
//! ```
//!
//! Unless an event sets its type explicitly, its type is the path of its
//! struct written with dots (`app.orders.ValidateEvent`), and a sender class
//! defaults to the struct's Rust path (`app::orders::Processor`).

pub mod error;
pub mod event;
pub mod event_type;
pub mod hook;
pub mod payload;
pub mod profiler;
pub mod sender;

pub use error::{EventError, EventResult, HookError, HookResult};
pub use event::{Event, EventBase, UsedBy};
pub use event_type::{
    PATH_SEPARATOR, SEPARATOR, is_qualified, qualify_type, short_type_name, split_qualified,
    type_path,
};
pub use hook::{
    Hook, HookFn, HookKey, HookRef, IntoHookResult, Invokable, Listener, MethodListener,
    ParamType, Signature, downcast_event,
};
pub use payload::{PayloadEvent, RESERVED_PROPERTIES, check_reserved, from_params, is_reserved};
pub use profiler::{CallRecord, EventProfiler, UnusedRecord};
pub use sender::{
    SENDER_CLASSES, Sender, SenderClass, SenderRef, SenderType, downcast_sender, lookup_class,
    register_class, sender_ptr,
};

// Re-exported for the code generated by `hookshot-macros`.
pub use linkme;

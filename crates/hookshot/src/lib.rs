//! # Hookshot
//!
//! A typed, in-process event dispatch library.
//!
//! ## Overview
//!
//! Events are plain structs embedding an `EventBase`. Hooks are closures or
//! functions whose parameter types say what they listen to: a hook taking
//! `(&mut SaveEvent, &Processor)` is attached to `Processor::SaveEvent`, and
//! also fires for senders whose class derives from `Processor`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ emit ┌────────────┐ hooks of  ┌──────────────────────────────┐
//! │  Caller  │─────▶│ Dispatcher │──────────▶│ Derived::Evt ─▶ Base::Evt    │ main phase
//! └──────────┘      │            │           └──────────────────────────────┘
//!                   │            │──────────▶ event.chain(..) hooks            chain phase
//!                   └────────────┘──────────▶ EventProfiler
//! ```
//!
//! - **Core**: events, senders, hooks and the profiler
//! - **Framework**: the registry, dispatch, type resolution and the provider
//! - **Macros**: `#[derive(Event)]`, `#[derive(Sender)]` and `#[listen]`
//! - **Runtime**: configuration files, logging and startup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hookshot::prelude::*;
//!
//! #[derive(Sender)]
//! struct Processor;
//!
//! #[derive(Event)]
//! struct ProcessEvent {
//!     base: EventBase,
//!     values: Vec<i32>,
//! }
//!
//! let events = EventCollection::new();
//! events.attach(|event: &mut ProcessEvent, _: &Processor| {
//!     event.values.iter_mut().for_each(|v| *v += 10);
//! })?;
//!
//! let sender: SenderRef = Arc::new(Processor);
//! let event = events.emit(ProcessEvent {
//!     base: EventBase::of::<ProcessEvent>(sender),
//!     values: vec![1, 2],
//! })?;
//! assert_eq!(event.values, [11, 12]);
//! ```
//!
//! ## Features
//!
//! - `toml-config`: Read `hookshot.toml` (default)
//! - `yaml-config`: Read `hookshot.yaml`
//! - `json-log`: JSON log lines
//!
//! The derive macros expand to paths in `hookshot_core` and
//! `hookshot_framework`, so crates using them depend on both.

pub use hookshot_core as core;
pub use hookshot_framework as framework;
pub use hookshot_runtime as runtime;

pub use hookshot_macros::{Event, Sender, listen};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use hookshot::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Runtime - configured startup
    pub use hookshot_runtime::EventRuntime;

    // Registry and dispatch
    pub use hookshot_framework::{
        DetachHandle, EventCollection, EventCollectionProvider, EventConfig, HookCatalog,
    };

    // Events, senders and hooks
    pub use hookshot_core::{
        Event, EventBase, EventError, Hook, HookError, HookRef, HookResult, PayloadEvent,
        Sender, SenderRef, SenderType,
    };

    // Derives, named after the traits they implement
    pub use hookshot_macros::{Event, Sender, listen};
}

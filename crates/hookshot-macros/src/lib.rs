//! Procedural macros for the Hookshot event dispatch library.
//!
//! This crate provides:
//!
//! - `#[derive(Event)]` - Implements `Event` around an `EventBase` field
//! - `#[derive(Sender)]` - Implements `Sender` and `SenderType`, with an
//!   optional parent class embedded as a field
//! - `#[listen]` - Registers a free function in the listener catalog
//!
//! # Example
//!
//! ```rust,ignore
//! use hookshot::prelude::*;
//!
//! #[derive(Sender)]
//! struct Processor;
//!
//! #[derive(Sender)]
//! struct BatchProcessor {
//!     #[sender(parent)]
//!     processor: Processor,
//! }
//!
//! #[derive(Event)]
//! #[event(type = "process:before")]
//! struct BeforeProcessEvent {
//!     #[event(base)]
//!     base: EventBase,
//!     values: Vec<i32>,
//! }
//!
//! // Registered as `my_app::hooks::on_before_process`, attached to
//! // `Processor::process:before`.
//! #[listen]
//! fn on_before_process(event: &mut BeforeProcessEvent, _: &Processor) {
//!     event.values.retain(|v| *v >= 0);
//! }
//! ```

mod event;
mod listen;
mod sender;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `Event` for a struct embedding an `EventBase`.
///
/// # Attributes
///
/// - `#[event(type = "...")]` - Override the event type (default: the struct path joined with `.`)
/// - `#[event(base)]` on a field - Mark the `EventBase` field (detected by type
///   when omitted)
///
/// Fields named `sender`, `target`, `stopped`, `chain`, `used` or `used_by` are
/// rejected: those names belong to the event's structural properties.
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match event::derive_event(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Derives `Sender` and `SenderType` for a struct.
///
/// # Attributes
///
/// - `#[sender(name = "...")]` - Override the class name (default: the struct path, `module::Name`)
/// - `#[sender(parent)]` on a field - The embedded parent sender; the class
///   derives from the parent's class and the struct derefs to the parent
#[proc_macro_derive(Sender, attributes(sender))]
pub fn derive_sender(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match sender::derive_sender(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Registers a free function as a listener.
///
/// The function is added to the catalog under `module_path::fn_name`, or
/// `class::fn_name` with `#[listen(class = "...")]`, and can then be named
/// from configuration files.
///
/// ```rust,ignore
/// #[listen(class = "Hooks")]
/// fn on_validate(event: &mut ValidateEvent, processor: &Processor) {}
/// ```
#[proc_macro_attribute]
pub fn listen(attr: TokenStream, item: TokenStream) -> TokenStream {
    listen::listen(attr, item)
}

//! Event type strings.
//!
//! An event type is either *unqualified* (`ValidateEvent`) or *qualified* by
//! the class of the sender that emits it (`Processor::ValidateEvent`).
//! Unqualified types never contain [`SEPARATOR`]; a qualified type is split at
//! its last separator so sender class names may themselves be paths.
//!
//! Events without an explicit type are typed by [`type_path`]: the Rust path
//! of the event struct with its segments joined by `.`, such as
//! `app.billing.SaveEvent`. Two event structs only share a type when they
//! share a path.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;

/// Separator between a sender class and an event type.
pub const SEPARATOR: &str = "::";

/// Separator between the path segments of a derived event type.
pub const PATH_SEPARATOR: &str = ".";

static TYPE_PATHS: LazyLock<RwLock<HashMap<TypeId, &'static str>>> =
    LazyLock::new(Default::default);

/// Qualifies an event type with a sender class.
///
/// ```rust,ignore
/// assert_eq!(qualify_type("Processor", "ValidateEvent"), "Processor::ValidateEvent");
/// ```
pub fn qualify_type(class: &str, event_type: &str) -> String {
    let mut qualified = String::with_capacity(class.len() + SEPARATOR.len() + event_type.len());
    qualified.push_str(class);
    qualified.push_str(SEPARATOR);
    qualified.push_str(event_type);
    qualified
}

/// Returns whether the type is qualified with a sender class.
pub fn is_qualified(event_type: &str) -> bool {
    event_type.contains(SEPARATOR)
}

/// Splits a qualified type into `(class, unqualified type)`.
pub fn split_qualified(event_type: &str) -> Option<(&str, &str)> {
    event_type.rsplit_once(SEPARATOR)
}

/// Returns the bare name of a Rust type: no module path, no generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let base = without_generics(type_name::<T>());
    base.rsplit(SEPARATOR).next().unwrap_or(base)
}

/// Returns the event type derived from a Rust type: its full path without
/// generic arguments, segments joined by [`PATH_SEPARATOR`].
///
/// ```rust,ignore
/// mod billing { pub struct SaveEvent; }
/// assert_eq!(type_path::<billing::SaveEvent>(), "app.billing.SaveEvent");
/// ```
pub fn type_path<T: ?Sized + 'static>() -> &'static str {
    let id = TypeId::of::<T>();
    if let Some(path) = TYPE_PATHS.read().get(&id) {
        return *path;
    }
    let path = without_generics(type_name::<T>()).replace(SEPARATOR, PATH_SEPARATOR);
    *TYPE_PATHS
        .write()
        .entry(id)
        .or_insert_with(|| Box::leak(path.into_boxed_str()))
}

fn without_generics(name: &str) -> &str {
    name.split('<').next().unwrap_or(name)
}

//! Senders and their class hierarchy.
//!
//! A *sender* is the object an event is emitted on behalf of. Every sender
//! type has a static [`SenderClass`] describing its name and parent class;
//! hooks attached to `Parent::SomeEvent` also see events emitted by senders
//! of any descendant class.
//!
//! # Parent-in-child composition
//!
//! Class inheritance is modelled by embedding the parent value in the child
//! and exposing it through [`Sender::upcast_ref`]. A hook declared for the
//! parent type can then borrow the parent part of a child sender:
//!
//! ```rust,ignore
//! #[derive(Sender)]
//! struct Processor;
//!
//! #[derive(Sender)]
//! struct BatchProcessor {
//!     #[sender(parent)]
//!     processor: Processor,
//!     size: usize,
//! }
//! ```
//!
//! # Class catalog
//!
//! Consolidation needs to go from a class *name* back to its descriptor. The
//! catalog is seeded from [`SENDER_CLASSES`] (populated by
//! `#[derive(Sender)]`) and grows through [`register_class`], which the
//! dispatch engine calls for every sender it sees.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use linkme::distributed_slice;
use parking_lot::RwLock;
use tracing::warn;

// =============================================================================
// Sender Class
// =============================================================================

/// Static descriptor of a sender type.
#[derive(Debug, PartialEq, Eq)]
pub struct SenderClass {
    name: &'static str,
    parent: Option<&'static SenderClass>,
}

impl SenderClass {
    /// Creates a root class.
    pub const fn new(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Creates a class derived from `parent`.
    pub const fn with_parent(name: &'static str, parent: &'static SenderClass) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// The class name used to qualify event types.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The parent class, if any.
    pub fn parent(&self) -> Option<&'static SenderClass> {
        self.parent
    }

    /// Iterates from this class up to the root class.
    pub fn ancestors(&self) -> impl Iterator<Item = &SenderClass> {
        std::iter::successors(Some(self), |class| class.parent)
    }

    /// Returns whether this class is `name` or derives from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestors().any(|class| class.name == name)
    }
}

// =============================================================================
// Sender Traits
// =============================================================================

/// An object events can be emitted on behalf of.
///
/// Usually derived with `#[derive(Sender)]`.
pub trait Sender: Any + Send + Sync {
    /// The runtime class of this sender.
    fn class(&self) -> &'static SenderClass;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a view of this sender as the Rust type identified by
    /// `type_id`: itself, or one of the parents it embeds.
    fn upcast_ref(&self, type_id: TypeId) -> Option<&dyn Any> {
        let any = self.as_any();
        (Any::type_id(any) == type_id).then_some(any)
    }
}

/// A concrete sender type with a statically known class.
pub trait SenderType: Sender + Sized {
    /// The class descriptor of this type.
    const CLASS: &'static SenderClass;
}

/// Shared handle to a sender, as carried by events.
pub type SenderRef = Arc<dyn Sender>;

impl std::fmt::Debug for dyn Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sender").field(&self.class().name()).finish()
    }
}

/// Borrows the sender as `T`, looking through embedded parents.
pub fn downcast_sender<T: Sender>(sender: &dyn Sender) -> Option<&T> {
    sender
        .upcast_ref(TypeId::of::<T>())
        .and_then(|any| any.downcast_ref::<T>())
}

/// Address identifying a shared sender object.
pub fn sender_ptr<T: ?Sized>(sender: &Arc<T>) -> *const () {
    Arc::as_ptr(sender).cast::<()>()
}

// =============================================================================
// Class Catalog
// =============================================================================

/// Sender classes registered at link time by `#[derive(Sender)]`.
#[distributed_slice]
pub static SENDER_CLASSES: [&'static SenderClass];

static CLASSES: LazyLock<RwLock<HashMap<&'static str, &'static SenderClass>>> =
    LazyLock::new(|| {
        let mut classes = HashMap::new();
        for class in SENDER_CLASSES.iter() {
            insert_lineage(&mut classes, class);
        }
        RwLock::new(classes)
    });

fn insert_lineage(
    classes: &mut HashMap<&'static str, &'static SenderClass>,
    class: &'static SenderClass,
) {
    let mut current = Some(class);
    while let Some(class) = current {
        match classes.get(class.name) {
            Some(known) if **known != *class => {
                warn!(class = class.name, "Sender class name registered twice, keeping the first");
            }
            Some(_) => {}
            None => {
                classes.insert(class.name, class);
            }
        }
        current = class.parent;
    }
}

/// Registers a class and its ancestors in the class catalog.
pub fn register_class(class: &'static SenderClass) {
    if CLASSES.read().contains_key(class.name) {
        return;
    }
    insert_lineage(&mut CLASSES.write(), class);
}

/// Looks up a class by name.
pub fn lookup_class(name: &str) -> Option<&'static SenderClass> {
    CLASSES.read().get(name).copied()
}

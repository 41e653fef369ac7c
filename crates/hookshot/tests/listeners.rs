//! Listeners registered with `#[listen]` and attached by name.

use std::sync::Arc;

use hookshot::core::EventProfiler;
use hookshot::framework::ConfigBuilder;
use hookshot::prelude::*;

#[derive(Sender)]
#[sender(name = "Archive")]
struct Archive;

#[derive(Event)]
struct SaveEvent {
    base: EventBase,
    log: Vec<&'static str>,
}

impl SaveEvent {
    fn untargeted() -> Self {
        Self {
            base: EventBase::untargeted::<Self>(),
            log: Vec::new(),
        }
    }

    fn archived() -> Self {
        Self {
            base: EventBase::of::<Self>(Arc::new(Archive)),
            log: Vec::new(),
        }
    }
}

mod hooks {
    use super::*;

    #[listen]
    pub fn on_save(event: &mut SaveEvent) {
        event.log.push("on_save");
    }

    #[listen(class = "Audit")]
    pub fn on_archive_save(event: &mut SaveEvent, _: &Archive) {
        event.log.push("on_archive_save");
        event.chain(HookRef::static_method("Audit", "after_archive_save"));
    }

    #[listen(class = "Audit")]
    pub fn after_archive_save(event: &mut SaveEvent) {
        event.log.push("after_archive_save");
    }
}

fn with_listeners() -> EventCollection {
    EventCollection::builder()
        .catalog(Arc::new(HookCatalog::from_listeners()))
        .profiler(Arc::new(EventProfiler::new()))
        .build()
        .unwrap()
}

#[test]
fn test_catalog_collects_listeners() {
    let catalog = HookCatalog::from_listeners();

    assert_eq!(catalog.len(), 3);
    assert!(catalog.get("listeners::hooks::on_save").is_some());
    assert!(catalog.get("Audit::on_archive_save").is_some());
    assert!(catalog.get("Audit::after_archive_save").is_some());
}

#[test]
fn test_attach_listeners_by_signature() {
    let events = with_listeners();
    let attached = events.attach_listeners(events.catalog()).unwrap();

    assert_eq!(attached, 3);
    assert_eq!(
        events.types(),
        ["Archive::listeners.SaveEvent", "listeners.SaveEvent"]
    );

    // Unqualified hooks are not part of qualified lookups; the chained
    // reference is resolved when the chain runs.
    let event = events.emit(SaveEvent::archived()).unwrap();
    assert_eq!(event.log, ["on_archive_save", "after_archive_save"]);

    // Listeners are attached in name order, so the last name runs first.
    let event = events.emit(SaveEvent::untargeted()).unwrap();
    assert_eq!(event.log, ["on_save", "after_archive_save"]);
}

#[test]
fn test_static_references() {
    let config = ConfigBuilder::new()
        .attach_to::<Archive, SaveEvent, _>(HookRef::static_method("Audit", "on_archive_save"))
        .build();
    let events = EventCollection::builder()
        .catalog(Arc::new(HookCatalog::from_listeners()))
        .profiler(Arc::new(EventProfiler::new()))
        .config(config)
        .build()
        .unwrap();

    // Resolved through the catalog's signature.
    events
        .attach(HookRef::parse_static("listeners::hooks::on_save").unwrap())
        .unwrap();

    assert_eq!(
        events.emit(SaveEvent::archived()).unwrap().log,
        ["on_archive_save", "after_archive_save"]
    );
    assert_eq!(events.emit(SaveEvent::untargeted()).unwrap().log, ["on_save"]);
}

#[test]
fn test_unknown_static_reference() {
    let events = with_listeners();

    let err = events
        .attach(HookRef::static_method("Audit", "on_delete"))
        .unwrap_err();
    assert!(matches!(err, EventError::InvalidHook { .. }));
    assert!(events.types().is_empty());
}

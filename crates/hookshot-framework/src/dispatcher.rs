//! Dispatch engine.
//!
//! Emitting an event runs in two phases:
//!
//! 1. **Main phase**: the hooks returned by
//!    [`get_hooks`](EventCollection::get_hooks) for the event's qualified
//!    type, front to back.
//! 2. **Chain phase**: the hooks appended to the event's chain during the
//!    main phase, in the order they were appended.
//!
//! A hook stopping the event ends dispatch, skipping the chain phase. A hook
//! returning an error ends dispatch too, and the error is returned to the
//! caller unchanged.
//!
//! Every call is recorded in the collection's profiler, including calls that
//! fail or panic, and on the event itself (see [`Event::used_by`]).
//!
//! ```rust,ignore
//! let event = events.emit(ValidateEvent {
//!     base: EventBase::of::<ValidateEvent>(processor.clone()),
//!     values: vec![1, 2, 3],
//!     valid: false,
//! })?;
//! assert!(event.valid);
//! ```

use std::time::SystemTime;

use tracing::{Level, debug, span, trace};

use crate::registry::EventCollection;
use hookshot_core::{Event, EventProfiler, Hook, HookError, HookResult, UsedBy, register_class};

/// Times one hook call and records it when finished or dropped.
struct CallSpan<'a> {
    profiler: &'a EventProfiler,
    event_type: &'a str,
    hook: Hook,
    started_at: SystemTime,
    done: bool,
}

impl<'a> CallSpan<'a> {
    fn start(profiler: &'a EventProfiler, event_type: &'a str, hook: Hook) -> Self {
        Self {
            profiler,
            event_type,
            hook,
            started_at: SystemTime::now(),
            done: false,
        }
    }

    fn finish(mut self) -> UsedBy {
        self.done = true;
        let finished_at = SystemTime::now();
        self.profiler
            .add_call(self.event_type, self.hook.clone(), self.started_at);
        UsedBy {
            hook: self.hook.clone(),
            started_at: self.started_at,
            finished_at,
        }
    }
}

impl Drop for CallSpan<'_> {
    fn drop(&mut self) {
        if !self.done {
            // Unwinding out of the hook.
            self.profiler
                .add_call(self.event_type, self.hook.clone(), self.started_at);
        }
    }
}

impl EventCollection {
    /// Dispatches `event` and hands it back.
    ///
    /// # Errors
    ///
    /// The first error returned by a hook.
    pub fn emit<E: Event>(&self, mut event: E) -> Result<E, HookError> {
        self.dispatch(&mut event)?;
        Ok(event)
    }

    /// Dispatches a borrowed event.
    pub fn dispatch(&self, event: &mut dyn Event) -> HookResult {
        let event_type = event.qualified_type().to_owned();
        let span = span!(Level::DEBUG, "dispatch", event_type = %event_type);
        let _enter = span.enter();

        if let Some(sender) = event.sender() {
            register_class(sender.class());
        }
        if self.is_skippable(&event_type) {
            return Ok(());
        }

        let hooks = self.get_hooks(&event_type);
        if hooks.is_empty() {
            debug!("No hooks attached");
            self.profiler().add_unused(&event_type);
            self.skip(&event_type);
            return Ok(());
        }

        self.process_chain(event, &event_type, hooks)?;
        if event.stopped() || event.base().chain().is_empty() {
            return Ok(());
        }

        let chain = event
            .base()
            .chain()
            .iter()
            .map(|hook| self.resolve_hook(hook))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(count = chain.len(), "Running chained hooks");
        self.process_chain(event, &event_type, chain)
    }

    fn process_chain(
        &self,
        event: &mut dyn Event,
        event_type: &str,
        hooks: Vec<Hook>,
    ) -> HookResult {
        let sender = event.sender().cloned();
        for hook in hooks {
            let original = self.resolve_original_hook(&hook);
            trace!(hook = original.label(), "Calling hook");

            let call = CallSpan::start(self.profiler(), event_type, original);
            let result = hook.call(event, sender.as_ref());
            event.base_mut().record_use(call.finish());
            result?;

            if event.stopped() {
                trace!(hook = hook.label(), "Event stopped");
                return Ok(());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use hookshot_core::{EventBase, EventError, HookRef, SenderRef, type_path};
    use hookshot_macros::{Event, Sender};

    #[derive(Sender)]
    struct DispatchBase;

    #[derive(Sender)]
    struct DispatchDerived {
        #[sender(parent)]
        base: DispatchBase,
    }

    #[derive(Debug, Event)]
    struct RecordEvent {
        #[event(base)]
        base: EventBase,
        calls: Vec<&'static str>,
    }

    impl RecordEvent {
        fn untargeted() -> Self {
            Self {
                base: EventBase::untargeted::<Self>(),
                calls: Vec::new(),
            }
        }

        fn sent_by(sender: SenderRef) -> Self {
            Self {
                base: EventBase::of::<Self>(sender),
                calls: Vec::new(),
            }
        }
    }

    fn record_type() -> &'static str {
        type_path::<RecordEvent>()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("hook failed")]
    struct HookFailed;

    fn isolated() -> EventCollection {
        EventCollection::builder()
            .profiler(Arc::new(EventProfiler::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_emit_runs_hooks_lifo() {
        let events = isolated();
        events
            .attach(|event: &mut RecordEvent| event.calls.push("first"))
            .unwrap();
        events
            .attach(|event: &mut RecordEvent| event.calls.push("second"))
            .unwrap();

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["second", "first"]);
        assert_eq!(event.used(), 2);
    }

    #[test]
    fn test_stop_skips_remaining_and_chain() {
        let events = isolated();
        events
            .attach(|event: &mut RecordEvent| event.calls.push("never"))
            .unwrap();
        events
            .attach(|event: &mut RecordEvent| {
                event.calls.push("stopper");
                event.chain(|event: &mut RecordEvent| event.calls.push("chained"));
                event.stop();
            })
            .unwrap();

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["stopper"]);
        assert!(event.stopped());
    }

    #[test]
    fn test_chain_runs_after_main_phase() {
        let events = isolated();
        events
            .attach(|event: &mut RecordEvent| event.calls.push("main-2"))
            .unwrap();
        events
            .attach(|event: &mut RecordEvent| {
                event.calls.push("main-1");
                event
                    .chain(|event: &mut RecordEvent| event.calls.push("chain-1"))
                    .chain(|event: &mut RecordEvent| event.calls.push("chain-2"));
            })
            .unwrap();

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["main-1", "main-2", "chain-1", "chain-2"]);
        assert_eq!(event.used(), 4);
    }

    #[test]
    fn test_chained_hook_can_stop() {
        let events = isolated();
        events
            .attach(|event: &mut RecordEvent| {
                event
                    .chain(|event: &mut RecordEvent| {
                        event.calls.push("chain-1");
                        event.stop();
                    })
                    .chain(|event: &mut RecordEvent| event.calls.push("chain-2"));
            })
            .unwrap();

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["chain-1"]);
    }

    #[test]
    fn test_unused_type_is_skipped() {
        let events = isolated();
        events.emit(RecordEvent::untargeted()).unwrap();
        events.emit(RecordEvent::untargeted()).unwrap();

        assert!(events.is_skippable(record_type()));
        assert_eq!(events.profiler().unused_for(record_type()).len(), 1);

        events
            .attach(|event: &mut RecordEvent| event.calls.push("late"))
            .unwrap();
        assert!(!events.is_skippable(record_type()));
        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["late"]);
    }

    #[test]
    fn test_base_hooks_run_for_derived_sender() {
        let events = isolated();
        events
            .attach(|event: &mut RecordEvent, _: &DispatchBase| event.calls.push("base"))
            .unwrap();
        events
            .attach(|event: &mut RecordEvent, _: &DispatchDerived| event.calls.push("derived"))
            .unwrap();

        let sender: SenderRef = Arc::new(DispatchDerived { base: DispatchBase });
        let event = events.emit(RecordEvent::sent_by(sender)).unwrap();
        assert_eq!(event.calls, ["derived", "base"]);

        let sender: SenderRef = Arc::new(DispatchBase);
        let event = events.emit(RecordEvent::sent_by(sender)).unwrap();
        assert_eq!(event.calls, ["base"]);
    }

    #[test]
    fn test_error_stops_dispatch_and_is_returned() {
        let events = isolated();
        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        events
            .attach(move |_: &mut RecordEvent| {
                *flag.lock() = true;
            })
            .unwrap();
        events
            .attach(|_: &mut RecordEvent| Err::<(), _>(HookFailed))
            .unwrap();

        let err = events.emit(RecordEvent::untargeted()).unwrap_err();
        assert!(err.downcast_ref::<HookFailed>().is_some());
        assert!(!*ran.lock());
        assert_eq!(events.profiler().calls_for(record_type()).len(), 1);
    }

    #[test]
    fn test_panicking_hook_is_profiled() {
        let events = isolated();
        events
            .attach(|_: &mut RecordEvent| -> HookResult { panic!("hook panicked") })
            .unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _ = events.emit(RecordEvent::untargeted());
        }));
        assert!(result.is_err());
        assert_eq!(events.profiler().calls_for(record_type()).len(), 1);
    }

    #[test]
    fn test_profile_records_original_hook() {
        let events = isolated();
        let hook_ref = HookRef::function(|event: &mut RecordEvent| event.calls.push("once"));
        let original = hook_ref.hook().cloned().unwrap();
        events.once(hook_ref).unwrap();

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["once"]);
        assert_eq!(event.used_by()[0].hook, original);

        let calls = events.profiler().calls_for(record_type());
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].hook, original);
        assert!(calls[0].finished_at >= calls[0].started_at);

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert!(event.calls.is_empty());
    }

    #[test]
    fn test_attach_to_filters_by_instance() {
        let events = isolated();
        let first = Arc::new(DispatchBase);
        let second = Arc::new(DispatchBase);
        events
            .attach_to(&first, |event: &mut RecordEvent, _: &DispatchBase| {
                event.calls.push("first");
            })
            .unwrap();

        let event = events.emit(RecordEvent::sent_by(first.clone())).unwrap();
        assert_eq!(event.calls, ["first"]);
        let event = events.emit(RecordEvent::sent_by(second.clone())).unwrap();
        assert!(event.calls.is_empty());
    }

    #[test]
    fn test_hooks_can_emit_recursively() {
        let events = isolated();
        let inner = events.clone();
        let nested = AtomicBool::new(false);
        events
            .attach(move |event: &mut RecordEvent| {
                event.calls.push("outer");
                if !nested.swap(true, Ordering::SeqCst) {
                    let nested = inner.emit(RecordEvent::untargeted())?;
                    event.calls.extend(nested.calls);
                }
                Ok::<(), HookError>(())
            })
            .unwrap();

        let event = events.emit(RecordEvent::untargeted()).unwrap();
        assert_eq!(event.calls, ["outer", "outer"]);
    }

    #[test]
    fn test_unknown_chained_reference_fails() {
        let events = isolated();
        events
            .attach(|event: &mut RecordEvent| {
                event.chain(HookRef::static_method("hooks", "missing"));
            })
            .unwrap();

        let err = events.emit(RecordEvent::untargeted()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EventError>(),
            Some(EventError::InvalidHook { .. })
        ));
    }
}

//! Event profiling.
//!
//! The profiler keeps two append-only logs: event types emitted while no hook
//! was attached to them, and every hook call made by the dispatch engine.
//! Nothing is ever evicted. The logs are meant for inspection and tests; the
//! dispatch engine never reads them back.

use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use crate::hook::Hook;

/// An emission of a type that had no hooks.
#[derive(Debug, Clone)]
pub struct UnusedRecord {
    /// When the event was emitted.
    pub at: SystemTime,
    /// The qualified type of the event.
    pub event_type: String,
}

/// A completed hook call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// When the call returned or unwound.
    pub finished_at: SystemTime,
    /// The qualified type of the event.
    pub event_type: String,
    /// The hook as attached by the caller.
    pub hook: Hook,
    /// When the call started.
    pub started_at: SystemTime,
}

impl CallRecord {
    /// Wall time spent in the call.
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or_default()
    }
}

static GLOBAL: LazyLock<Arc<EventProfiler>> = LazyLock::new(Arc::default);

/// Append-only logs of unused types and hook calls.
#[derive(Debug, Default)]
pub struct EventProfiler {
    unused: Mutex<Vec<UnusedRecord>>,
    calls: Mutex<Vec<CallRecord>>,
}

impl EventProfiler {
    /// Creates an empty profiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide profiler collections use unless given their own.
    pub fn global() -> Arc<Self> {
        GLOBAL.clone()
    }

    /// Records an emission of a type without hooks.
    pub fn add_unused(&self, event_type: &str) {
        self.unused.lock().push(UnusedRecord {
            at: SystemTime::now(),
            event_type: event_type.to_owned(),
        });
    }

    /// Records a completed hook call.
    pub fn add_call(&self, event_type: &str, hook: Hook, started_at: SystemTime) {
        self.calls.lock().push(CallRecord {
            finished_at: SystemTime::now(),
            event_type: event_type.to_owned(),
            hook,
            started_at,
        });
    }

    /// A snapshot of the unused log.
    pub fn unused(&self) -> Vec<UnusedRecord> {
        self.unused.lock().clone()
    }

    /// A snapshot of the call log.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().clone()
    }

    /// Unused records of one type.
    pub fn unused_for(&self, event_type: &str) -> Vec<UnusedRecord> {
        self.unused
            .lock()
            .iter()
            .filter(|record| record.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Call records of one type.
    pub fn calls_for(&self, event_type: &str) -> Vec<CallRecord> {
        self.calls
            .lock()
            .iter()
            .filter(|record| record.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::sender::SenderRef;

    #[test]
    fn test_logs_are_append_only() {
        let profiler = EventProfiler::new();
        let hook = Hook::new("noop", |_: &mut dyn Event, _: Option<&SenderRef>| {});

        profiler.add_unused("A::Nothing");
        profiler.add_unused("A::Nothing");
        profiler.add_call("A::Something", hook.clone(), SystemTime::now());

        assert_eq!(profiler.unused().len(), 2);
        assert_eq!(profiler.unused_for("A::Nothing").len(), 2);
        assert!(profiler.unused_for("A::Something").is_empty());

        let calls = profiler.calls_for("A::Something");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].hook, hook);
        assert!(calls[0].finished_at >= calls[0].started_at);
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&EventProfiler::global(), &EventProfiler::global()));
    }
}

//! Progress reporting (§4.8/§9): the orchestrator narrates a sync/install/
//! update/uninstall/cleanup run through a single [`EventSink`] callback
//! rather than a multi-method reporter trait. Implementations are invoked
//! synchronously from the caller's thread; no queuing or thread-hopping is
//! prescribed here, so a terminal UI, a log line, or a test probe can all
//! implement it directly.

use std::sync::Arc;

/// One point in an orchestrator run. Each variant that concerns a specific
/// artifact carries an optional step id (`"name@version"`, matching
/// [`crate::resolver::PlanStep::id`]); run-wide variants do not.
#[derive(Debug, Clone)]
pub enum Event {
    /// A plan is being assembled; no per-artifact step exists yet.
    Planning {
        /// Free-form description of what's being planned.
        message: String,
    },
    /// The resolver is working on a particular name.
    Resolving {
        /// `"name@version"` once a version has been selected, `None`
        /// while still evaluating constraints for `name`.
        step: Option<String>,
        /// Free-form description.
        message: String,
    },
    /// An artifact is being fetched.
    Downloading {
        /// `"name@version"` of the artifact being fetched.
        step: Option<String>,
        /// Free-form description, e.g. progress or a URL.
        message: String,
    },
    /// A fresh artifact is being written to disk.
    Installing {
        /// `"name@version"` of the artifact being installed.
        step: Option<String>,
        /// Free-form description.
        message: String,
    },
    /// An existing artifact is being replaced with a new version.
    Updating {
        /// `"name@version"` of the artifact's new version.
        step: Option<String>,
        /// Free-form description.
        message: String,
    },
    /// An installed artifact is being removed.
    Uninstalling {
        /// `"name@version"` of the artifact being removed.
        step: Option<String>,
        /// Free-form description.
        message: String,
    },
    /// A plan step required no action.
    Skipping {
        /// `"name@version"` of the artifact being skipped.
        step: Option<String>,
        /// The reason no action was taken.
        message: String,
    },
    /// An orphaned automatic artifact is being swept.
    Cleanup {
        /// Free-form description.
        message: String,
    },
    /// A step, or the run as a whole, failed.
    Error {
        /// `"name@version"` of the affected artifact, if any.
        step: Option<String>,
        /// The error description.
        message: String,
    },
    /// The run completed.
    Done {
        /// Free-form summary.
        message: String,
    },
}

impl Event {
    /// The step id this event concerns, if any.
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        match self {
            Event::Planning { .. } | Event::Cleanup { .. } | Event::Done { .. } => None,
            Event::Resolving { step, .. }
            | Event::Downloading { step, .. }
            | Event::Installing { step, .. }
            | Event::Updating { step, .. }
            | Event::Uninstalling { step, .. }
            | Event::Skipping { step, .. }
            | Event::Error { step, .. } => step.as_deref(),
        }
    }

    /// This event's free-form message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Event::Planning { message }
            | Event::Resolving { message, .. }
            | Event::Downloading { message, .. }
            | Event::Installing { message, .. }
            | Event::Updating { message, .. }
            | Event::Uninstalling { message, .. }
            | Event::Skipping { message, .. }
            | Event::Cleanup { message }
            | Event::Error { message, .. }
            | Event::Done { message } => message,
        }
    }
}

/// Receives [`Event`]s narrating an orchestrator run.
pub trait EventSink: Send + Sync {
    /// Handle one event. Called synchronously on the orchestrator's
    /// calling thread; implementations that need to cross a thread
    /// boundary (a UI actor, say) are responsible for their own queuing.
    fn emit(&self, event: Event);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: Event) {
        (**self).emit(event);
    }
}

/// Discards every event. Used by tests and any caller that doesn't need
/// progress narration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn step_and_message_accessors_match_variant_fields() {
        let e = Event::Downloading {
            step: Some("jq@1.7.1".to_string()),
            message: "fetching".to_string(),
        };
        assert_eq!(e.step(), Some("jq@1.7.1"));
        assert_eq!(e.message(), "fetching");

        let done = Event::Done { message: "ok".to_string() };
        assert_eq!(done.step(), None);
    }

    #[test]
    fn null_sink_accepts_any_event_without_panicking() {
        NullEventSink.emit(Event::Planning { message: "x".to_string() });
    }

    #[test]
    fn arc_wrapped_sink_forwards_to_inner() {
        let sink: Arc<dyn EventSink> = Arc::new(RecordingSink::default());
        sink.emit(Event::Done { message: "finished".to_string() });
    }

    #[test]
    fn recording_sink_observes_emitted_events() {
        let sink = RecordingSink::default();
        sink.emit(Event::Error {
            step: Some("a@1.0.0".to_string()),
            message: "boom".to_string(),
        });
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }
}

//! Injected diagnostic observer.
//!
//! The core reports structured lifecycle events through a caller-supplied
//! sink instead of binding to a process-wide logger. The default sink
//! forwards to `tracing`, so embedders that want nothing else get ordinary
//! log output for free.
//!
//! The observer also serves as the catch-all for notifications no
//! subscription claimed, which is the supported way to trace raw event
//! traffic during debugging.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::identifiers::CallId;

// ============================================================================
// DiagnosticEvent
// ============================================================================

/// A structured diagnostic event emitted by the core.
#[derive(Debug, Clone)]
pub enum DiagnosticEvent<'a> {
    /// A call was serialized and handed to the transport.
    CallDispatched {
        /// The correlation id.
        call_id: CallId,
        /// The qualified method name.
        method: &'a str,
    },

    /// A call completed (successfully or with a remote error).
    CallCompleted {
        /// The correlation id.
        call_id: CallId,
        /// Whether the remote reported success.
        success: bool,
    },

    /// A response arrived for a call that already timed out.
    LateResponseDropped {
        /// The correlation id of the stale response.
        call_id: CallId,
    },

    /// A notification matched no subscription.
    NotificationUnclaimed {
        /// The `Domain.event` name.
        method: &'a str,
        /// The event payload.
        params: &'a Value,
    },

    /// The connection dropped with calls outstanding.
    ConnectionLost {
        /// Number of pending calls failed.
        pending_failed: usize,
    },
}

// ============================================================================
// DiagnosticObserver
// ============================================================================

/// Sink for [`DiagnosticEvent`]s.
///
/// Implementations must be cheap and non-blocking; the router invokes the
/// observer from the reader task.
pub trait DiagnosticObserver: Send + Sync {
    /// Receives one diagnostic event.
    fn observe(&self, event: DiagnosticEvent<'_>);
}

/// Shared observer handle.
pub type SharedObserver = Arc<dyn DiagnosticObserver>;

// ============================================================================
// TracingObserver
// ============================================================================

/// Default observer that forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl DiagnosticObserver for TracingObserver {
    fn observe(&self, event: DiagnosticEvent<'_>) {
        match event {
            DiagnosticEvent::CallDispatched { call_id, method } => {
                debug!(%call_id, method, "Call dispatched");
            }
            DiagnosticEvent::CallCompleted { call_id, success } => {
                debug!(%call_id, success, "Call completed");
            }
            DiagnosticEvent::LateResponseDropped { call_id } => {
                warn!(%call_id, "Dropped late response for timed-out call");
            }
            DiagnosticEvent::NotificationUnclaimed { method, .. } => {
                debug!(method, "Unclaimed notification");
            }
            DiagnosticEvent::ConnectionLost { pending_failed } => {
                warn!(pending_failed, "Connection lost");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<String>>);

    impl DiagnosticObserver for Recorder {
        fn observe(&self, event: DiagnosticEvent<'_>) {
            let label = match event {
                DiagnosticEvent::CallDispatched { .. } => "dispatched",
                DiagnosticEvent::CallCompleted { .. } => "completed",
                DiagnosticEvent::LateResponseDropped { .. } => "late",
                DiagnosticEvent::NotificationUnclaimed { .. } => "unclaimed",
                DiagnosticEvent::ConnectionLost { .. } => "lost",
            };
            self.0.lock().expect("lock").push(label.to_string());
        }
    }

    #[test]
    fn test_observer_receives_events() {
        let recorder = Recorder(Mutex::new(Vec::new()));

        recorder.observe(DiagnosticEvent::CallDispatched {
            call_id: CallId::from_raw(1),
            method: "Page.navigate",
        });
        recorder.observe(DiagnosticEvent::ConnectionLost { pending_failed: 3 });

        let seen = recorder.0.lock().expect("lock");
        assert_eq!(*seen, vec!["dispatched", "lost"]);
    }

    #[test]
    fn test_tracing_observer_does_not_panic() {
        let observer = TracingObserver;
        observer.observe(DiagnosticEvent::NotificationUnclaimed {
            method: "Page.frameNavigated",
            params: &Value::Null,
        });
    }
}

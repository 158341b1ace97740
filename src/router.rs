//! Message router.
//!
//! Correlates responses to pending calls and fans out notifications to
//! subscribers. The channel is full-duplex and multiplexed: calls and events
//! interleave arbitrarily, and only the router has a complete view of
//! in-flight state, so correlation happens here and nowhere else.
//!
//! # Roles
//!
//! - [`MessageRouter::dispatch`] allocates an id, registers a pending call
//!   and hands the serialized frame to the transport. Never blocks beyond
//!   the channel send.
//! - [`MessageRouter::await_call`] blocks the caller until the pending call
//!   is fulfilled or the timeout elapses. A timed-out call deregisters its
//!   own correlation entry; a late response is dropped with a warning.
//! - [`MessageRouter::on_message`] runs on the reader task and routes each
//!   inbound frame by id or by event name.
//!
//! Registry locks are held only for insert/lookup/remove, never across an
//! await.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CallId, CallIdAllocator, SubscriptionId};
use crate::observer::{DiagnosticEvent, SharedObserver};
use crate::protocol::message::{InboundMessage, Notification, Request, Response};
use crate::transport::ConnectionCommand;

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending calls before rejecting new dispatches.
const MAX_PENDING_CALLS: usize = 256;

// ============================================================================
// Types
// ============================================================================

/// Payload predicate for event subscriptions.
///
/// Runs on the reader task; must be cheap and non-blocking.
pub type EventPredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// One outstanding call awaiting its response.
struct PendingCall {
    /// Fulfillment slot; consumed exactly once.
    tx: oneshot::Sender<Result<Response>>,
    /// When the call was dispatched.
    issued_at: Instant,
}

/// One live event subscription.
struct SubscriptionEntry {
    /// Subscription id, for cancellation.
    id: SubscriptionId,
    /// Qualified `Domain.event` filter.
    method: String,
    /// Optional payload predicate.
    predicate: Option<EventPredicate>,
    /// Notification sink.
    tx: mpsc::UnboundedSender<Notification>,
}

// ============================================================================
// CallHandle
// ============================================================================

/// Handle to a dispatched call, redeemable via [`MessageRouter::await_call`].
#[derive(Debug)]
pub struct CallHandle {
    /// The correlation id assigned at dispatch.
    call_id: CallId,
    /// Receiving half of the fulfillment slot.
    rx: oneshot::Receiver<Result<Response>>,
}

impl CallHandle {
    /// Returns the correlation id of this call.
    #[inline]
    #[must_use]
    pub fn call_id(&self) -> CallId {
        self.call_id
    }
}

// ============================================================================
// EventSubscription
// ============================================================================

/// A live event subscription.
///
/// Receives every matching notification routed after the subscription was
/// created. Events routed earlier are never replayed. The subscription is
/// cancelled on [`EventSubscription::cancel`] or drop.
pub struct EventSubscription {
    /// Subscription id.
    id: SubscriptionId,
    /// Subscribed event name.
    method: String,
    /// Inbound notifications.
    rx: mpsc::UnboundedReceiver<Notification>,
    /// Router backlink for cancellation.
    router: Arc<MessageRouter>,
}

impl EventSubscription {
    /// Returns the subscribed `Domain.event` name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Receives the next matching notification.
    ///
    /// Returns `None` when the connection closed and no buffered
    /// notifications remain.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Cancels the subscription.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.router.unsubscribe(self.id);
    }
}

// ============================================================================
// MessageRouter
// ============================================================================

/// Request/response correlation and notification fan-out.
///
/// Shared between the connection reader task and caller tasks.
pub struct MessageRouter {
    /// Correlation id allocator.
    ids: CallIdAllocator,
    /// Subscription id counter.
    next_subscription: AtomicU64,
    /// Outstanding calls by id.
    pending: Mutex<FxHashMap<CallId, PendingCall>>,
    /// Live subscriptions in subscription order.
    subscriptions: Mutex<Vec<SubscriptionEntry>>,
    /// Outbound frames to the connection event loop.
    outbound: mpsc::UnboundedSender<ConnectionCommand>,
    /// Set once the connection is gone; dispatches fail fast afterwards.
    closed: AtomicBool,
    /// Diagnostic sink.
    observer: SharedObserver,
}

impl MessageRouter {
    /// Creates a router and the outbound channel the connection drains.
    #[must_use]
    pub fn new(
        observer: SharedObserver,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ConnectionCommand>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let router = Arc::new(Self {
            ids: CallIdAllocator::new(),
            next_subscription: AtomicU64::new(1),
            pending: Mutex::new(FxHashMap::default()),
            subscriptions: Mutex::new(Vec::new()),
            outbound,
            closed: AtomicBool::new(false),
            observer,
        });

        (router, outbound_rx)
    }

    /// Returns a sender into the connection event loop.
    ///
    /// Used by the transport for shutdown signaling.
    pub(crate) fn command_sender(&self) -> mpsc::UnboundedSender<ConnectionCommand> {
        self.outbound.clone()
    }

    /// Returns `true` once the connection is gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the number of outstanding calls.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns the number of live subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }
}

// ============================================================================
// MessageRouter - Dispatch
// ============================================================================

impl MessageRouter {
    /// Serializes and sends a call, returning a handle to wait on.
    ///
    /// Never blocks beyond the channel send; the response is claimed later
    /// via [`Self::await_call`].
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionLost`] if the router is closed
    /// - [`Error::Transport`] if the pending-call limit is reached
    /// - [`Error::Json`] if the request does not serialize
    pub fn dispatch(&self, method: &str, params: Value) -> Result<CallHandle> {
        if self.is_closed() {
            return Err(Error::ConnectionLost);
        }

        let call_id = self.allocate_unique_id()?;
        let request = Request::new(call_id, method, params);
        let json = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();

        // Register before sending so the reader task can never observe a
        // response for an unregistered id.
        {
            let mut pending = self.pending.lock();
            if pending.len() >= MAX_PENDING_CALLS {
                return Err(Error::transport(format!(
                    "Too many pending calls: {}/{}",
                    pending.len(),
                    MAX_PENDING_CALLS
                )));
            }
            pending.insert(
                call_id,
                PendingCall {
                    tx,
                    issued_at: Instant::now(),
                },
            );
        }

        self.observer.observe(DiagnosticEvent::CallDispatched {
            call_id,
            method: &request.method,
        });

        if self.outbound.send(ConnectionCommand::Send(json)).is_err() {
            self.pending.lock().remove(&call_id);
            return Err(Error::ConnectionLost);
        }

        trace!(%call_id, method, "Call dispatched");
        Ok(CallHandle { call_id, rx })
    }

    /// Blocks until the call is fulfilled or the timeout elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::CallTimeout`] if no response arrived in time; the pending
    ///   entry is removed so a late response cannot leak or be delivered
    /// - [`Error::ConnectionLost`] if the connection dropped while waiting
    /// - [`Error::Remote`] is *not* produced here; remote failures arrive as
    ///   successful `Response` values and surface in the dispatcher
    pub async fn await_call(&self, handle: CallHandle, budget: Duration) -> Result<Response> {
        let call_id = handle.call_id;

        match timeout(budget, handle.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => {
                // Deregister so the entry cannot leak and the late response
                // is recognizably stale.
                if let Some(call) = self.pending.lock().remove(&call_id) {
                    warn!(
                        %call_id,
                        outstanding_ms = call.issued_at.elapsed().as_millis() as u64,
                        "Call timed out"
                    );
                }
                Err(Error::call_timeout(call_id, budget.as_millis() as u64))
            }
        }
    }

    /// Allocates an id that no outstanding call is using.
    ///
    /// Collisions only occur after the allocator wraps the full `u64`
    /// space while an ancient call is still pending.
    fn allocate_unique_id(&self) -> Result<CallId> {
        for _ in 0..MAX_PENDING_CALLS + 1 {
            let id = self.ids.allocate();
            if !self.pending.lock().contains_key(&id) {
                return Ok(id);
            }
        }
        Err(Error::transport("call id space exhausted"))
    }
}

// ============================================================================
// MessageRouter - Subscriptions
// ============================================================================

impl MessageRouter {
    /// Subscribes to an event, with an optional payload predicate.
    ///
    /// Only notifications routed *after* this call returns are delivered;
    /// there is no replay. Matching subscribers are notified in subscription
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the router is closed.
    pub fn subscribe(
        self: &Arc<Self>,
        method: impl Into<String>,
        predicate: Option<EventPredicate>,
    ) -> Result<EventSubscription> {
        if self.is_closed() {
            return Err(Error::ConnectionLost);
        }

        let method = method.into();
        let id = SubscriptionId::from_raw(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        self.subscriptions.lock().push(SubscriptionEntry {
            id,
            method: method.clone(),
            predicate,
            tx,
        });

        trace!(subscription = %id, method = %method, "Subscribed");

        Ok(EventSubscription {
            id,
            method,
            rx,
            router: Arc::clone(self),
        })
    }

    /// Removes a subscription; idempotent.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.lock().retain(|entry| entry.id != id);
    }
}

// ============================================================================
// MessageRouter - Inbound
// ============================================================================

impl MessageRouter {
    /// Routes one inbound text frame. Runs on the reader task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] or [`Error::Json`] for frames that are
    /// neither responses nor notifications; the connection loop logs these
    /// rather than dropping them silently.
    pub fn on_message(&self, text: &str) -> Result<()> {
        match InboundMessage::parse(text)? {
            InboundMessage::Response(response) => self.route_response(response),
            InboundMessage::Notification(notification) => self.route_notification(notification),
        }
        Ok(())
    }

    /// Fulfills the pending call matching a response id.
    fn route_response(&self, response: Response) {
        let call_id = response.id;
        let entry = self.pending.lock().remove(&call_id);

        match entry {
            Some(call) => {
                self.observer.observe(DiagnosticEvent::CallCompleted {
                    call_id,
                    success: response.is_success(),
                });
                // Receiver may have given up between timeout and removal.
                let _ = call.tx.send(Ok(response));
            }
            None => {
                self.observer
                    .observe(DiagnosticEvent::LateResponseDropped { call_id });
                warn!(%call_id, "Response for unknown or timed-out call, dropping");
            }
        }
    }

    /// Delivers a notification to every matching subscription, in order.
    fn route_notification(&self, notification: Notification) {
        let mut delivered = 0usize;

        {
            let mut subscriptions = self.subscriptions.lock();
            subscriptions.retain(|entry| {
                if entry.method != notification.method {
                    return true;
                }
                if let Some(predicate) = &entry.predicate
                    && !predicate(&notification.params)
                {
                    return true;
                }
                match entry.tx.send(notification.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    // Receiver gone; prune the entry.
                    Err(_) => false,
                }
            });
        }

        if delivered == 0 {
            self.observer.observe(DiagnosticEvent::NotificationUnclaimed {
                method: &notification.method,
                params: &notification.params,
            });
        } else {
            trace!(method = %notification.method, delivered, "Notification routed");
        }
    }

    /// Fails all outstanding work after the transport dropped.
    ///
    /// Subsequent dispatches and subscriptions fail fast with
    /// [`Error::ConnectionLost`].
    pub fn connection_lost(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let drained: Vec<_> = self.pending.lock().drain().collect();
        let pending_failed = drained.len();

        for (_, call) in drained {
            let _ = call.tx.send(Err(Error::ConnectionLost));
        }

        // Dropping the senders wakes every subscriber with end-of-stream.
        self.subscriptions.lock().clear();

        self.observer
            .observe(DiagnosticEvent::ConnectionLost { pending_failed });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::observer::TracingObserver;

    fn test_router() -> (
        Arc<MessageRouter>,
        mpsc::UnboundedReceiver<ConnectionCommand>,
    ) {
        MessageRouter::new(Arc::new(TracingObserver))
    }

    fn sent_frame(rx: &mut mpsc::UnboundedReceiver<ConnectionCommand>) -> Value {
        match rx.try_recv().expect("frame queued") {
            ConnectionCommand::Send(text) => serde_json::from_str(&text).expect("frame is json"),
            ConnectionCommand::Shutdown => panic!("unexpected shutdown"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_writes_frame_and_correlates() {
        let (router, mut outbound) = test_router();

        let handle = router
            .dispatch("Page.navigate", json!({ "url": "https://example.com" }))
            .expect("dispatch");
        let call_id = handle.call_id();

        let frame = sent_frame(&mut outbound);
        assert_eq!(frame["id"], call_id.as_u64());
        assert_eq!(frame["method"], "Page.navigate");
        assert_eq!(frame["params"]["url"], "https://example.com");

        router
            .on_message(&format!(
                r#"{{"id": {}, "result": {{"frameId": "F1"}}}}"#,
                call_id.as_u64()
            ))
            .expect("route");

        let response = router
            .await_call(handle, Duration::from_secs(1))
            .await
            .expect("response");
        assert_eq!(response.into_result().expect("ok")["frameId"], "F1");
        assert_eq!(router.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_calls_never_cross_correlate() {
        let (router, mut outbound) = test_router();

        let handles: Vec<_> = (0..5)
            .map(|_| router.dispatch("Runtime.evaluate", json!({})).expect("dispatch"))
            .collect();
        let ids: Vec<u64> = handles.iter().map(|h| h.call_id().as_u64()).collect();

        // Drain outbound frames.
        for _ in 0..5 {
            let _ = sent_frame(&mut outbound);
        }

        // Fulfill in reverse arrival order, each carrying its own id.
        for id in ids.iter().rev() {
            router
                .on_message(&format!(r#"{{"id": {id}, "result": {{"echo": {id}}}}}"#))
                .expect("route");
        }

        for (handle, id) in handles.into_iter().zip(ids) {
            let response = router
                .await_call(handle, Duration::from_secs(1))
                .await
                .expect("response");
            assert_eq!(response.into_result().expect("ok")["echo"], id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_discards_late_response() {
        let (router, _outbound) = test_router();

        let handle = router.dispatch("Page.enable", Value::Null).expect("dispatch");
        let call_id = handle.call_id();

        let err = router
            .await_call(handle, Duration::from_millis(50))
            .await
            .expect_err("timeout");
        assert!(matches!(err, Error::CallTimeout { .. }));
        assert_eq!(router.pending_count(), 0, "registry entry must not leak");

        // Late response is dropped, not delivered anywhere.
        router
            .on_message(&format!(r#"{{"id": {}, "result": {{}}}}"#, call_id.as_u64()))
            .expect("route");
        assert_eq!(router.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_notification_fan_out_and_predicate() {
        let (router, _outbound) = test_router();

        let mut plain = router
            .subscribe("Page.loadEventFired", None)
            .expect("subscribe");
        let mut filtered = router
            .subscribe(
                "Page.loadEventFired",
                Some(Box::new(|params: &Value| {
                    params["timestamp"].as_f64().unwrap_or(0.0) > 10.0
                })),
            )
            .expect("subscribe");

        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 5.0}}"#)
            .expect("route");
        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 20.0}}"#)
            .expect("route");

        let first = plain.recv().await.expect("first event");
        assert_eq!(first.params["timestamp"], 5.0);
        let second = plain.recv().await.expect("second event");
        assert_eq!(second.params["timestamp"], 20.0);

        let only = filtered.recv().await.expect("filtered event");
        assert_eq!(only.params["timestamp"], 20.0);
    }

    #[tokio::test]
    async fn test_no_retroactive_delivery() {
        let (router, _outbound) = test_router();

        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}}"#)
            .expect("route");

        let mut late = router
            .subscribe("Page.loadEventFired", None)
            .expect("subscribe");

        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 2.0}}"#)
            .expect("route");

        let event = late.recv().await.expect("event");
        assert_eq!(
            event.params["timestamp"], 2.0,
            "event routed before subscription must not be replayed"
        );
    }

    #[tokio::test]
    async fn test_unsubscribe_on_drop() {
        let (router, _outbound) = test_router();

        let subscription = router
            .subscribe("Page.loadEventFired", None)
            .expect("subscribe");
        assert_eq!(router.subscription_count(), 1);

        drop(subscription);
        assert_eq!(router.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_connection_lost_fails_outstanding_calls() {
        let (router, _outbound) = test_router();

        let handles: Vec<_> = (0..3)
            .map(|_| router.dispatch("Page.enable", Value::Null).expect("dispatch"))
            .collect();

        router.connection_lost();

        for handle in handles {
            let err = router
                .await_call(handle, Duration::from_secs(5))
                .await
                .expect_err("failed call");
            assert!(matches!(err, Error::ConnectionLost));
        }

        let err = router
            .dispatch("Page.enable", Value::Null)
            .expect_err("closed router");
        assert!(matches!(err, Error::ConnectionLost));
    }

    #[tokio::test]
    async fn test_unclassifiable_frame_is_protocol_error() {
        let (router, _outbound) = test_router();
        let err = router.on_message(r#"{"neither": true}"#).expect_err("protocol");
        assert!(matches!(err, Error::Protocol { .. }));
    }
}

//! Event synchronization.
//!
//! Turns the router's notification stream into blocking wait primitives.
//! The one rule that makes waits race-free: **subscribe before trigger**.
//! Subscribing after issuing the triggering call loses the race when the
//! browser answers faster than the subscription is registered, and events
//! are never replayed per-subscriber once delivered.
//!
//! [`NavigationWaitToken`] encodes the rule in the API: the token *is* the
//! subscription, created before the navigate call is dispatched, so a
//! load-completion event from a previous navigation can never answer the
//! wrong wait (events routed before the token existed never enter it).

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{Error, Result};
use crate::router::{EventPredicate, EventSubscription, MessageRouter};

// ============================================================================
// EventSynchronizer
// ============================================================================

/// Blocking wait primitives over the router's notification stream.
pub struct EventSynchronizer {
    /// Underlying router.
    router: Arc<MessageRouter>,
}

impl EventSynchronizer {
    /// Creates a synchronizer over a router.
    #[must_use]
    pub fn new(router: Arc<MessageRouter>) -> Self {
        Self { router }
    }

    /// Blocks until a matching event arrives or the budget elapses.
    ///
    /// Subscribes, waits, and unsubscribes on exit regardless of outcome.
    /// Use [`Self::arm`] instead when the event is triggered by a call you
    /// make after setting up the wait.
    ///
    /// # Errors
    ///
    /// - [`Error::EventTimeout`] if no matching event arrived in time
    /// - [`Error::ConnectionLost`] if the connection dropped while waiting
    pub async fn wait_for(
        &self,
        event: &str,
        predicate: Option<EventPredicate>,
        budget: Duration,
    ) -> Result<Value> {
        let token = self.arm(event, predicate)?;
        token.wait(budget).await
    }

    /// Creates a wait token: subscribed now, awaited later.
    ///
    /// Call this *before* dispatching the call that triggers the event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the router is closed.
    pub fn arm(&self, event: &str, predicate: Option<EventPredicate>) -> Result<NavigationWaitToken> {
        let subscription = self.router.subscribe(event, predicate)?;

        Ok(NavigationWaitToken {
            subscription,
            created_at: Instant::now(),
        })
    }
}

// ============================================================================
// NavigationWaitToken
// ============================================================================

/// A pre-armed wait for one event occurrence.
///
/// Consumed by the first matching event observed after creation; the
/// subscription is cancelled when the token is dropped or the wait
/// completes.
pub struct NavigationWaitToken {
    /// The live subscription backing this token.
    subscription: EventSubscription,
    /// When the token was armed.
    created_at: Instant,
}

impl NavigationWaitToken {
    /// Returns when the token was armed.
    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns the awaited `Domain.event` name.
    #[inline]
    #[must_use]
    pub fn event(&self) -> &str {
        self.subscription.method()
    }

    /// Blocks until the event arrives or the budget elapses.
    ///
    /// # Errors
    ///
    /// - [`Error::EventTimeout`] on budget exhaustion; the subscription is
    ///   deregistered, so no registry entry leaks
    /// - [`Error::ConnectionLost`] if the connection dropped while waiting
    pub async fn wait(mut self, budget: Duration) -> Result<Value> {
        let event = self.subscription.method().to_string();

        match timeout(budget, self.subscription.recv()).await {
            Ok(Some(notification)) => {
                debug!(
                    event = %event,
                    waited_ms = self.created_at.elapsed().as_millis() as u64,
                    "Wait fulfilled"
                );
                Ok(notification.params)
            }
            Ok(None) => Err(Error::ConnectionLost),
            Err(_) => Err(Error::event_timeout(event, budget.as_millis() as u64)),
        }
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

    fn test_synchronizer() -> (
        EventSynchronizer,
        Arc<MessageRouter>,
        tokio::sync::mpsc::UnboundedReceiver<crate::transport::ConnectionCommand>,
    ) {
        let (router, outbound) = MessageRouter::new(Arc::new(TracingObserver));
        (EventSynchronizer::new(Arc::clone(&router)), router, outbound)
    }

    #[tokio::test]
    async fn test_wait_returns_payload() {
        let (synchronizer, router, _outbound) = test_synchronizer();

        let token = synchronizer.arm("Page.loadEventFired", None).expect("arm");

        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 3.5}}"#)
            .expect("route");

        let payload = token.wait(Duration::from_secs(1)).await.expect("payload");
        assert_eq!(payload, json!({ "timestamp": 3.5 }));
    }

    #[tokio::test]
    async fn test_event_before_arm_is_not_consumed() {
        let (synchronizer, router, _outbound) = test_synchronizer();

        // Routed before the token exists; must not satisfy the wait.
        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}}"#)
            .expect("route");

        let token = synchronizer.arm("Page.loadEventFired", None).expect("arm");

        router
            .on_message(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 2.0}}"#)
            .expect("route");

        let payload = token.wait(Duration::from_secs(1)).await.expect("payload");
        assert_eq!(payload["timestamp"], 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_deregisters_subscription() {
        let (synchronizer, router, _outbound) = test_synchronizer();

        let token = synchronizer.arm("Page.loadEventFired", None).expect("arm");
        assert_eq!(router.subscription_count(), 1);

        let err = token
            .wait(Duration::from_millis(100))
            .await
            .expect_err("timeout");
        assert!(matches!(err, Error::EventTimeout { .. }));
        assert_eq!(router.subscription_count(), 0);
    }

    #[tokio::test]
    async fn test_predicate_filters_payloads() {
        let (synchronizer, router, _outbound) = test_synchronizer();

        let wait = synchronizer.wait_for(
            "Network.responseReceived",
            Some(Box::new(|params: &Value| {
                params["requestId"].as_str() == Some("target")
            })),
            Duration::from_secs(1),
        );

        let feed = async {
            router
                .on_message(
                    r#"{"method": "Network.responseReceived", "params": {"requestId": "other"}}"#,
                )
                .expect("route");
            router
                .on_message(
                    r#"{"method": "Network.responseReceived", "params": {"requestId": "target"}}"#,
                )
                .expect("route");
        };

        let (payload, ()) = tokio::join!(wait, feed);
        assert_eq!(payload.expect("payload")["requestId"], "target");
    }

    #[tokio::test]
    async fn test_wait_fails_on_connection_loss() {
        let (synchronizer, router, _outbound) = test_synchronizer();

        let token = synchronizer.arm("Page.loadEventFired", None).expect("arm");
        router.connection_lost();

        let err = token
            .wait(Duration::from_secs(5))
            .await
            .expect_err("connection lost");
        assert!(matches!(err, Error::ConnectionLost));
    }
}

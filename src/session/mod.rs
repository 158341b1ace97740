//! Session facade.
//!
//! A [`Session`] owns one connection to a remote debugging endpoint plus the
//! router, registry, dispatcher and event synchronizer derived from it.
//! High-level operations are short compositions of dispatcher calls and,
//! where asynchronous completion matters, an event-synchronizer wait.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `navigation` | Navigate-and-wait, URL and page-source queries |
//! | `screenshot` | Screenshot capture |
//! | `storage` | Cookie operations and the [`Cookie`] record |
//! | `network` | Extra request headers |
//!
//! # Lifecycle
//!
//! The connection is acquired in [`Session::connect`] and torn down by
//! [`Session::close`] or when the last handle drops: the socket closes,
//! outstanding calls fail with [`Error::ConnectionLost`] and subscriptions
//! end. No operation blocks past its budget, including shutdown.
//!
//! [`Error::ConnectionLost`]: crate::Error::ConnectionLost

// ============================================================================
// Submodules
// ============================================================================

/// Navigation and page-source operations.
pub mod navigation;

/// Screenshot capture.
pub mod screenshot;

/// Cookie operations.
pub mod storage;

/// Request header control.
pub mod network;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::dispatch::MethodDispatcher;
use crate::error::Result;
use crate::events::EventSynchronizer;
use crate::observer::{SharedObserver, TracingObserver};
use crate::registry::CapabilityRegistry;
use crate::router::{EventPredicate, MessageRouter};
use crate::transport::Connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use screenshot::ScreenshotFormat;
pub use storage::Cookie;

// ============================================================================
// SessionConfig
// ============================================================================

/// Configuration for a new session.
pub struct SessionConfig {
    /// Capability registry; defaults to the bundled description.
    pub registry: Option<Arc<CapabilityRegistry>>,
    /// Diagnostic sink; defaults to [`TracingObserver`].
    pub observer: SharedObserver,
    /// Per-call budget; defaults to 30s.
    pub call_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            registry: None,
            observer: Arc::new(TracingObserver),
            call_timeout: None,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Internal shared state for a session.
pub(crate) struct SessionInner {
    /// The live connection.
    pub(crate) connection: Connection,
    /// Router shared with the connection event loop.
    pub(crate) router: Arc<MessageRouter>,
    /// Schema-validated dispatch.
    pub(crate) dispatcher: MethodDispatcher,
    /// Blocking event waits.
    pub(crate) synchronizer: EventSynchronizer,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Last handle gone: close the socket. The event loop fails all
        // outstanding router work on exit.
        self.connection.shutdown();
    }
}

/// A handle to one remote debugging session.
///
/// Cheap to clone; all clones share the same connection.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", self.inner.connection.endpoint())
            .field("closed", &self.inner.router.is_closed())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Connects to an already-listening remote debugging endpoint.
    ///
    /// Uses the bundled capability description and default configuration.
    /// Enables the Page, Runtime and Network domains so lifecycle events
    /// flow.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the endpoint is unreachable or the
    ///   handshake fails
    /// - [`Error::Schema`] if the capability description is defective
    ///
    /// [`Error::Connection`]: crate::Error::Connection
    /// [`Error::Schema`]: crate::Error::Schema
    pub async fn connect(endpoint: &str) -> Result<Self> {
        Self::connect_with_config(endpoint, SessionConfig::default()).await
    }

    /// Connects with explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`Self::connect`].
    pub async fn connect_with_config(endpoint: &str, config: SessionConfig) -> Result<Self> {
        let registry = match config.registry {
            Some(registry) => registry,
            None => Arc::new(CapabilityRegistry::bundled()?),
        };

        let (router, outbound_rx) = MessageRouter::new(config.observer);
        let connection = Connection::connect(endpoint, Arc::clone(&router), outbound_rx).await?;

        let mut dispatcher = MethodDispatcher::new(Arc::clone(&router), registry);
        if let Some(budget) = config.call_timeout {
            dispatcher = dispatcher.with_call_timeout(budget);
        }

        let session = Self {
            inner: Arc::new(SessionInner {
                connection,
                synchronizer: EventSynchronizer::new(Arc::clone(&router)),
                router,
                dispatcher,
            }),
        };

        session.enable_domains().await?;

        info!(endpoint, "Session established");
        Ok(session)
    }

    /// Enables the domains whose events the session relies on.
    async fn enable_domains(&self) -> Result<()> {
        self.call("Page.enable", Value::Null).await?;
        self.call("Runtime.enable", Value::Null).await?;
        self.call("Network.enable", json!({})).await?;
        debug!("Page, Runtime and Network domains enabled");
        Ok(())
    }

    /// Returns `true` once the connection is gone.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.router.is_closed()
    }

    /// Executes a schema-validated call by qualified name.
    ///
    /// Escape hatch for methods without a dedicated facade operation.
    ///
    /// # Errors
    ///
    /// See [`MethodDispatcher::call`].
    pub async fn call(&self, method: &str, args: Value) -> Result<Value> {
        self.inner.dispatcher.call(method, args).await
    }

    /// Blocks until a matching event arrives or the budget elapses.
    ///
    /// # Errors
    ///
    /// See [`EventSynchronizer::wait_for`].
    pub async fn wait_for_event(
        &self,
        event: &str,
        predicate: Option<EventPredicate>,
        budget: Duration,
    ) -> Result<Value> {
        self.inner.synchronizer.wait_for(event, predicate, budget).await
    }

    /// Closes the session.
    ///
    /// Outstanding calls fail with `ConnectionLost`, subscriptions end, and
    /// later operations on any clone fail fast. Idempotent.
    pub fn close(&self) {
        debug!("Closing session");
        self.inner.connection.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

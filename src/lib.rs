//! Chrome Remote - DevTools protocol client for an already-running browser.
//!
//! This library drives and observes a separate browser instance over its
//! remote debugging WebSocket: issue commands (navigate, screenshot,
//! cookies, headers) and receive both command results and asynchronous
//! page-lifecycle events on one multiplexed channel.
//!
//! # Architecture
//!
//! ```text
//! caller → Session → MethodDispatcher (validate) → MessageRouter (correlate)
//!        → Connection (WebSocket write)
//!
//! Connection (read loop) → MessageRouter → pending call  (by id)
//!                                        → subscriptions (by event name)
//! ```
//!
//! Key design principles:
//!
//! - One reader task per connection; callers block only in `await`/`wait`
//! - Every method call is validated against a capability description loaded
//!   once at startup — one generic call path, no per-method code
//! - Blocking waits subscribe *before* the triggering call is dispatched,
//!   so fast events are never lost
//! - Diagnostics flow through an injected observer, not a global logger
//!
//! # Quick Start
//!
//! ```no_run
//! use chrome_remote::{Result, ScreenshotFormat, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // The browser must already be listening, e.g. launched with
//!     // --remote-debugging-port and its page target ws:// URL resolved.
//!     let session = Session::connect("ws://127.0.0.1:9222/devtools/page/A1").await?;
//!
//!     session.navigate_and_wait("https://example.com", None).await?;
//!     println!("now at {}", session.current_url().await?);
//!
//!     let png = session.take_screenshot(ScreenshotFormat::Png).await?;
//!     std::fs::write("page.png", png)?;
//!
//!     session.close();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`session`] | [`Session`] facade: navigate, screenshot, cookies, headers |
//! | [`dispatch`] | Schema-validated method dispatch |
//! | [`registry`] | Capability registry loaded from a protocol description |
//! | [`router`] | Request/response correlation and event fan-out |
//! | [`events`] | Blocking waits over the event stream |
//! | [`transport`] | WebSocket connection and event loop (internal) |
//! | [`protocol`] | Wire message and schema document types |
//! | [`observer`] | Injected diagnostic sink |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Schema-validated method dispatch.
///
/// One generic call path: validate arguments against the registry's
/// descriptor, send through the router, validate the response shape.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Blocking event waits.
///
/// [`EventSynchronizer`] and the subscribe-before-trigger wait token.
pub mod events;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Injected diagnostic observer.
///
/// The core reports lifecycle events through a caller-supplied sink.
pub mod observer;

/// Wire message and capability description types.
pub mod protocol;

/// Capability registry.
///
/// Pure data plus lookup, loaded once from a protocol description.
pub mod registry;

/// Message router.
///
/// Correlates responses to pending calls, fans out notifications.
pub mod router;

/// Session facade.
///
/// High-level operations over one connection.
pub mod session;

/// WebSocket transport layer.
///
/// Internal module owning the socket and its event loop.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{Cookie, ScreenshotFormat, Session, SessionConfig};

// Dispatch and registry types
pub use dispatch::MethodDispatcher;
pub use registry::CapabilityRegistry;

// Event types
pub use events::{EventSynchronizer, NavigationWaitToken};

// Router types
pub use router::{CallHandle, EventPredicate, EventSubscription, MessageRouter};

// Observer types
pub use observer::{DiagnosticEvent, DiagnosticObserver, SharedObserver, TracingObserver};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CallId, SubscriptionId};

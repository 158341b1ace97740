//! Error types for the DevTools client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chrome_remote::{Result, Session, ScreenshotFormat};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     session.navigate_and_wait("https://example.com", None).await?;
//!     let png = session.take_screenshot(ScreenshotFormat::Png).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Connection | [`Error::Connection`], [`Error::ConnectionLost`], [`Error::Transport`] |
//! | Schema | [`Error::Schema`], [`Error::UnknownMethod`], [`Error::UnknownEvent`] |
//! | Arguments | [`Error::ArgumentType`], [`Error::MissingArgument`], [`Error::UnknownParameter`] |
//! | Execution | [`Error::CallTimeout`], [`Error::Remote`], [`Error::EventTimeout`], [`Error::NavigationTimeout`] |
//! | Protocol | [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Validation errors ([`Error::ArgumentType`], [`Error::MissingArgument`],
//! [`Error::UnknownParameter`], [`Error::UnknownMethod`]) are raised before
//! any wire traffic. Transport, timeout and remote errors are distinct kinds
//! so callers can tell "retry" from "fix your call" from "remote refused".

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CallId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connection could not be established.
    ///
    /// Returned when the remote debugging endpoint is unreachable or the
    /// WebSocket handshake fails.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection was established, then dropped.
    ///
    /// Returned for every call that was outstanding when the peer
    /// disconnected, and for all operations issued afterwards.
    #[error("Connection lost")]
    ConnectionLost,

    /// Send or receive level I/O failure on a live connection.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Schema Errors
    // ========================================================================
    /// Malformed capability description.
    ///
    /// Fatal at registry load time; never deferred to first use.
    #[error("Schema error: {message}")]
    Schema {
        /// Description of the schema defect.
        message: String,
    },

    /// Caller referenced a method absent from the capability description.
    #[error("Unknown method: {method}")]
    UnknownMethod {
        /// The unresolvable `Domain.method` name.
        method: String,
    },

    /// Caller referenced an event absent from the capability description.
    #[error("Unknown event: {event}")]
    UnknownEvent {
        /// The unresolvable `Domain.event` name.
        event: String,
    },

    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// A supplied argument does not match its declared primitive kind.
    #[error("Argument type mismatch for '{parameter}' of {method}: expected {expected}")]
    ArgumentType {
        /// The qualified method name.
        method: String,
        /// The offending parameter name.
        parameter: String,
        /// The declared kind.
        expected: &'static str,
    },

    /// A required parameter was not supplied.
    #[error("Missing required argument '{parameter}' for {method}")]
    MissingArgument {
        /// The qualified method name.
        method: String,
        /// The missing parameter name.
        parameter: String,
    },

    /// A supplied argument is not declared by the method schema.
    #[error("Unknown parameter '{parameter}' for {method}")]
    UnknownParameter {
        /// The qualified method name.
        method: String,
        /// The undeclared parameter name.
        parameter: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// No response received within the call budget.
    ///
    /// The pending entry is discarded; a late response is dropped with a
    /// warning, never delivered.
    #[error("Call {call_id} timed out after {timeout_ms}ms")]
    CallTimeout {
        /// The call id that timed out.
        call_id: CallId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The remote endpoint reported failure for a well-formed call.
    #[error("Remote error {code}: {message}")]
    Remote {
        /// Remote error code.
        code: i64,
        /// Remote error message.
        message: String,
    },

    /// An event wait exceeded its budget.
    #[error("Timed out after {timeout_ms}ms waiting for event {event}")]
    EventTimeout {
        /// The awaited `Domain.event` name.
        event: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A navigation did not report load completion within its budget.
    ///
    /// The in-flight navigation is not cancelled; the caller can retry or
    /// inspect current state on the same session.
    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout {
        /// The navigation target.
        url: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unclassifiable inbound frame.
    ///
    /// Every inbound message is either a response (has an id) or a
    /// notification (has a method, no id). Anything else lands here.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a schema error.
    #[inline]
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Creates an unknown method error.
    #[inline]
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            method: method.into(),
        }
    }

    /// Creates an unknown event error.
    #[inline]
    pub fn unknown_event(event: impl Into<String>) -> Self {
        Self::UnknownEvent {
            event: event.into(),
        }
    }

    /// Creates an argument type error.
    #[inline]
    pub fn argument_type(
        method: impl Into<String>,
        parameter: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::ArgumentType {
            method: method.into(),
            parameter: parameter.into(),
            expected,
        }
    }

    /// Creates a missing argument error.
    #[inline]
    pub fn missing_argument(method: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingArgument {
            method: method.into(),
            parameter: parameter.into(),
        }
    }

    /// Creates an unknown parameter error.
    #[inline]
    pub fn unknown_parameter(method: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::UnknownParameter {
            method: method.into(),
            parameter: parameter.into(),
        }
    }

    /// Creates a call timeout error.
    #[inline]
    pub fn call_timeout(call_id: CallId, timeout_ms: u64) -> Self {
        Self::CallTimeout {
            call_id,
            timeout_ms,
        }
    }

    /// Creates a remote error.
    #[inline]
    pub fn remote(code: i64, message: impl Into<String>) -> Self {
        Self::Remote {
            code,
            message: message.into(),
        }
    }

    /// Creates an event timeout error.
    #[inline]
    pub fn event_timeout(event: impl Into<String>, timeout_ms: u64) -> Self {
        Self::EventTimeout {
            event: event.into(),
            timeout_ms,
        }
    }

    /// Creates a navigation timeout error.
    #[inline]
    pub fn navigation_timeout(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self::NavigationTimeout {
            url: url.into(),
            timeout_ms,
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::CallTimeout { .. } | Self::EventTimeout { .. } | Self::NavigationTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionLost
                | Self::Transport { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a local validation error.
    ///
    /// Validation errors are rejected before any wire traffic; retrying
    /// without changing the call cannot succeed.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. }
                | Self::UnknownMethod { .. }
                | Self::UnknownEvent { .. }
                | Self::ArgumentType { .. }
                | Self::MissingArgument { .. }
                | Self::UnknownParameter { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CallTimeout { .. } | Self::EventTimeout { .. } | Self::NavigationTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Wire message types.
//!
//! Defines the message format exchanged with the remote debugging endpoint.
//!
//! # Format
//!
//! | Message | Direction | Shape |
//! |---------|-----------|-------|
//! | [`Request`] | Local → Remote | `{id, method, params}` |
//! | [`Response`] | Remote → Local | `{id, result}` or `{id, error}` |
//! | [`Notification`] | Remote → Local | `{method, params}` (no id) |
//!
//! Classification of inbound frames is exclusive: a frame carrying an `id`
//! is a response, a frame carrying a `method` without an `id` is a
//! notification, anything else is a protocol error.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CallId;

// ============================================================================
// Request
// ============================================================================

/// A command request from local end to remote end.
///
/// # Format
///
/// ```json
/// {
///   "id": 12,
///   "method": "Page.navigate",
///   "params": { "url": "https://example.com" }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlation id for the eventual response.
    pub id: CallId,

    /// Qualified method name in `Domain.method` format.
    pub method: String,

    /// Method parameters; omitted from the wire when empty.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl Request {
    /// Creates a new request.
    #[inline]
    #[must_use]
    pub fn new(id: CallId, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response from remote end to local end.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 12, "result": { "frameId": "A1" } }
/// ```
///
/// Error:
/// ```json
/// { "id": 12, "error": { "code": -32000, "message": "Cannot navigate" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CallId,

    /// Result payload (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if the remote reported failure).
    #[serde(default)]
    pub error: Option<RemoteErrorPayload>,
}

impl Response {
    /// Returns `true` if the remote reported success.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Extracts the result value, surfacing a remote error as [`Error::Remote`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] carrying the remote code and message if the
    /// response was an error.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            None => Ok(self.result.unwrap_or(Value::Null)),
            Some(payload) => Err(Error::remote(payload.code, payload.message)),
        }
    }
}

/// Error payload carried by a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteErrorPayload {
    /// Remote error code.
    pub code: i64,

    /// Remote error message.
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Notification
// ============================================================================

/// An unsolicited event notification from the remote end.
///
/// # Format
///
/// ```json
/// {
///   "method": "Page.loadEventFired",
///   "params": { "timestamp": 100.5 }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    /// Event name in `Domain.event` format.
    pub method: String,

    /// Event-specific payload.
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    /// Returns the domain name from the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A classified inbound frame.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    /// A response correlated to a pending call.
    Response(Response),
    /// An unsolicited event notification.
    Notification(Notification),
}

impl InboundMessage {
    /// Classifies a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame is not valid JSON, and
    /// [`Error::Protocol`] if it is JSON but neither a response nor a
    /// notification. Unrecognized frames are an error, never silently
    /// dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;

        let has_id = value.get("id").is_some_and(|id| !id.is_null());
        let has_method = value.get("method").is_some_and(Value::is_string);

        if has_id {
            let response: Response = serde_json::from_value(value)?;
            return Ok(Self::Response(response));
        }

        if has_method {
            let notification: Notification = serde_json::from_value(value)?;
            return Ok(Self::Notification(notification));
        }

        Err(Error::protocol(format!(
            "Inbound frame is neither response nor notification: {text}"
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================

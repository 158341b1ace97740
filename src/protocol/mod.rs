//! Wire message and capability description types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request |
//! | `Response` | Remote → Local | Command response |
//! | `Notification` | Remote → Local | Browser event |
//!
//! Methods and events follow `Domain.name` format:
//!
//! - `Page.navigate`
//! - `Network.setCookie`
//! - `Page.loadEventFired`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Request, Response and Notification types |
//! | `schema` | Capability description document and descriptors |

// ============================================================================
// Submodules
// ============================================================================

/// Wire message types and inbound classification.
pub mod message;

/// Capability description document types.
pub mod schema;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{InboundMessage, Notification, RemoteErrorPayload, Request, Response};
pub use schema::{
    ParamKind, ParamSchema, PayloadSchema, ProcedureDescriptor, ProtocolDocument,
};

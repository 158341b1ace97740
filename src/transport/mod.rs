//! WebSocket transport layer.
//!
//! This module owns the persistent connection to the browser's remote
//! debugging endpoint and the event loop that services it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │  Session (Rust)  │                              │  Browser        │
//! │                  │         WebSocket            │  (DevTools)     │
//! │  MessageRouter   │◄────────────────────────────►│                 │
//! │  ← Connection    │      ws://host:port/...      │  Debug server   │
//! │                  │                              │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::connect` - Dial the already-listening debug endpoint
//! 2. Event loop task starts: reads frames into the router, drains the
//!    router's outbound queue into the socket
//! 3. `Connection::shutdown` - Close the socket; the loop fails all pending
//!    router work before exiting
//!
//! Disconnects detected mid-flight take the same path as shutdown: the loop
//! exits and the router fails everything outstanding, so no caller hangs.

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionCommand};

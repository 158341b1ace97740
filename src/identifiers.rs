//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`CallId`] | Request/response correlation on the wire |
//! | [`SubscriptionId`] | Event subscription handle |
//!
//! Call ids are a monotonically increasing counter per connection, matching
//! the integer `id` field of the remote debugging protocol. They are unique
//! among outstanding calls for the lifetime of the connection; the counter
//! wraps only after exhausting the `u64` space.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CallId
// ============================================================================

/// Correlation id linking a request to its eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// Creates a call id from a raw value.
    ///
    /// Primarily useful in tests; live ids come from [`CallIdAllocator`].
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw wire value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CallIdAllocator
// ============================================================================

/// Monotonic allocator for [`CallId`]s.
///
/// Lock-free; safe to call from any task. Wraps around after `u64::MAX`
/// allocations, which no practical connection lifetime reaches.
#[derive(Debug)]
pub struct CallIdAllocator {
    next: AtomicU64,
}

impl CallIdAllocator {
    /// Creates an allocator starting at id 1.
    ///
    /// Id 0 is avoided because some DevTools builds treat it as absent.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocates the next call id.
    #[inline]
    pub fn allocate(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CallIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Identifier for an event subscription.
///
/// Never leaves the process; used to cancel subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a subscription id from a raw value.
    #[inline]
    #[must_use]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Type-safe identifier wrappers.
//!
//! Newtypes prevent mixing the low-level transfer id with the logical
//! request id handed out to protocol consumers.
//!
//! | Type | Source | Scope |
//! |------|--------|-------|
//! | [`ChannelId`] | Transfer handle | One underlying transfer |
//! | [`RequestId`] | Derived from [`ChannelId`] | Shared across redirects and auth retries |
//! | [`ExchangeId`] | Atomic counter | One [`NetworkExchange`](crate::network::NetworkExchange) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ============================================================================
// Counters
// ============================================================================

/// Next exchange ID. Starts at 1.
static NEXT_EXCHANGE_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// ChannelId
// ============================================================================

/// Identifier of a low-level network transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Creates a channel ID from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChannelId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Stable identifier of a logical request.
///
/// Derived from the channel ID, so a redirected or re-authenticated
/// transfer keeps the same request ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Derives the request ID for a channel.
    #[inline]
    #[must_use]
    pub fn from_channel(channel_id: ChannelId) -> Self {
        Self(channel_id.to_string())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ChannelId> for RequestId {
    #[inline]
    fn from(channel_id: ChannelId) -> Self {
        Self::from_channel(channel_id)
    }
}

// ============================================================================
// ExchangeId
// ============================================================================

/// Process-unique identifier of one observed exchange.
///
/// Two exchanges in the same redirect chain share a [`RequestId`] but
/// never an `ExchangeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(u64);

impl ExchangeId {
    /// Allocates the next exchange ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_EXCHANGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Transfer handle boundary.
//!
//! The observer that produces raw transfer notifications is external. This
//! module defines what an exchange needs from it: read access to the
//! transfer's identity and counters, and a subscription to its completion
//! signals.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use tokio::sync::broadcast;
use url::Url;

use crate::identifiers::ChannelId;

// ============================================================================
// TransferSignal
// ============================================================================

/// Transport-level completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSignal {
    /// The transfer failed.
    Error,

    /// The transfer stopped (finished or cancelled).
    Stop,
}

// ============================================================================
// BlockedReason
// ============================================================================

/// Classification of a transfer the platform refused to perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BlockedReason(String);

impl BlockedReason {
    /// Creates a blocked reason from its classification string.
    #[inline]
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Returns the classification string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TransferHandle
// ============================================================================

/// Read access to one underlying network transfer.
///
/// Implemented by the observer layer. Counters are read at completion time,
/// so implementations must return current values on each call.
pub trait TransferHandle: Send + Sync + fmt::Debug {
    /// Low-level transfer identifier.
    fn channel_id(&self) -> ChannelId;

    /// HTTP method.
    fn method(&self) -> String;

    /// Request URL.
    fn url(&self) -> Url;

    /// Number of redirects already followed for this request.
    fn redirect_count(&self) -> u32;

    /// Returns `true` if a genuine network channel backs this transfer.
    ///
    /// Only channel-backed transfers deliver [`TransferSignal`]s.
    fn is_channel_backed(&self) -> bool;

    /// Returns `true` if a service worker serves this transfer.
    fn is_service_worker(&self) -> bool;

    /// Encoded (compressed) body size observed so far.
    fn encoded_body_size(&self) -> u64;

    /// Total bytes transmitted, headers included.
    fn transfer_size(&self) -> u64;

    /// Current block classification, recomputed on each call.
    fn blocked_reason(&self) -> Option<BlockedReason>;

    /// Subscribes to completion signals.
    ///
    /// Returns `None` when the transfer is not channel-backed.
    fn subscribe(&self) -> Option<broadcast::Receiver<TransferSignal>>;
}

// ============================================================================
// ExchangeMetadata
// ============================================================================

/// Facts known when the observer detects a new exchange.
#[derive(Debug, Clone, Default)]
pub struct ExchangeMetadata {
    /// Raw request header block.
    pub raw_headers: String,

    /// Served from cache.
    pub from_cache: bool,

    /// Block classification known at "headers parsed" time.
    pub blocked_reason: Option<BlockedReason>,
}

impl ExchangeMetadata {
    /// Creates metadata with the given raw headers.
    #[inline]
    #[must_use]
    pub fn new(raw_headers: impl Into<String>) -> Self {
        Self {
            raw_headers: raw_headers.into(),
            ..Default::default()
        }
    }

    /// Marks the exchange as served from cache.
    #[inline]
    #[must_use]
    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    /// Sets an immediate block classification.
    #[inline]
    #[must_use]
    pub fn with_blocked_reason(mut self, reason: impl Into<String>) -> Self {
        self.blocked_reason = Some(BlockedReason::new(reason));
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let metadata = ExchangeMetadata::new("GET / HTTP/1.1\r\n")
            .with_from_cache(true)
            .with_blocked_reason("mixed-content-blocked");

        assert!(metadata.from_cache);
        assert_eq!(
            metadata.blocked_reason.as_ref().map(BlockedReason::as_str),
            Some("mixed-content-blocked")
        );
    }

    #[test]
    fn test_metadata_default_unblocked() {
        let metadata = ExchangeMetadata::default();
        assert!(metadata.raw_headers.is_empty());
        assert!(!metadata.from_cache);
        assert!(metadata.blocked_reason.is_none());
    }
}

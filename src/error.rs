//! Error types for network event correlation.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use firefox_network_events::{AuthCallbacks, AuthDecision, Result};
//!
//! fn respond(callbacks: &AuthCallbacks) -> Result<()> {
//!     callbacks.respond(AuthDecision::Cancel)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Transfer | [`Error::BodySizeUnavailable`] |
//! | Authentication | [`Error::AuthAlreadyHandled`] |
//! | External | [`Error::Json`], [`Error::ChannelClosed`] |
//!
//! Blocked transfers are not errors. They are reported as `fetch-error`
//! events carrying a [`BlockedReason`](crate::network::BlockedReason).

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;

use crate::identifiers::{ChannelId, RequestId};

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
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when listener options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// Decoded body size lookup failed.
    ///
    /// Returned by a [`BodySizeAggregator`](crate::network::BodySizeAggregator)
    /// when the size cannot be collected from the contributing contexts.
    #[error("Body size unavailable for channel {channel_id}: {message}")]
    BodySizeUnavailable {
        /// Channel whose size was requested.
        channel_id: ChannelId,
        /// Description of the lookup failure.
        message: String,
    },

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// Auth prompt was already answered.
    ///
    /// Returned when a second decision is sent for the same prompt.
    #[error("Authentication prompt already handled for request {request_id}")]
    AuthAlreadyHandled {
        /// Request the prompt belongs to.
        request_id: RequestId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a body size unavailable error.
    #[inline]
    pub fn body_size_unavailable(channel_id: ChannelId, message: impl Into<String>) -> Self {
        Self::BodySizeUnavailable {
            channel_id,
            message: message.into(),
        }
    }

    /// Creates an auth already handled error.
    #[inline]
    pub fn auth_already_handled(request_id: RequestId) -> Self {
        Self::AuthAlreadyHandled { request_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error is recoverable.
    ///
    /// A failed body size lookup leaves the exchange registered, so a later
    /// completion signal may still finish it.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BodySizeUnavailable { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::body_size_unavailable(ChannelId::new(7), "content process gone");
        assert_eq!(
            err.to_string(),
            "Body size unavailable for channel 7: content process gone"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("event capacity must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Configuration error: event capacity must be greater than zero"
        );
    }

    #[test]
    fn test_is_recoverable() {
        let lookup = Error::body_size_unavailable(ChannelId::new(1), "x");
        let auth = Error::auth_already_handled(RequestId::from_channel(ChannelId::new(1)));

        assert!(lookup.is_recoverable());
        assert!(!auth.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}

//! Builder pattern for listener configuration.
//!
//! Provides a fluent API for configuring and creating [`NetworkListener`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use firefox_network_events::NetworkListener;
//!
//! # fn example() -> firefox_network_events::Result<()> {
//! let listener = NetworkListener::builder()
//!     .event_capacity(512)
//!     .listening()
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::{Error, Result};

use super::core::NetworkListener;
use super::options::ListenerOptions;

// ============================================================================
// ListenerBuilder
// ============================================================================

/// Builder for configuring a [`NetworkListener`] instance.
///
/// Use [`NetworkListener::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ListenerBuilder {
    options: ListenerOptions,
}

// ============================================================================
// ListenerBuilder Implementation
// ============================================================================

impl ListenerBuilder {
    /// Creates a new builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-subscriber event buffer.
    #[inline]
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.options.event_capacity = capacity;
        self
    }

    /// Starts listening as soon as the listener is built.
    #[inline]
    #[must_use]
    pub fn listening(mut self) -> Self {
        self.options.start_listening = true;
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the listener with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    pub fn build(self) -> Result<NetworkListener> {
        self.options.validate().map_err(Error::config)?;
        Ok(NetworkListener::from_options(self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let listener = ListenerBuilder::new().build().expect("build");
        assert!(!listener.is_listening());
    }

    #[test]
    fn test_build_listening() {
        let listener = ListenerBuilder::new().listening().build().expect("build");
        assert!(listener.is_listening());
    }

    #[test]
    fn test_build_rejects_zero_capacity() {
        let result = ListenerBuilder::new().event_capacity(0).build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}

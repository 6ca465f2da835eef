//! Listener configuration.
//!
//! # Example
//!
//! ```ignore
//! use firefox_network_events::ListenerOptions;
//!
//! let options = ListenerOptions::new()
//!     .with_event_capacity(1024)
//!     .with_start_listening(true);
//! ```

// ============================================================================
// Constants
// ============================================================================

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ============================================================================
// ListenerOptions
// ============================================================================

/// Network listener configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Events buffered per subscriber before it lags.
    pub event_capacity: usize,

    /// Start listening as soon as the listener is built.
    pub start_listening: bool,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ListenerOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            start_listening: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ListenerOptions {
    /// Sets the per-subscriber event buffer.
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Starts listening on build.
    #[inline]
    #[must_use]
    pub fn with_start_listening(mut self, start: bool) -> Self {
        self.start_listening = start;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ListenerOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_capacity == 0 {
            return Err("Event capacity must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

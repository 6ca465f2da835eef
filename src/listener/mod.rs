//! Network listener module.
//!
//! Owning facade around the shared registry, body size map and event bus.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NetworkListener`] | Creates exchanges and fans out their events |
//! | [`ListenerBuilder`] | Fluent configuration builder |
//! | [`ListenerOptions`] | Listener settings |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for listener configuration.
pub mod builder;

/// Core listener implementation.
pub mod core;

/// Listener options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ListenerBuilder;
pub use core::NetworkListener;
pub use options::ListenerOptions;

//! Firefox network events - request/response lifecycle correlation.
//!
//! This library turns the raw, out-of-order notifications a browser network
//! observer produces into one ordered stream of lifecycle events per logical
//! exchange.
//!
//! # Architecture
//!
//! Each observed transfer becomes a [`NetworkExchange`]:
//!
//! - **Observer**: reports transfers, response starts and content
//! - **Exchange**: single state machine per channel, completes exactly once
//! - **Registry**: one active exchange per [`RequestId`]; redirects and
//!   authentication retries reuse the ID and retire the predecessor
//! - **Event bus**: lifecycle events fan out to subscribers
//!
//! Per exchange, events are emitted in this order:
//!
//! ```text
//! before-request-sent → [auth-required]* → response-started? → response-completed | fetch-error
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use firefox_network_events::{ExchangeMetadata, NetworkListener, Result};
//!
//! async fn run(transfer: Arc<dyn firefox_network_events::TransferHandle>) -> Result<()> {
//!     let listener = NetworkListener::builder().listening().build()?;
//!     let mut events = listener.subscribe();
//!
//!     let exchange = listener.on_network_event(ExchangeMetadata::default(), transfer);
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("{} {}", event.name(), event.request().url());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`listener`] | Listener facade and configuration |
//! | [`network`] | Exchanges, events, registry, body sizes |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for channels, requests and exchanges.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Listener facade.
///
/// Use [`NetworkListener::builder()`] to create a configured listener.
pub mod listener;

/// Exchange correlation and lifecycle events.
pub mod network;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ChannelId, ExchangeId, RequestId};

// Listener types
pub use listener::{ListenerBuilder, ListenerOptions, NetworkListener};

// Network types
pub use network::{
    AuthCallbacks, AuthChallenge, AuthDecision, AuthPrompt, BlockedReason, BodySizeAggregator,
    BroadcastEventBus, DecodedBodySizeMap, EventBus, ExchangeMetadata, ExchangePhase,
    ExchangeRegistry, Header, NetworkEvent, NetworkEventKind, NetworkExchange,
    RequestDescriptor, RequestTimings, ResponseContent, ResponseDescriptor, ResponseSizes,
    ResponseStart, TransferHandle, TransferSignal,
};

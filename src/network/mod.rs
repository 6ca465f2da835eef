//! Network exchange correlation.
//!
//! Turns raw transfer notifications into one ordered sequence of lifecycle
//! events per logical request/response exchange.
//!
//! # Architecture
//!
//! ```text
//! Observer ──new──► NetworkExchange ──emit──► EventBus
//!                     │        │
//!                     │        └── get/delete ──► BodySizeAggregator
//!                     └── get/insert/remove ───► ExchangeRegistry
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `body_size` | Decoded body size aggregation |
//! | `event` | Lifecycle events and event bus |
//! | `exchange` | Exchange state machine |
//! | `registry` | Active exchange per request ID |
//! | `request` | Request descriptor |
//! | `response` | Response descriptor and payloads |
//! | `transfer` | Transfer handle boundary |

// ============================================================================
// Submodules
// ============================================================================

/// Decoded body size aggregation.
pub mod body_size;

/// Lifecycle events and the bus they are published on.
pub mod event;

/// Exchange state machine.
pub mod exchange;

/// Active exchange registry.
pub mod registry;

/// Request descriptor.
pub mod request;

/// Response descriptor and response-side payloads.
pub mod response;

/// Transfer handle boundary.
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

pub use body_size::{BodySizeAggregator, DecodedBodySizeMap};
pub use event::{
    AuthCallbacks, AuthChallenge, AuthDecision, AuthPrompt, BroadcastEventBus, EventBus,
    NetworkEvent, NetworkEventKind,
};
pub use exchange::{ExchangePhase, NetworkExchange};
pub use registry::ExchangeRegistry;
pub use request::{Header, RequestDescriptor, RequestTimings};
pub use response::{ResponseContent, ResponseDescriptor, ResponseSizes, ResponseStart};
pub use transfer::{BlockedReason, ExchangeMetadata, TransferHandle, TransferSignal};

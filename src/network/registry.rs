//! Active exchange registry.
//!
//! Maps each [`RequestId`] to the exchange currently responsible for it.
//! Redirects and authentication retries reuse the request ID, so inserting
//! over an existing entry is how a successor finds its predecessor.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │           ExchangeRegistry           │
//! │  RequestId "17" → Exchange #3        │
//! │  RequestId "18" → Exchange #5        │
//! └──────────────────────────────────────┘
//!   new Exchange #6 for "17":
//!     previous = #3 → retire #3 → "17" → #6
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::identifiers::{ExchangeId, RequestId};

use super::exchange::NetworkExchange;

// ============================================================================
// ExchangeRegistry
// ============================================================================

/// At most one active exchange per request ID.
#[derive(Default)]
pub struct ExchangeRegistry {
    exchanges: RwLock<FxHashMap<RequestId, Arc<NetworkExchange>>>,
}

// Exchanges lock their state before the registry, so formatting must not
// reach into exchange state while the registry lock is held.
impl fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exchanges = self.exchanges.read();
        f.debug_struct("ExchangeRegistry")
            .field("len", &exchanges.len())
            .field("request_ids", &exchanges.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExchangeRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the active exchange for a request ID.
    #[must_use]
    pub fn get(&self, request_id: &RequestId) -> Option<Arc<NetworkExchange>> {
        self.exchanges.read().get(request_id).cloned()
    }

    /// Returns `true` if a request ID has an active exchange.
    #[inline]
    #[must_use]
    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.exchanges.read().contains_key(request_id)
    }

    /// Returns the number of active exchanges.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.read().len()
    }

    /// Returns `true` if no exchange is active.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.read().is_empty()
    }

    /// Makes an exchange the active entry for its request ID.
    ///
    /// Always overwrites. Returns the replaced entry, if any.
    pub(crate) fn insert(&self, exchange: Arc<NetworkExchange>) -> Option<Arc<NetworkExchange>> {
        let request_id = exchange.request_id().clone();
        trace!(request_id = %request_id, exchange_id = %exchange.id(), "Exchange registered");
        self.exchanges.write().insert(request_id, exchange)
    }

    /// Removes the entry for a request ID if it still belongs to `owner`.
    ///
    /// Returns `true` if an entry was removed.
    pub(crate) fn remove_if_owner(&self, request_id: &RequestId, owner: ExchangeId) -> bool {
        let mut exchanges = self.exchanges.write();
        match exchanges.get(request_id) {
            Some(current) if current.id() == owner => {
                exchanges.remove(request_id);
                trace!(request_id = %request_id, exchange_id = %owner, "Exchange unregistered");
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

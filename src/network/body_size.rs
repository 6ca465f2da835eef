//! Decoded body size aggregation.
//!
//! Decoded body bytes are counted in the execution contexts that consume the
//! response, not where the exchange is observed. Each context contributes to
//! a shared map keyed by channel; the exchange that completes through the
//! transport path reads the total once, then forgets it.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::Result;
use crate::identifiers::ChannelId;

// ============================================================================
// BodySizeAggregator
// ============================================================================

/// Channel-keyed decoded body sizes.
#[async_trait]
pub trait BodySizeAggregator: Send + Sync {
    /// Returns the final decoded body size for a channel.
    ///
    /// # Errors
    ///
    /// - [`Error::BodySizeUnavailable`](crate::Error::BodySizeUnavailable)
    ///   if the contributing contexts cannot be reached
    async fn get_decoded_body_size(&self, channel_id: ChannelId) -> Result<u64>;

    /// Forgets a channel's entry.
    fn delete(&self, channel_id: ChannelId);
}

// ============================================================================
// DecodedBodySizeMap
// ============================================================================

/// In-process [`BodySizeAggregator`].
///
/// Unknown channels report zero bytes.
#[derive(Debug, Default)]
pub struct DecodedBodySizeMap {
    sizes: Mutex<FxHashMap<ChannelId, u64>>,
}

impl DecodedBodySizeMap {
    /// Creates an empty map.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds decoded bytes reported by one context.
    pub fn add_contribution(&self, channel_id: ChannelId, bytes: u64) {
        let mut sizes = self.sizes.lock();
        let total = sizes.entry(channel_id).or_insert(0);
        *total = total.saturating_add(bytes);
        trace!(channel_id = %channel_id, bytes, total = *total, "Body size contribution");
    }

    /// Returns `true` if the channel has an entry.
    #[inline]
    #[must_use]
    pub fn contains(&self, channel_id: ChannelId) -> bool {
        self.sizes.lock().contains_key(&channel_id)
    }

    /// Returns the number of tracked channels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sizes.lock().len()
    }

    /// Returns `true` if no channel is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.lock().is_empty()
    }
}

#[async_trait]
impl BodySizeAggregator for DecodedBodySizeMap {
    async fn get_decoded_body_size(&self, channel_id: ChannelId) -> Result<u64> {
        // Contributions still in flight from other contexts land first.
        tokio::task::yield_now().await;
        Ok(self.sizes.lock().get(&channel_id).copied().unwrap_or(0))
    }

    fn delete(&self, channel_id: ChannelId) {
        self.sizes.lock().remove(&channel_id);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_contributions_accumulate() {
        let map = DecodedBodySizeMap::new();
        let channel_id = ChannelId::new(1);

        map.add_contribution(channel_id, 100);
        map.add_contribution(channel_id, 23);

        let size = map.get_decoded_body_size(channel_id).await.expect("size");
        assert_eq!(size, 123);
    }

    #[tokio::test]
    async fn test_unknown_channel_is_zero() {
        let map = DecodedBodySizeMap::new();
        let size = map
            .get_decoded_body_size(ChannelId::new(99))
            .await
            .expect("size");
        assert_eq!(size, 0);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_delete_forgets_entry() {
        let map = DecodedBodySizeMap::new();
        map.add_contribution(ChannelId::new(1), 10);
        map.add_contribution(ChannelId::new(2), 20);

        map.delete(ChannelId::new(1));

        assert!(!map.contains(ChannelId::new(1)));
        assert!(map.contains(ChannelId::new(2)));
        assert_eq!(map.len(), 1);
    }

    #[tokio::test]
    async fn test_contribution_during_lookup_is_counted() {
        let map = std::sync::Arc::new(DecodedBodySizeMap::new());
        let channel_id = ChannelId::new(4);
        map.add_contribution(channel_id, 1);

        let writer = std::sync::Arc::clone(&map);
        tokio::spawn(async move {
            writer.add_contribution(channel_id, 2);
        });

        let size = map.get_decoded_body_size(channel_id).await.expect("size");
        assert_eq!(size, 3);
    }
}

//! Core listener implementation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::network::{
    BroadcastEventBus, DecodedBodySizeMap, ExchangeMetadata, ExchangeRegistry, NetworkEvent,
    NetworkExchange, TransferHandle,
};

use super::builder::ListenerBuilder;
use super::options::ListenerOptions;

// ============================================================================
// NetworkListener
// ============================================================================

/// Owns the shared state exchanges correlate through.
///
/// The observer reports each detected exchange with
/// [`on_network_event`](Self::on_network_event); consumers read lifecycle
/// events from [`subscribe`](Self::subscribe).
///
/// # Example
///
/// ```ignore
/// let listener = NetworkListener::builder().listening().build()?;
/// let mut events = listener.subscribe();
///
/// let exchange = listener.on_network_event(metadata, transfer);
/// while let Ok(event) = events.recv().await {
///     println!("{} {}", event.name(), event.request().url());
/// }
/// ```
pub struct NetworkListener {
    options: ListenerOptions,
    registry: Arc<ExchangeRegistry>,
    body_sizes: Arc<DecodedBodySizeMap>,
    event_bus: Arc<BroadcastEventBus>,
    listening: AtomicBool,
}

impl fmt::Debug for NetworkListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkListener")
            .field("listening", &self.is_listening())
            .field("active_exchanges", &self.registry.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NetworkListener - Constructor
// ============================================================================

impl NetworkListener {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ListenerBuilder {
        ListenerBuilder::new()
    }

    /// Creates a listener from validated options.
    pub(crate) fn from_options(options: ListenerOptions) -> Self {
        let listener = Self {
            registry: Arc::new(ExchangeRegistry::new()),
            body_sizes: Arc::new(DecodedBodySizeMap::new()),
            event_bus: Arc::new(BroadcastEventBus::new(options.event_capacity)),
            listening: AtomicBool::new(options.start_listening),
            options,
        };
        debug!(
            event_capacity = listener.options.event_capacity,
            listening = listener.is_listening(),
            "NetworkListener created"
        );
        listener
    }
}

// ============================================================================
// NetworkListener - Public API
// ============================================================================

impl NetworkListener {
    /// Starts creating exchanges for observed transfers.
    pub fn start_listening(&self) {
        if !self.listening.swap(true, Ordering::SeqCst) {
            info!("Network listener started");
        }
    }

    /// Stops creating exchanges.
    ///
    /// Exchanges already in flight still complete and emit.
    pub fn stop_listening(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            info!(
                active = self.registry.len(),
                "Network listener stopped"
            );
        }
    }

    /// Returns `true` while listening.
    #[inline]
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Subscribes to lifecycle events emitted from now on.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.event_bus.subscribe()
    }

    /// Reports a newly detected exchange.
    ///
    /// Returns `None` while not listening.
    pub fn on_network_event(
        &self,
        metadata: ExchangeMetadata,
        transfer: Arc<dyn TransferHandle>,
    ) -> Option<Arc<NetworkExchange>> {
        if !self.is_listening() {
            debug!(channel_id = %transfer.channel_id(), "Not listening, transfer ignored");
            return None;
        }

        Some(NetworkExchange::new(
            metadata,
            transfer,
            self.event_bus.clone(),
            self.body_sizes.clone(),
            Arc::clone(&self.registry),
        ))
    }

    /// Active exchanges.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ExchangeRegistry> {
        &self.registry
    }

    /// Decoded body size map that content contexts report into.
    #[inline]
    #[must_use]
    pub fn body_sizes(&self) -> &Arc<DecodedBodySizeMap> {
        &self.body_sizes
    }

    /// Options this listener was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ListenerOptions {
        &self.options
    }
}

// ============================================================================
// Tests
// ============================================================================

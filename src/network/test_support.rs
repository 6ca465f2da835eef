//! Shared fakes for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::ChannelId;

use super::body_size::{BodySizeAggregator, DecodedBodySizeMap};
use super::event::{EventBus, NetworkEvent, NetworkEventKind};
use super::exchange::NetworkExchange;
use super::registry::ExchangeRegistry;
use super::response::ResponseDescriptor;
use super::transfer::{BlockedReason, ExchangeMetadata, TransferHandle, TransferSignal};

// ============================================================================
// Helpers
// ============================================================================

/// Installs a test subscriber once. Set `RUST_LOG` to see output.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Lets spawned signal listeners run to their next suspension point.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// FakeTransfer
// ============================================================================

/// Transfer handle with scripted state. Clones share signals and block state.
#[derive(Debug, Clone)]
pub(crate) struct FakeTransfer {
    channel_id: ChannelId,
    method: String,
    url: Url,
    redirect_count: u32,
    channel_backed: bool,
    service_worker: bool,
    encoded_body_size: u64,
    transfer_size: u64,
    blocked_reason: Arc<Mutex<Option<BlockedReason>>>,
    signals: broadcast::Sender<TransferSignal>,
}

impl FakeTransfer {
    fn build(channel_id: u64, url: &str, channel_backed: bool) -> Self {
        let (signals, _) = broadcast::channel(16);
        Self {
            channel_id: ChannelId::new(channel_id),
            method: "GET".to_string(),
            url: Url::parse(url).expect("valid test url"),
            redirect_count: 0,
            channel_backed,
            service_worker: false,
            encoded_body_size: 0,
            transfer_size: 0,
            blocked_reason: Arc::new(Mutex::new(None)),
            signals,
        }
    }

    /// Channel-backed transfer.
    pub(crate) fn channel(channel_id: u64, url: &str) -> Self {
        Self::build(channel_id, url, true)
    }

    /// Transfer without a channel, e.g. a `data:` URL.
    pub(crate) fn detached(channel_id: u64, url: &str) -> Self {
        Self::build(channel_id, url, false)
    }

    pub(crate) fn with_redirect_count(mut self, redirect_count: u32) -> Self {
        self.redirect_count = redirect_count;
        self
    }

    pub(crate) fn with_service_worker(mut self) -> Self {
        self.service_worker = true;
        self
    }

    pub(crate) fn with_sizes(mut self, encoded_body_size: u64, transfer_size: u64) -> Self {
        self.encoded_body_size = encoded_body_size;
        self.transfer_size = transfer_size;
        self
    }

    pub(crate) fn with_blocked_reason(self, reason: &str) -> Self {
        *self.blocked_reason.lock() = Some(BlockedReason::new(reason));
        self
    }

    /// Delivers a signal to every subscriber.
    pub(crate) fn fire(&self, signal: TransferSignal) {
        let _ = self.signals.send(signal);
    }
}

impl TransferHandle for FakeTransfer {
    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    fn method(&self) -> String {
        self.method.clone()
    }

    fn url(&self) -> Url {
        self.url.clone()
    }

    fn redirect_count(&self) -> u32 {
        self.redirect_count
    }

    fn is_channel_backed(&self) -> bool {
        self.channel_backed
    }

    fn is_service_worker(&self) -> bool {
        self.service_worker
    }

    fn encoded_body_size(&self) -> u64 {
        self.encoded_body_size
    }

    fn transfer_size(&self) -> u64 {
        self.transfer_size
    }

    fn blocked_reason(&self) -> Option<BlockedReason> {
        self.blocked_reason.lock().clone()
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<TransferSignal>> {
        self.channel_backed.then(|| self.signals.subscribe())
    }
}

// ============================================================================
// RecordingBus
// ============================================================================

/// Event bus keeping every event in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingBus {
    events: Mutex<Vec<NetworkEvent>>,
}

impl RecordingBus {
    pub(crate) fn kinds(&self) -> Vec<NetworkEventKind> {
        self.events.lock().iter().map(NetworkEvent::kind).collect()
    }

    pub(crate) fn count(&self, kind: NetworkEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub(crate) fn last_of(&self, kind: NetworkEventKind) -> Option<NetworkEvent> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|e| e.kind() == kind)
            .cloned()
    }

    /// Response carried by the most recent event that has one.
    pub(crate) fn last_response(&self) -> Option<ResponseDescriptor> {
        self.events
            .lock()
            .iter()
            .rev()
            .find_map(|e| e.response().cloned())
    }
}

impl EventBus for RecordingBus {
    fn emit(&self, event: NetworkEvent) {
        self.events.lock().push(event);
    }
}

// ============================================================================
// Aggregators
// ============================================================================

/// Aggregator whose lookups wait until [`open`](Self::open) is called.
#[derive(Debug)]
pub(crate) struct GatedAggregator {
    inner: DecodedBodySizeMap,
    gate: watch::Sender<bool>,
    waiting: AtomicBool,
}

impl Default for GatedAggregator {
    fn default() -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner: DecodedBodySizeMap::new(),
            gate,
            waiting: AtomicBool::new(false),
        }
    }
}

impl GatedAggregator {
    pub(crate) fn open(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn is_waiting(&self) -> bool {
        self.waiting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BodySizeAggregator for GatedAggregator {
    async fn get_decoded_body_size(&self, channel_id: ChannelId) -> Result<u64> {
        self.waiting.store(true, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|_| Error::body_size_unavailable(channel_id, "gate dropped"))?;
        self.inner.get_decoded_body_size(channel_id).await
    }

    fn delete(&self, channel_id: ChannelId) {
        self.inner.delete(channel_id);
    }
}

/// Aggregator whose lookups always fail.
#[derive(Debug, Default)]
pub(crate) struct FailingAggregator;

#[async_trait]
impl BodySizeAggregator for FailingAggregator {
    async fn get_decoded_body_size(&self, channel_id: ChannelId) -> Result<u64> {
        Err(Error::body_size_unavailable(channel_id, "content process unreachable"))
    }

    fn delete(&self, _channel_id: ChannelId) {}
}

// ============================================================================
// Harness
// ============================================================================

/// Registry, aggregator and bus wired together.
pub(crate) struct Harness {
    pub(crate) registry: Arc<ExchangeRegistry>,
    pub(crate) body_sizes: Arc<DecodedBodySizeMap>,
    pub(crate) bus: Arc<RecordingBus>,
    aggregator: Arc<dyn BodySizeAggregator>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        init_tracing();
        let body_sizes = Arc::new(DecodedBodySizeMap::new());
        Self {
            registry: Arc::new(ExchangeRegistry::new()),
            aggregator: body_sizes.clone(),
            body_sizes,
            bus: Arc::new(RecordingBus::default()),
        }
    }

    pub(crate) fn with_aggregator(aggregator: Arc<dyn BodySizeAggregator>) -> Self {
        Self {
            aggregator,
            ..Self::new()
        }
    }

    pub(crate) fn transfer(&self, channel_id: u64) -> FakeTransfer {
        FakeTransfer::channel(channel_id, "https://example.com/")
    }

    pub(crate) fn detached_transfer(&self, channel_id: u64, url: &str) -> FakeTransfer {
        FakeTransfer::detached(channel_id, url)
    }

    pub(crate) fn exchange(&self, transfer: &FakeTransfer) -> Arc<NetworkExchange> {
        self.exchange_with(ExchangeMetadata::default(), transfer)
    }

    pub(crate) fn exchange_with(
        &self,
        metadata: ExchangeMetadata,
        transfer: &FakeTransfer,
    ) -> Arc<NetworkExchange> {
        NetworkExchange::new(
            metadata,
            Arc::new(transfer.clone()),
            self.bus.clone(),
            Arc::clone(&self.aggregator),
            Arc::clone(&self.registry),
        )
    }
}

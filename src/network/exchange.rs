//! Network exchange state machine.
//!
//! A [`NetworkExchange`] tracks one observed request/response pair and turns
//! the transfer's overlapping completion signals into exactly one terminal
//! event.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──add_response_start──► ResponseStarted
//!    │                                  │
//!    ├── superseded by redirect ────────┤──► Completed (response-completed)
//!    ├── superseded by auth retry ──────┤──► Completed (silent)
//!    └── content / transport signal ────┘──► Completed (response-completed | fetch-error)
//! ```
//!
//! A block reason known at construction emits `fetch-error` right away but
//! leaves the exchange in `Created`; the transport signal finishes it later
//! and re-evaluates the block reason, which emits `fetch-error` a second
//! time when the transfer is still blocked.
//!
//! # Concurrency
//!
//! All state sits behind one mutex. Every terminal path checks the phase and
//! transitions under the same lock acquisition, and the lock is never held
//! across an `.await`. The body size lookup is the only suspension point, so
//! the phase is checked again once it resolves.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::identifiers::{ChannelId, ExchangeId, RequestId};

use super::body_size::BodySizeAggregator;
use super::event::{AuthCallbacks, AuthChallenge, EventBus, NetworkEvent};
use super::registry::ExchangeRegistry;
use super::request::{RequestDescriptor, RequestTimings};
use super::response::{ResponseContent, ResponseDescriptor, ResponseSizes, ResponseStart};
use super::transfer::{BlockedReason, ExchangeMetadata, TransferHandle, TransferSignal};

// ============================================================================
// ExchangePhase
// ============================================================================

/// Lifecycle phase of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    /// Request observed, no response yet.
    Created,
    /// Response headers applied and `response-started` emitted.
    ResponseStarted,
    /// Terminal. No further events.
    Completed,
}

impl ExchangePhase {
    /// Returns `true` for the terminal phase.
    #[inline]
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

// ============================================================================
// ExchangeState
// ============================================================================

/// Mutable state, guarded by the exchange mutex.
struct ExchangeState {
    phase: ExchangePhase,
    request: RequestDescriptor,
    response: Option<ResponseDescriptor>,
    /// Cache flag recorded before the response exists.
    from_cache: bool,
    /// Response start applied right before terminal handling.
    pending_response_start: Option<ResponseStart>,
    /// Transfer signal task, aborted on completion.
    listener: Option<JoinHandle<()>>,
}

// ============================================================================
// NetworkExchange
// ============================================================================

/// One observed request/response pair.
///
/// Created by the observer for every new logical exchange, including
/// redirects and authentication retries, which share their predecessor's
/// [`RequestId`].
pub struct NetworkExchange {
    id: ExchangeId,
    request_id: RequestId,
    channel_id: ChannelId,
    redirect_count: u32,
    transfer: Arc<dyn TransferHandle>,
    event_bus: Arc<dyn EventBus>,
    body_sizes: Arc<dyn BodySizeAggregator>,
    registry: Arc<ExchangeRegistry>,
    state: Mutex<ExchangeState>,
}

impl fmt::Debug for NetworkExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("NetworkExchange");
        debug
            .field("id", &self.id)
            .field("request_id", &self.request_id)
            .field("channel_id", &self.channel_id)
            .field("redirect_count", &self.redirect_count);
        // Never block: the state lock may be held by a completing caller.
        if let Some(state) = self.state.try_lock() {
            debug.field("phase", &state.phase);
        }
        debug.finish_non_exhaustive()
    }
}

// ============================================================================
// NetworkExchange - Constructor
// ============================================================================

impl NetworkExchange {
    /// Creates an exchange, retires its predecessor and emits
    /// `before-request-sent`.
    ///
    /// If the registry already holds an exchange for the same request ID,
    /// a different redirect count marks a redirect continuation (the
    /// predecessor emits `response-completed`), an equal one marks an
    /// authentication retry (the predecessor completes silently).
    ///
    /// Channel-backed transfers get a task listening for their completion
    /// signals. Outside a tokio runtime no task is spawned and the exchange
    /// completes only through the content path or supersession.
    pub fn new(
        metadata: ExchangeMetadata,
        transfer: Arc<dyn TransferHandle>,
        event_bus: Arc<dyn EventBus>,
        body_sizes: Arc<dyn BodySizeAggregator>,
        registry: Arc<ExchangeRegistry>,
    ) -> Arc<Self> {
        let request = RequestDescriptor::from_transfer(transfer.as_ref(), &metadata.raw_headers);

        let exchange = Arc::new(Self {
            id: ExchangeId::next(),
            request_id: request.request_id().clone(),
            channel_id: request.channel_id(),
            redirect_count: request.redirect_count(),
            transfer,
            event_bus,
            body_sizes,
            registry,
            state: Mutex::new(ExchangeState {
                phase: ExchangePhase::Created,
                request,
                response: None,
                from_cache: metadata.from_cache,
                pending_response_start: None,
                listener: None,
            }),
        });

        if let Some(previous) = exchange.registry.get(&exchange.request_id) {
            if previous.redirect_count != exchange.redirect_count {
                debug!(
                    request_id = %exchange.request_id,
                    from = previous.redirect_count,
                    to = exchange.redirect_count,
                    "Redirect continuation"
                );
                previous.notify_redirect();
            } else {
                debug!(request_id = %exchange.request_id, "Authentication retry");
                previous.notify_authentication_attempt();
            }
        }

        exchange.registry.insert(Arc::clone(&exchange));

        if exchange.transfer.is_channel_backed()
            && let Some(signals) = exchange.transfer.subscribe()
        {
            match Handle::try_current() {
                Ok(runtime) => {
                    let listener =
                        Self::spawn_signal_listener(&runtime, Arc::downgrade(&exchange), signals);
                    exchange.state.lock().listener = Some(listener);
                }
                Err(_) => warn!(
                    request_id = %exchange.request_id,
                    channel_id = %exchange.channel_id,
                    "No tokio runtime, transfer signals not observed"
                ),
            }
        }

        {
            let state = exchange.state.lock();
            exchange.emit(NetworkEvent::BeforeRequestSent {
                request: state.request.clone(),
            });

            // Blocked up front, but still completed by the transport signal.
            if let Some(blocked_reason) = metadata.blocked_reason {
                debug!(
                    request_id = %exchange.request_id,
                    reason = %blocked_reason,
                    "Transfer blocked at construction"
                );
                exchange.emit(NetworkEvent::FetchError {
                    request: state.request.clone(),
                    response: state.response.clone(),
                    blocked_reason,
                });
            }
        }

        exchange
    }

    /// Listens for transfer signals and runs transport-level completion.
    ///
    /// Holds only a weak reference; errors are logged and the loop goes on.
    fn spawn_signal_listener(
        runtime: &Handle,
        exchange: Weak<Self>,
        mut signals: broadcast::Receiver<TransferSignal>,
    ) -> JoinHandle<()> {
        runtime.spawn(async move {
            loop {
                let signal = match signals.recv().await {
                    Ok(signal) => signal,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Transfer signals lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(exchange) = exchange.upgrade() else {
                    break;
                };

                match signal {
                    TransferSignal::Error | TransferSignal::Stop => {
                        trace!(request_id = %exchange.request_id, ?signal, "Transfer signal");
                        if let Err(e) = exchange.on_channel_completed().await {
                            warn!(
                                request_id = %exchange.request_id,
                                error = %e,
                                "Channel completion failed"
                            );
                        }
                    }
                }
            }
        })
    }
}

// ============================================================================
// NetworkExchange - Accessors
// ============================================================================

impl NetworkExchange {
    /// Exchange ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    /// Request ID shared with redirects and auth retries.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Underlying channel ID.
    #[inline]
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Redirect count at construction.
    #[inline]
    #[must_use]
    pub fn redirect_count(&self) -> u32 {
        self.redirect_count
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ExchangePhase {
        self.state.lock().phase
    }

    /// Returns `true` once the exchange has completed.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase().is_completed()
    }

    /// Snapshot of the request descriptor.
    #[must_use]
    pub fn request(&self) -> RequestDescriptor {
        self.state.lock().request.clone()
    }

    /// Snapshot of the response descriptor, if headers were applied.
    #[must_use]
    pub fn response(&self) -> Option<ResponseDescriptor> {
        self.state.lock().response.clone()
    }
}

// ============================================================================
// NetworkExchange - Observer Mutators
// ============================================================================

impl NetworkExchange {
    /// Records the cache flag reported by the cache layer.
    pub fn add_cache_details(&self, from_cache: bool) {
        let mut state = self.state.lock();
        if state.phase.is_completed() {
            return;
        }
        state.from_cache = from_cache;
    }

    /// Replaces the request header block with the one actually sent.
    pub fn add_raw_headers(&self, raw_headers: &str) {
        let mut state = self.state.lock();
        if state.phase.is_completed() {
            return;
        }
        state.request.add_raw_headers(raw_headers);
    }

    /// Records request timing marks.
    pub fn add_event_timings(&self, timings: RequestTimings) {
        let mut state = self.state.lock();
        if state.phase.is_completed() {
            return;
        }
        state.request.set_timings(timings);
    }

    /// Applies response headers and emits `response-started`.
    ///
    /// Ignored once a response exists or the exchange has completed.
    pub fn add_response_start(&self, start: ResponseStart) {
        let mut state = self.state.lock();
        self.apply_response_start(&mut state, start);
    }

    /// Stores a response start to apply right before terminal handling.
    pub fn prepare_response_start(&self, start: ResponseStart) {
        let mut state = self.state.lock();
        if state.phase.is_completed() {
            return;
        }
        state.pending_response_start = Some(start);
    }

    /// Emits `auth-required` with the observer's answer handle.
    pub fn on_auth_prompt(&self, challenge: AuthChallenge, callbacks: AuthCallbacks) {
        let state = self.state.lock();
        if state.phase.is_completed() {
            trace!(request_id = %self.request_id, "Auth prompt after completion ignored");
            return;
        }
        self.emit(NetworkEvent::AuthRequired {
            request: state.request.clone(),
            response: state.response.clone(),
            challenge,
            callbacks,
        });
    }

    /// Content-side completion.
    ///
    /// Used for transfers observed from inside a document, such as
    /// service-worker responses. Genuine channel transfers that are not
    /// served by a service worker complete through their transfer signals
    /// only, so the report is ignored for them.
    pub fn add_response_content(&self, content: ResponseContent) {
        if self.is_completed() {
            return;
        }
        if self.transfer.is_channel_backed() && !self.transfer.is_service_worker() {
            trace!(
                request_id = %self.request_id,
                "Content report ignored, channel completes via transfer signals"
            );
            return;
        }
        let sizes = content.sizes();
        self.handle_request_end(content.blocked_reason, Some(sizes));
    }
}

// ============================================================================
// NetworkExchange - Completion
// ============================================================================

impl NetworkExchange {
    /// Transport-level completion, run on the transfer's error/stop signal.
    ///
    /// # Errors
    ///
    /// Propagates body size lookup failures. The exchange then stays
    /// registered and a later signal may still complete it.
    pub(crate) async fn on_channel_completed(&self) -> Result<()> {
        let blocked_reason = {
            let state = self.state.lock();
            if state.phase.is_completed() {
                trace!(request_id = %self.request_id, "Already completed");
                return Ok(());
            }
            self.transfer.blocked_reason()
        };

        let sizes = if blocked_reason.is_none() && !self.transfer.is_service_worker() {
            let decoded_body_size = self
                .body_sizes
                .get_decoded_body_size(self.channel_id)
                .await?;
            Some(ResponseSizes {
                decoded_body_size,
                encoded_body_size: self.transfer.encoded_body_size(),
                transfer_size: self.transfer.transfer_size(),
            })
        } else {
            None
        };

        self.handle_request_end(blocked_reason, sizes);
        Ok(())
    }

    /// Called on a predecessor superseded by a redirect hop.
    fn notify_redirect(&self) {
        let mut state = self.state.lock();
        if state.phase.is_completed() {
            return;
        }
        self.emit(NetworkEvent::ResponseCompleted {
            request: state.request.clone(),
            response: state.response.clone(),
        });
        self.mark_request_complete(&mut state);
    }

    /// Called on a predecessor superseded by an authentication retry.
    ///
    /// Intermediate attempts complete without a terminal event.
    fn notify_authentication_attempt(&self) {
        let mut state = self.state.lock();
        self.mark_request_complete(&mut state);
    }

    /// Emits the terminal event and completes the exchange.
    fn handle_request_end(&self, blocked_reason: Option<BlockedReason>, sizes: Option<ResponseSizes>) {
        let mut state = self.state.lock();
        if state.phase.is_completed() {
            trace!(request_id = %self.request_id, "Already completed");
            return;
        }

        if let Some(start) = state.pending_response_start.take() {
            self.apply_response_start(&mut state, start);
        }

        if let Some(blocked_reason) = blocked_reason {
            self.emit(NetworkEvent::FetchError {
                request: state.request.clone(),
                response: state.response.clone(),
                blocked_reason,
            });
        } else if let Some(response) = state.response.as_mut() {
            if let Some(sizes) = sizes {
                response.set_sizes(sizes);
            }
            let response = response.clone();
            self.emit(NetworkEvent::ResponseCompleted {
                request: state.request.clone(),
                response: Some(response),
            });
        } else {
            warn!(
                request_id = %self.request_id,
                channel_id = %self.channel_id,
                "No response data at completion, skipping response-completed"
            );
        }

        self.mark_request_complete(&mut state);
    }

    /// Single terminal transition.
    ///
    /// Returns `false` if the exchange had already completed.
    fn mark_request_complete(&self, state: &mut ExchangeState) -> bool {
        if state.phase.is_completed() {
            return false;
        }

        state.phase = ExchangePhase::Completed;
        state.request.mark_completed();
        state.pending_response_start = None;

        self.registry.remove_if_owner(&self.request_id, self.id);
        self.body_sizes.delete(self.channel_id);

        if let Some(listener) = state.listener.take() {
            listener.abort();
        }

        debug!(request_id = %self.request_id, exchange_id = %self.id, "Exchange completed");
        true
    }

    /// Builds the response and emits `response-started`.
    fn apply_response_start(&self, state: &mut ExchangeState, start: ResponseStart) {
        match state.phase {
            ExchangePhase::Created => {}
            ExchangePhase::ResponseStarted => {
                debug!(request_id = %self.request_id, "Response already started");
                return;
            }
            ExchangePhase::Completed => return,
        }

        let response = ResponseDescriptor::new(start, state.from_cache);
        state.response = Some(response.clone());
        state.phase = ExchangePhase::ResponseStarted;

        self.emit(NetworkEvent::ResponseStarted {
            request: state.request.clone(),
            response,
        });
    }

    /// Publishes an event. Called with the state lock held, which keeps
    /// per-exchange event order.
    #[inline]
    fn emit(&self, event: NetworkEvent) {
        trace!(request_id = %self.request_id, event = event.name(), "Emitting");
        self.event_bus.emit(event);
    }
}

// ============================================================================
// Tests
// ============================================================================

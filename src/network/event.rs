//! Lifecycle events and the bus they are published on.
//!
//! # Event Types
//!
//! | Kind | Name | Emitted |
//! |------|------|---------|
//! | [`NetworkEventKind::BeforeRequestSent`] | `before-request-sent` | Once, at construction |
//! | [`NetworkEventKind::ResponseStarted`] | `response-started` | When response headers are applied |
//! | [`NetworkEventKind::ResponseCompleted`] | `response-completed` | Terminal, success or redirect hop |
//! | [`NetworkEventKind::FetchError`] | `fetch-error` | Blocked transfer |
//! | [`NetworkEventKind::AuthRequired`] | `auth-required` | Authentication prompt |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::request::RequestDescriptor;
use super::response::ResponseDescriptor;
use super::transfer::BlockedReason;

// ============================================================================
// NetworkEventKind
// ============================================================================

/// Name of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkEventKind {
    /// Request is about to be sent.
    BeforeRequestSent,
    /// Response headers received.
    ResponseStarted,
    /// Response finished.
    ResponseCompleted,
    /// Transfer was blocked.
    FetchError,
    /// Server asked for credentials.
    AuthRequired,
}

impl NetworkEventKind {
    /// Returns the protocol event name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeRequestSent => "before-request-sent",
            Self::ResponseStarted => "response-started",
            Self::ResponseCompleted => "response-completed",
            Self::FetchError => "fetch-error",
            Self::AuthRequired => "auth-required",
        }
    }

    /// Returns `true` for events that end an exchange.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::ResponseCompleted | Self::FetchError)
    }
}

impl fmt::Display for NetworkEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authentication challenge details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Scheme, e.g. `basic` or `digest`.
    pub scheme: String,
    /// Protection realm.
    pub realm: String,
    /// Challenge comes from a proxy.
    pub is_proxy: bool,
}

/// How to answer an authentication prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Let the platform handle the prompt.
    Default,
    /// Cancel the authentication.
    Cancel,
    /// Provide credentials.
    Provide {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
}

/// Answer side of an authentication prompt, carried by `auth-required`.
///
/// Cloneable so it can travel through the bus. The first
/// [`respond`](Self::respond) wins.
#[derive(Clone)]
pub struct AuthCallbacks {
    request_id: RequestId,
    sender: Arc<Mutex<Option<oneshot::Sender<AuthDecision>>>>,
}

impl fmt::Debug for AuthCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCallbacks")
            .field("request_id", &self.request_id)
            .field("handled", &self.is_handled())
            .finish()
    }
}

impl AuthCallbacks {
    /// Creates a callbacks/prompt pair for a request.
    #[must_use]
    pub fn channel(request_id: RequestId) -> (Self, AuthPrompt) {
        let (tx, rx) = oneshot::channel();
        let callbacks = Self {
            request_id,
            sender: Arc::new(Mutex::new(Some(tx))),
        };
        (callbacks, AuthPrompt { receiver: rx })
    }

    /// Request the prompt belongs to.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Returns `true` once a decision was sent.
    #[inline]
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Sends the decision back to the prompt.
    ///
    /// # Errors
    ///
    /// - [`Error::AuthAlreadyHandled`] if a decision was already sent
    pub fn respond(&self, decision: AuthDecision) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .take()
            .ok_or_else(|| Error::auth_already_handled(self.request_id.clone()))?;

        if sender.send(decision).is_err() {
            trace!(request_id = %self.request_id, "Auth prompt dropped before decision");
        }
        Ok(())
    }
}

/// Waiting side of an authentication prompt, held by the observer.
#[derive(Debug)]
pub struct AuthPrompt {
    receiver: oneshot::Receiver<AuthDecision>,
}

impl AuthPrompt {
    /// Waits for the decision.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if every callbacks handle was dropped unanswered
    pub async fn decision(self) -> Result<AuthDecision> {
        Ok(self.receiver.await?)
    }
}

// ============================================================================
// NetworkEvent
// ============================================================================

/// A lifecycle event for one exchange.
///
/// Descriptors are snapshots taken at emission time.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    /// Request is about to be sent.
    BeforeRequestSent {
        /// Request snapshot.
        request: RequestDescriptor,
    },

    /// Response headers received.
    ResponseStarted {
        /// Request snapshot.
        request: RequestDescriptor,
        /// Response snapshot.
        response: ResponseDescriptor,
    },

    /// Response finished.
    ResponseCompleted {
        /// Request snapshot.
        request: RequestDescriptor,
        /// Response snapshot. `None` for a redirect hop superseded before
        /// its headers were applied.
        response: Option<ResponseDescriptor>,
    },

    /// Transfer was blocked.
    FetchError {
        /// Request snapshot.
        request: RequestDescriptor,
        /// Response snapshot, if any.
        response: Option<ResponseDescriptor>,
        /// Block classification.
        blocked_reason: BlockedReason,
    },

    /// Server asked for credentials.
    AuthRequired {
        /// Request snapshot.
        request: RequestDescriptor,
        /// Response snapshot, if any.
        response: Option<ResponseDescriptor>,
        /// Challenge details.
        challenge: AuthChallenge,
        /// Handle to answer the prompt.
        callbacks: AuthCallbacks,
    },
}

impl NetworkEvent {
    /// Returns the event kind.
    #[must_use]
    pub fn kind(&self) -> NetworkEventKind {
        match self {
            Self::BeforeRequestSent { .. } => NetworkEventKind::BeforeRequestSent,
            Self::ResponseStarted { .. } => NetworkEventKind::ResponseStarted,
            Self::ResponseCompleted { .. } => NetworkEventKind::ResponseCompleted,
            Self::FetchError { .. } => NetworkEventKind::FetchError,
            Self::AuthRequired { .. } => NetworkEventKind::AuthRequired,
        }
    }

    /// Returns the protocol event name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Returns the request snapshot.
    #[must_use]
    pub fn request(&self) -> &RequestDescriptor {
        match self {
            Self::BeforeRequestSent { request }
            | Self::ResponseStarted { request, .. }
            | Self::ResponseCompleted { request, .. }
            | Self::FetchError { request, .. }
            | Self::AuthRequired { request, .. } => request,
        }
    }

    /// Returns the response snapshot, if the event carries one.
    #[must_use]
    pub fn response(&self) -> Option<&ResponseDescriptor> {
        match self {
            Self::BeforeRequestSent { .. } => None,
            Self::ResponseStarted { response, .. } => Some(response),
            Self::ResponseCompleted { response, .. }
            | Self::FetchError { response, .. }
            | Self::AuthRequired { response, .. } => response.as_ref(),
        }
    }

    /// Returns the request ID.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> &RequestId {
        self.request().request_id()
    }

    /// Serializes the `{ request, response? }` payload for forwarding.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if a descriptor fails to serialize
    pub fn payload(&self) -> Result<serde_json::Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("request".to_string(), serde_json::to_value(self.request())?);
        if let Some(response) = self.response() {
            payload.insert("response".to_string(), serde_json::to_value(response)?);
        }
        if let Self::FetchError { blocked_reason, .. } = self {
            payload.insert("blockedReason".to_string(), serde_json::to_value(blocked_reason)?);
        }
        Ok(serde_json::Value::Object(payload))
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// Named-event publish point.
///
/// Exchanges call [`emit`](Self::emit) and never listen. Implementations
/// must not call back into the emitting exchange synchronously.
pub trait EventBus: Send + Sync {
    /// Publishes an event.
    fn emit(&self, event: NetworkEvent);
}

// ============================================================================
// BroadcastEventBus
// ============================================================================

/// Event bus fanning out to any number of tokio broadcast receivers.
///
/// Events emitted with no subscriber are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<NetworkEvent>,
}

impl BroadcastEventBus {
    /// Creates a bus buffering up to `capacity` events per receiver.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events emitted from now on.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    #[inline]
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventBus for BroadcastEventBus {
    fn emit(&self, event: NetworkEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            trace!(event = name, "No subscribers, event dropped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Response descriptor and response-side payloads.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;

use super::request::{Header, parse_header_block};
use super::transfer::BlockedReason;

// ============================================================================
// ResponseStart
// ============================================================================

/// Response metadata reported when the response headers become available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseStart {
    /// HTTP status code.
    pub status: u16,
    /// HTTP status text.
    pub status_text: String,
    /// Protocol, e.g. `HTTP/1.1` or `h2`.
    pub protocol: String,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// Raw response header block.
    pub raw_headers: String,
    /// Served from cache.
    pub from_cache: bool,
    /// Served by a service worker.
    pub from_service_worker: bool,
}

impl ResponseStart {
    /// Creates a response start with status and status text.
    #[inline]
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            ..Default::default()
        }
    }

    /// Sets the raw header block.
    #[inline]
    #[must_use]
    pub fn with_raw_headers(mut self, raw_headers: impl Into<String>) -> Self {
        self.raw_headers = raw_headers.into();
        self
    }

    /// Sets the protocol.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Sets the MIME type.
    #[inline]
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Marks the response as served from cache.
    #[inline]
    #[must_use]
    pub fn with_from_cache(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }

    /// Marks the response as served by a service worker.
    #[inline]
    #[must_use]
    pub fn with_from_service_worker(mut self, from_service_worker: bool) -> Self {
        self.from_service_worker = from_service_worker;
        self
    }
}

// ============================================================================
// ResponseSizes
// ============================================================================

/// Body and transfer byte counts, fixed at terminal completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSizes {
    /// Decoded body bytes.
    pub decoded_body_size: u64,
    /// Encoded body bytes.
    pub encoded_body_size: u64,
    /// Bytes on the wire.
    pub transfer_size: u64,
}

// ============================================================================
// ResponseContent
// ============================================================================

/// Completion facts reported from inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseContent {
    /// Decoded body bytes.
    pub decoded_body_size: u64,
    /// Encoded body bytes.
    pub encoded_body_size: u64,
    /// Bytes on the wire.
    pub transfer_size: u64,
    /// Block classification, if the content side saw one.
    pub blocked_reason: Option<BlockedReason>,
}

impl ResponseContent {
    /// Sizes carried by this report.
    #[inline]
    #[must_use]
    pub fn sizes(&self) -> ResponseSizes {
        ResponseSizes {
            decoded_body_size: self.decoded_body_size,
            encoded_body_size: self.encoded_body_size,
            transfer_size: self.transfer_size,
        }
    }
}

// ============================================================================
// ResponseDescriptor
// ============================================================================

/// Metadata of one response.
///
/// Created at most once per exchange. Size counters stay unset until the
/// exchange completes and are written once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    status: u16,
    status_text: String,
    protocol: String,
    mime_type: Option<String>,
    headers: Vec<Header>,
    headers_size: usize,
    from_cache: bool,
    from_service_worker: bool,
    sizes: Option<ResponseSizes>,
}

impl ResponseDescriptor {
    /// Builds a descriptor from a response start.
    ///
    /// `from_cache_override` is the exchange-level cache flag recorded by
    /// `add_cache_details`; either source marks the response as cached.
    pub fn new(start: ResponseStart, from_cache_override: bool) -> Self {
        Self {
            status: start.status,
            status_text: start.status_text,
            protocol: start.protocol,
            mime_type: start.mime_type,
            headers: parse_header_block(&start.raw_headers),
            headers_size: start.raw_headers.len(),
            from_cache: from_cache_override || start.from_cache,
            from_service_worker: start.from_service_worker,
            sizes: None,
        }
    }

    /// HTTP status code.
    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// HTTP status text.
    #[inline]
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Protocol.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// MIME type.
    #[inline]
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Parsed response headers.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Size of the raw header block in bytes.
    #[inline]
    #[must_use]
    pub fn headers_size(&self) -> usize {
        self.headers_size
    }

    /// Served from cache.
    #[inline]
    #[must_use]
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Served by a service worker.
    #[inline]
    #[must_use]
    pub fn from_service_worker(&self) -> bool {
        self.from_service_worker
    }

    /// Final sizes, once the exchange has completed.
    #[inline]
    #[must_use]
    pub fn sizes(&self) -> Option<ResponseSizes> {
        self.sizes
    }

    /// Records final sizes. Later calls are ignored.
    pub(crate) fn set_sizes(&mut self, sizes: ResponseSizes) {
        if self.sizes.is_none() {
            self.sizes = Some(sizes);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

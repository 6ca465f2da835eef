//! Request descriptor.
//!
//! Wraps the metadata of one request as observed at "headers parsed" time.
//! Owned by its [`NetworkExchange`](super::NetworkExchange), which is the
//! only writer.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use url::Url;

use crate::identifiers::{ChannelId, RequestId};

use super::transfer::TransferHandle;

// ============================================================================
// Header
// ============================================================================

/// A single header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    /// Header name as sent.
    pub name: String,
    /// Header value, trimmed.
    pub value: String,
}

/// Parses a raw header block into header lines.
///
/// The request or status line and lines without a colon are skipped.
pub(crate) fn parse_header_block(raw: &str) -> Vec<Header> {
    raw.lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() || name.contains(' ') {
                return None;
            }
            Some(Header {
                name: name.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}

// ============================================================================
// RequestTimings
// ============================================================================

/// Timing marks for a request, in milliseconds since the time origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTimings {
    /// Request creation.
    pub request_time: f64,
    /// Fetch start.
    pub fetch_start: f64,
    /// DNS lookup start.
    pub dns_start: f64,
    /// DNS lookup end.
    pub dns_end: f64,
    /// Connection start.
    pub connect_start: f64,
    /// Connection end.
    pub connect_end: f64,
    /// TLS handshake start.
    pub tls_start: f64,
    /// First request byte sent.
    pub request_start: f64,
    /// First response byte received.
    pub response_start: f64,
    /// Last response byte received.
    pub response_end: f64,
}

// ============================================================================
// RequestDescriptor
// ============================================================================

/// Metadata of one request.
///
/// Immutable except for header augmentation and the `completed` flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    request_id: RequestId,
    channel_id: ChannelId,
    method: String,
    url: Url,
    #[serde(skip)]
    raw_headers: String,
    headers: Vec<Header>,
    headers_size: usize,
    redirect_count: u32,
    timings: Option<RequestTimings>,
    #[serde(skip)]
    completed: bool,
}

impl RequestDescriptor {
    /// Reads request metadata off a transfer handle.
    pub fn from_transfer(transfer: &dyn TransferHandle, raw_headers: &str) -> Self {
        let channel_id = transfer.channel_id();
        Self {
            request_id: RequestId::from_channel(channel_id),
            channel_id,
            method: transfer.method(),
            url: transfer.url(),
            raw_headers: raw_headers.to_string(),
            headers: parse_header_block(raw_headers),
            headers_size: raw_headers.len(),
            redirect_count: transfer.redirect_count(),
            timings: None,
            completed: false,
        }
    }

    /// Stable request ID, shared across redirects and auth retries.
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

    /// HTTP method.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Raw header block as last supplied.
    #[inline]
    #[must_use]
    pub fn raw_headers(&self) -> &str {
        &self.raw_headers
    }

    /// Parsed header lines.
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

    /// Number of redirects followed before this request.
    #[inline]
    #[must_use]
    pub fn redirect_count(&self) -> u32 {
        self.redirect_count
    }

    /// Timing marks, if reported.
    #[inline]
    #[must_use]
    pub fn timings(&self) -> Option<&RequestTimings> {
        self.timings.as_ref()
    }

    /// Returns `true` once the owning exchange has completed.
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Replaces the header block with a fuller one.
    ///
    /// An empty block is ignored so earlier headers are not lost.
    pub(crate) fn add_raw_headers(&mut self, raw_headers: &str) {
        if raw_headers.is_empty() {
            return;
        }
        self.raw_headers = raw_headers.to_string();
        self.headers = parse_header_block(raw_headers);
        self.headers_size = raw_headers.len();
    }

    pub(crate) fn set_timings(&mut self, timings: RequestTimings) {
        self.timings = Some(timings);
    }

    pub(crate) fn mark_completed(&mut self) {
        self.completed = true;
    }
}

// ============================================================================
// Tests
// ============================================================================

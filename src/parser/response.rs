//! Response parser implementation

use super::extract::{row_hash_input, RowExtractor};
use crate::decode::{JsonDecoder, MonitoredReader, ResponseDecoder};
use crate::error::{Error, Result};
use crate::liveness::{Liveness, NoopLiveness};
use crate::memory::{self, SystemAllocator, ValueAllocator};
use crate::page::Page;
use crate::property::LocalTime;
use crate::schema::SchemaFilter;
use std::collections::BTreeSet;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Bytes left untouched below the largest free block
pub const SAFETY_MARGIN: usize = 2048;

const HASH_SEED: u32 = 17;
const HASH_FACTOR: u32 = 31;

// ============================================================================
// Buffer Sizing
// ============================================================================

/// Outcome of parse buffer sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPlan {
    /// Bytes to reserve for the parse
    pub size: usize,
    /// Size fell below half the configured maximum
    pub undersized: bool,
}

/// Size a parse buffer
///
/// `min(max_free - SAFETY_MARGIN, max_buffer, content_length * 1.5)`, the last
/// bound dropped when the length is unknown or zero.
pub fn plan_buffer(max_free: usize, max_buffer: usize, content_length: Option<usize>) -> BufferPlan {
    let mut size = max_free.saturating_sub(SAFETY_MARGIN).min(max_buffer);
    if let Some(len) = content_length.filter(|len| *len > 0) {
        size = size.min(len.saturating_add(len / 2));
    }

    BufferPlan {
        size,
        undersized: size < max_buffer / 2,
    }
}

// ============================================================================
// Parsed Response
// ============================================================================

/// Pages and metadata decoded from one response body
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    /// Pages in upstream order
    pub pages: Vec<Page>,
    /// Combined content hash over (id, last-edited time) of every row
    pub hash: u32,
    pub has_more: bool,
    /// Empty when there is no further page
    pub next_cursor: String,
    /// Property names observed while parsing
    pub seen: BTreeSet<String>,
    /// Body bytes consumed by the decoder
    pub bytes_read: usize,
    /// Buffer plan the parse ran under
    pub buffer: Option<BufferPlan>,
}

impl ParsedResponse {
    /// Buffer was sized below half the configured maximum
    pub fn undersized(&self) -> bool {
        self.buffer.is_some_and(|plan| plan.undersized)
    }
}

// ============================================================================
// Response Parser
// ============================================================================

/// Decodes query response bodies into pages
#[derive(Debug)]
pub struct ResponseParser {
    allocator: Arc<dyn ValueAllocator>,
    decoder: Box<dyn ResponseDecoder>,
    liveness: Arc<dyn Liveness>,
    max_buffer: usize,
    local_time: LocalTime,
}

impl ResponseParser {
    /// Create a parser with the given maximum buffer size
    ///
    /// Uses the system allocator, the JSON decoder, no liveness sink and the
    /// host's local time zone.
    pub fn new(max_buffer: usize) -> Self {
        Self {
            allocator: Arc::new(SystemAllocator::new()),
            decoder: Box::new(JsonDecoder::new()),
            liveness: Arc::new(NoopLiveness),
            max_buffer,
            local_time: LocalTime::default(),
        }
    }

    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn ValueAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: Box<dyn ResponseDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    #[must_use]
    pub fn with_liveness(mut self, liveness: Arc<dyn Liveness>) -> Self {
        self.liveness = liveness;
        self
    }

    #[must_use]
    pub fn with_local_time(mut self, local_time: LocalTime) -> Self {
        self.local_time = local_time;
        self
    }

    pub fn max_buffer(&self) -> usize {
        self.max_buffer
    }

    pub fn local_time(&self) -> LocalTime {
        self.local_time
    }

    /// Largest body a parse could currently accept
    ///
    /// The buffer plan before the content length is known; transports use it
    /// to stop reading a reply that could never be parsed.
    pub fn body_limit(&self) -> usize {
        plan_buffer(self.allocator.max_free_block(), self.max_buffer, None).size
    }

    /// Parse one response body
    ///
    /// Any decode failure (malformed JSON, exhausted buffer, failed
    /// reservation) aborts the whole parse; no partial result is returned.
    pub fn parse<R: Read>(
        &self,
        body: R,
        content_length: Option<usize>,
        filter: &SchemaFilter,
    ) -> Result<ParsedResponse> {
        let max_free = self.allocator.max_free_block();
        let plan = plan_buffer(max_free, self.max_buffer, content_length);
        debug!(
            content_length = ?content_length,
            max_free,
            max_buffer = self.max_buffer,
            buffer = plan.size,
            "sizing parse buffer"
        );
        if plan.undersized {
            warn!(
                buffer = plan.size,
                max_buffer = self.max_buffer,
                "Parse buffer is much smaller than configured; \
                 consider reducing json_parse_buffer_size or freeing memory"
            );
        }

        let reservation = memory::reserve(&self.allocator, plan.size)?;
        let mut reader = MonitoredReader::new(body, reservation.size(), self.liveness.as_ref());
        let decoded = self.decoder.decode(&mut reader);
        let bytes_read = reader.bytes_read();
        debug!(bytes_read, "stream read");

        let response = match decoded {
            Ok(response) => response,
            Err(_) if reader.is_exhausted() => {
                return Err(Error::BufferExhausted {
                    capacity: plan.size,
                });
            }
            Err(e) => return Err(e),
        };

        debug!(rows = response.results.len(), "processing results");
        let mut extractor = RowExtractor::new(filter, self.local_time);
        let mut pages = Vec::with_capacity(response.results.len());
        let mut hash = HASH_SEED;

        for (index, row) in response.results.iter().enumerate() {
            pages.push(extractor.extract(row));
            let row_hash = xxh3_64(row_hash_input(row).as_bytes()) as u32;
            hash = hash.wrapping_mul(HASH_FACTOR).wrapping_add(row_hash);
            self.liveness.feed();
            trace!(index, row_hash, "parsed row");
        }
        drop(reservation);

        let has_more = response.has_more.unwrap_or(false);
        let next_cursor = response.next_cursor.unwrap_or_default();
        debug!(pages = pages.len(), hash, has_more, next_cursor = %next_cursor, "parsed response");

        Ok(ParsedResponse {
            pages,
            hash,
            has_more,
            next_cursor,
            seen: extractor.into_seen(),
            bytes_read,
            buffer: Some(plan),
        })
    }
}

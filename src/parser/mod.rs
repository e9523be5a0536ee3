//! Response parser module
//!
//! Turns a raw query response body into typed [`Page`](crate::page::Page)s,
//! a combined content hash and the pagination metadata of the response.
//!
//! # Overview
//!
//! 1. A parse buffer is sized from free memory, the configured maximum and
//!    the announced content length, then reserved from the allocator.
//! 2. The body is decoded through a byte-limited, liveness-feeding reader.
//! 3. Each row is reduced to a page, filtered by the active
//!    [`SchemaFilter`](crate::schema::SchemaFilter), and folded into the hash.

mod extract;
mod response;

pub use extract::{extract_property, row_hash_input, RowExtractor};
pub use response::{plan_buffer, BufferPlan, ParsedResponse, ResponseParser, SAFETY_MARGIN};

#[cfg(test)]
mod tests;

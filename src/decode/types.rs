//! Decoder types and traits
//!
//! Defines the query response envelope and the decoder abstraction.

use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::Read;

/// Top-level body of a database query response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    /// Result rows in upstream order
    #[serde(default)]
    pub results: Vec<RawRow>,

    /// Whether another page follows
    #[serde(default)]
    pub has_more: Option<bool>,

    /// Cursor of the following page (null on the last page)
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One result row before property extraction
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub created_time: Option<String>,

    #[serde(default)]
    pub last_edited_time: Option<String>,

    #[serde(default)]
    pub archived: Option<bool>,

    #[serde(default)]
    pub in_trash: Option<bool>,

    /// Property name → `{type, <type>: payload}`
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Trait for decoding a response body into the query envelope
pub trait ResponseDecoder: Send + Sync + std::fmt::Debug {
    /// Decode the whole body from a reader
    ///
    /// Implementations must consume the reader incrementally; the reader may
    /// fail mid-stream when the parse buffer is exhausted.
    fn decode(&self, reader: &mut dyn Read) -> Result<QueryResponse>;
}

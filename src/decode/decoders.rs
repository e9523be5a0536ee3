//! Decoder implementations

use super::types::{QueryResponse, ResponseDecoder};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::io::{BufReader, Read};

/// Streaming JSON decoder backed by serde_json
///
/// Fields the envelope does not name are skipped without being materialised.
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self
    }
}

impl ResponseDecoder for JsonDecoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<QueryResponse> {
        let mut de = serde_json::Deserializer::from_reader(BufReader::new(reader));
        let response = QueryResponse::deserialize(&mut de)
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
        de.end()
            .map_err(|e| Error::decode(format!("Trailing data after JSON body: {e}")))?;
        Ok(response)
    }
}

//! Query transport
//!
//! The abstract request/response channel between the orchestrator and the
//! database query endpoint, plus its reqwest-backed implementation.

use super::client::HttpClient;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

/// API version sent with every request
pub const NOTION_VERSION: &str = "2022-06-28";

/// One outbound database query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    /// Database to query
    pub database_id: String,
    /// Integration token
    pub token: String,
    /// Encoded JSON body, `start_cursor` already injected
    pub body: String,
    /// Largest reply body to read before giving up
    pub max_body: usize,
}

/// Raw reply to a database query
#[derive(Debug, Clone)]
pub struct QueryReply {
    /// HTTP status code
    pub status: u16,
    /// Announced body length, if any
    pub content_length: Option<usize>,
    /// Response body
    pub body: Bytes,
}

/// Channel that delivers a query and returns the raw reply
///
/// Implementations fail with a network-class error on connect failure,
/// timeout or non-2xx status, and with [`Error::BufferExhausted`] once the
/// reply body grows past `max_body`.
#[async_trait]
pub trait QueryTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: &QueryRequest) -> Result<QueryReply>;
}

/// Transport posting to `{base}/v1/databases/{id}/query`
#[derive(Debug)]
pub struct NotionTransport {
    client: HttpClient,
}

impl NotionTransport {
    /// Create a transport over a configured HTTP client
    ///
    /// The client's base URL is prefixed to the query path.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Path of the query endpoint for a database
    pub fn query_path(database_id: &str) -> String {
        format!("/v1/databases/{database_id}/query")
    }
}

#[async_trait]
impl QueryTransport for NotionTransport {
    async fn send(&self, request: &QueryRequest) -> Result<QueryReply> {
        let path = Self::query_path(&request.database_id);
        let headers = [
            ("Authorization", format!("Bearer {}", request.token)),
            ("Notion-Version", NOTION_VERSION.to_string()),
            ("Content-Type", "application/json".to_string()),
        ];

        debug!(path = %path, body = %request.body, "sending query");
        let mut response = self.client.post(&path, &headers, &request.body).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), String::new()));
        }

        let content_length = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok());
        if content_length.is_some_and(|len| len > request.max_body) {
            warn!(content_length = ?content_length, max_body = request.max_body, "reply larger than parse buffer");
            return Err(Error::BufferExhausted {
                capacity: request.max_body,
            });
        }

        let mut body = BytesMut::with_capacity(content_length.unwrap_or(0));
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > request.max_body {
                warn!(read = body.len() + chunk.len(), max_body = request.max_body, "reply exceeded parse buffer");
                return Err(Error::BufferExhausted {
                    capacity: request.max_body,
                });
            }
            body.extend_from_slice(&chunk);
        }
        let body = body.freeze();
        debug!(status = status.as_u16(), content_length = ?content_length, bytes = body.len(), "query reply");

        Ok(QueryReply {
            status: status.as_u16(),
            content_length,
            body,
        })
    }
}

//! Fetch orchestration module
//!
//! Drives fetch cycles and cursor navigation over one database query.
//!
//! # Overview
//!
//! The engine module provides:
//! - `FetchOrchestrator` - Validates, sends, parses and reconciles one cycle
//!   at a time and exposes first/next/previous navigation
//! - `CycleStatus` - Outcome of a command
//! - `FetchStats` - Counters across cycles
//!
//! Failures never escape a cycle: they are logged, recorded as the status
//! warning and leave the cached pages and cursors as they were.

mod types;

pub use types::{CycleStatus, FetchStats, PageChangeListener};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::http::{HttpClient, NotionTransport, QueryRequest, QueryTransport};
use crate::liveness::{Liveness, NoopLiveness, Watchdog};
use crate::memory::ValueAllocator;
use crate::page::Page;
use crate::pagination::PaginationState;
use crate::parser::ResponseParser;
use crate::property::PropertyKind;
use crate::schema::SchemaFilter;
use crate::state::CachedResultSet;
use crate::types::{JsonObject, JsonValue};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Set `start_cursor` on a copy of the query template and encode it
///
/// An empty cursor leaves the template as is.
pub fn inject_cursor(template: &JsonObject, cursor: &str) -> Result<String> {
    let mut body = template.clone();
    if !cursor.is_empty() {
        body.insert(
            "start_cursor".to_string(),
            JsonValue::String(cursor.to_string()),
        );
    }
    Ok(serde_json::to_string(&body)?)
}

/// Orchestrates fetch cycles for one database
pub struct FetchOrchestrator {
    /// Database and transport settings
    config: DatabaseConfig,
    /// Request channel
    transport: Box<dyn QueryTransport>,
    /// Body parser
    parser: ResponseParser,
    /// Host liveness signal
    liveness: Arc<dyn Liveness>,
    /// Active name and kind filter
    filter: SchemaFilter,
    /// Cursor state
    pagination: PaginationState,
    /// Last accepted pages
    cache: CachedResultSet,
    /// Change listeners
    listeners: Vec<PageChangeListener>,
    /// Reason the last cycle failed
    warning: Option<String>,
    /// Statistics
    stats: FetchStats,
}

impl FetchOrchestrator {
    /// Create an orchestrator over the given transport
    pub fn new(config: DatabaseConfig, transport: Box<dyn QueryTransport>) -> Result<Self> {
        config.validate_settings()?;
        let parser =
            ResponseParser::new(config.json_parse_buffer_size).with_local_time(config.local_time()?);
        let filter = config.schema_filter();

        Ok(Self {
            config,
            transport,
            parser,
            liveness: Arc::new(NoopLiveness),
            filter,
            pagination: PaginationState::new(),
            cache: CachedResultSet::new(),
            listeners: Vec::new(),
            warning: None,
            stats: FetchStats::new(),
        })
    }

    /// Create an orchestrator talking to the Notion API
    ///
    /// Uses a reqwest transport and a watchdog with the configured timeout.
    pub fn from_config(config: DatabaseConfig) -> Result<Self> {
        let client = HttpClient::with_config(config.http_client_config())?;
        let watchdog = Arc::new(Watchdog::new(config.watchdog_timeout()));
        Ok(Self::new(config, Box::new(NotionTransport::new(client)))?.with_liveness(watchdog))
    }

    /// Set the liveness sink fed around requests and during parsing
    #[must_use]
    pub fn with_liveness(mut self, liveness: Arc<dyn Liveness>) -> Self {
        self.parser = self.parser.with_liveness(Arc::clone(&liveness));
        self.liveness = liveness;
        self
    }

    /// Set the allocator parse buffers are reserved from
    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn ValueAllocator>) -> Self {
        self.parser = self.parser.with_allocator(allocator);
        self
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Every property name observed since the last reset
    pub fn available_properties(&self) -> &BTreeSet<String> {
        self.cache.seen_property_names()
    }

    pub fn page_count(&self) -> usize {
        self.cache.page_count()
    }

    /// True only right after a fetch that replaced the pages
    pub fn has_page_change(&self) -> bool {
        self.cache.changed()
    }

    pub fn pages(&self) -> &[Page] {
        self.cache.pages()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.cache.pages().get(index)
    }

    pub fn content_hash(&self) -> u32 {
        self.cache.content_hash()
    }

    pub fn pagination(&self) -> &PaginationState {
        &self.pagination
    }

    pub fn filter(&self) -> &SchemaFilter {
        &self.filter
    }

    /// Reason the last cycle failed, cleared by the next successful cycle
    pub fn status_warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Run one cycle at the current cursor
    pub async fn update(&mut self) -> CycleStatus {
        self.fetch().await
    }

    /// Reset cursors and cached results, then fetch the first page
    pub async fn first_page(&mut self) -> CycleStatus {
        info!("Loading first page");
        self.reset_state();
        self.fetch().await
    }

    /// Fetch the following page, a no-op when there is none
    pub async fn next_page(&mut self) -> CycleStatus {
        if !self.pagination.advance() {
            warn!("No next page available");
            return CycleStatus::NoOp;
        }
        info!(depth = self.pagination.depth(), "Loading next page");
        self.fetch().await
    }

    /// Fetch the previously visited page, a no-op at the first page
    pub async fn previous_page(&mut self) -> CycleStatus {
        if !self.pagination.retreat() {
            warn!("No previous page available");
            return CycleStatus::NoOp;
        }
        info!(depth = self.pagination.depth(), "Loading previous page");
        self.fetch().await
    }

    /// Drop cached pages, hash, change flag, seen names, cursors and history
    pub fn reset_state(&mut self) {
        debug!("resetting pagination and cached results");
        self.pagination.reset();
        self.cache.reset();
    }

    /// Replace the property name filter; resets state when it changed
    pub fn set_property_filters<I, S>(&mut self, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let changed = self.filter.set_property_names(names);
        if changed {
            info!(filters = ?self.filter.property_names(), "property filters changed");
            self.reset_state();
        }
        changed
    }

    /// Add one name to the property filter; resets state when it was new
    pub fn add_property_filter(&mut self, name: impl Into<String>) -> bool {
        let changed = self.filter.add_property_name(name);
        if changed {
            info!(filters = ?self.filter.property_names(), "property filter added");
            self.reset_state();
        }
        changed
    }

    /// Replace the supported kind allowlist; resets state when it changed
    pub fn set_supported_kinds(&mut self, kinds: impl IntoIterator<Item = PropertyKind>) -> bool {
        let changed = self.filter.set_supported_kinds(kinds.into_iter().collect());
        if changed {
            info!(kinds = ?self.filter.supported_kinds(), "supported types changed");
            self.reset_state();
        }
        changed
    }

    /// Register a callback invoked once per detected change
    pub fn on_page_change<F>(&mut self, listener: F)
    where
        F: Fn(&[Page], &BTreeSet<String>) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Run `update` every `interval` until `shutdown` resolves
    ///
    /// The first cycle runs immediately. Shutdown is only observed between
    /// cycles.
    pub async fn run<F>(&mut self, interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Stopping periodic updates");
                    break;
                }
                _ = ticker.tick() => {
                    let status = self.update().await;
                    debug!(%status, "periodic update");
                }
            }
        }
    }

    /// Effective configuration with the token masked
    pub fn config_summary(&self) -> Vec<(&'static str, String)> {
        let token = if self.config.api_token.is_empty() {
            "not set"
        } else {
            "set"
        };
        let kinds: Vec<String> = self
            .filter
            .supported_kinds()
            .iter()
            .map(ToString::to_string)
            .collect();
        let names: Vec<&str> = self
            .filter
            .property_names()
            .iter()
            .map(String::as_str)
            .collect();

        vec![
            ("Database ID", self.config.database_id.clone()),
            ("API Token", token.to_string()),
            (
                "Query",
                self.config.query.clone().unwrap_or_else(|| "{}".to_string()),
            ),
            ("Property Filters", names.join(", ")),
            ("Supported Types", kinds.join(", ")),
            (
                "JSON Parse Buffer",
                format!("{} bytes", self.config.json_parse_buffer_size),
            ),
            (
                "Timeouts",
                format!(
                    "connect {}ms, total {}ms, watchdog {}ms",
                    self.config.http_connect_timeout_ms,
                    self.config.http_timeout_ms,
                    self.config.watchdog_timeout_ms
                ),
            ),
            ("Verify SSL", self.config.verify_ssl.to_string()),
            (
                "Update Interval",
                format!("{}s", self.config.update_interval_secs),
            ),
        ]
    }

    /// Log the effective configuration
    pub fn dump_config(&self) {
        info!("Notion Database:");
        for (key, value) in self.config_summary() {
            info!("  {key}: {value}");
        }
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    async fn fetch(&mut self) -> CycleStatus {
        let start = Instant::now();
        self.stats.cycles += 1;

        let status = match self.try_fetch().await {
            Ok(status) => {
                self.warning = None;
                status
            }
            Err(e) => {
                warn!(category = %e.category(), error = %e, "fetch cycle failed");
                self.stats.failures += 1;
                self.warning = Some(format!("{} error: {e}", e.category()));
                CycleStatus::failed(&e)
            }
        };

        self.stats.last_duration_ms = start.elapsed().as_millis() as u64;
        status
    }

    async fn try_fetch(&mut self) -> Result<CycleStatus> {
        self.config.validate()?;
        let body = inject_cursor(
            &self.config.query_template()?,
            self.pagination.current_cursor(),
        )?;
        let request = QueryRequest {
            database_id: self.config.database_id.clone(),
            token: self.config.api_token.clone(),
            body,
            max_body: self.parser.body_limit(),
        };

        self.liveness.feed();
        let reply = self.transport.send(&request).await;
        self.liveness.feed();
        let reply = reply?;
        self.stats.fetches += 1;

        let parsed = self
            .parser
            .parse(reply.body.as_ref(), reply.content_length, &self.filter)?;
        self.stats.bytes_read += parsed.bytes_read;
        if parsed.undersized() {
            self.stats.undersized_parses += 1;
        }

        self.pagination
            .apply_response(parsed.has_more, &parsed.next_cursor);
        self.cache.record_seen(parsed.seen);

        let outcome = self.cache.reconcile(parsed.pages, parsed.hash);
        if outcome.is_changed() {
            self.stats.changes += 1;
            for listener in &self.listeners {
                listener(self.cache.pages(), self.cache.seen_property_names());
            }
        }

        Ok(outcome.into())
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("database_id", &self.config.database_id)
            .field("transport", &self.transport)
            .field("filter", &self.filter)
            .field("pagination", &self.pagination)
            .field("pages", &self.cache.page_count())
            .field("listeners", &self.listeners.len())
            .field("warning", &self.warning)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

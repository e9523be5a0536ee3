//! Tests for the fetch orchestrator

use super::*;
use crate::error::{Error, ErrorCategory, Result};
use crate::http::QueryReply;
use crate::liveness::Watchdog;
use crate::property::TypedProperty;
use async_trait::async_trait;
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Scripted Transport
// ============================================================================

#[derive(Debug, Default)]
struct Script {
    /// start_cursor -> response body
    bodies: HashMap<String, String>,
    /// Fail every request with this status
    fail_status: Option<u16>,
    /// Decoded bodies of every request
    requests: Vec<JsonValue>,
}

#[derive(Debug, Clone, Default)]
struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    fn respond(&self, cursor: &str, body: impl Into<String>) {
        self.script
            .lock()
            .unwrap()
            .bodies
            .insert(cursor.to_string(), body.into());
    }

    fn fail_with(&self, status: Option<u16>) {
        self.script.lock().unwrap().fail_status = status;
    }

    fn requests(&self) -> Vec<JsonValue> {
        self.script.lock().unwrap().requests.clone()
    }

    fn cursors(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| {
                r.get("start_cursor")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }
}

#[async_trait]
impl QueryTransport for ScriptedTransport {
    async fn send(&self, request: &QueryRequest) -> Result<QueryReply> {
        let mut script = self.script.lock().unwrap();
        let body: JsonValue = serde_json::from_str(&request.body).unwrap();
        let cursor = body
            .get("start_cursor")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        script.requests.push(body);

        if let Some(status) = script.fail_status {
            return Err(Error::http_status(status, "scripted failure"));
        }

        let text = script
            .bodies
            .get(&cursor)
            .cloned()
            .unwrap_or_else(|| panic!("no scripted response for cursor '{cursor}'"));
        Ok(QueryReply {
            status: 200,
            content_length: Some(text.len()),
            body: Bytes::from(text),
        })
    }
}

fn page_body(ids: &[&str], next: Option<&str>) -> String {
    let results: Vec<JsonValue> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "last_edited_time": "2024-01-01T00:00:00Z",
                "properties": {
                    "Name": {"type": "title", "title": [{"plain_text": format!("row {id}")}]},
                    "Score": {"type": "number", "number": 1}
                }
            })
        })
        .collect();

    json!({
        "results": results,
        "has_more": next.is_some(),
        "next_cursor": next,
    })
    .to_string()
}

/// Three pages: "" -> c2 -> c3
fn three_pages() -> ScriptedTransport {
    let transport = ScriptedTransport::default();
    transport.respond("", page_body(&["a", "b"], Some("c2")));
    transport.respond("c2", page_body(&["c", "d"], Some("c3")));
    transport.respond("c3", page_body(&["e"], None));
    transport
}

fn orchestrator(transport: &ScriptedTransport) -> FetchOrchestrator {
    let mut config = DatabaseConfig::new("secret_abc", "db1");
    config.utc_offset_minutes = Some(0);
    FetchOrchestrator::new(config, Box::new(transport.clone())).unwrap()
}

fn first_id(orch: &FetchOrchestrator) -> Option<String> {
    orch.page(0)
        .and_then(|p| p.get("ID"))
        .and_then(TypedProperty::as_text)
        .map(str::to_string)
}

// ============================================================================
// Cursor Injection Tests
// ============================================================================

#[test]
fn test_inject_cursor_sets_start_cursor() {
    let template = json!({"page_size": 10}).as_object().unwrap().clone();

    let body = inject_cursor(&template, "abc").unwrap();
    let value: JsonValue = serde_json::from_str(&body).unwrap();

    assert_eq!(value, json!({"page_size": 10, "start_cursor": "abc"}));
}

#[test]
fn test_inject_cursor_overwrites_existing() {
    let template = json!({"start_cursor": "old"}).as_object().unwrap().clone();

    let body = inject_cursor(&template, "new").unwrap();

    assert_eq!(body, r#"{"start_cursor":"new"}"#);
}

#[test]
fn test_inject_cursor_empty_keeps_template() {
    assert_eq!(inject_cursor(&JsonObject::new(), "").unwrap(), "{}");
}

// ============================================================================
// Fetch Cycle Tests
// ============================================================================

#[tokio::test]
async fn test_first_page_fetches_and_notifies() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    orch.on_page_change(move |pages, names| {
        assert!(names.contains("Name"));
        assert_eq!(pages.len(), 2);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let status = orch.first_page().await;

    assert_eq!(status, CycleStatus::Changed);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(orch.page_count(), 2);
    assert!(orch.has_page_change());
    assert_eq!(first_id(&orch).as_deref(), Some("a"));
    assert!(orch.available_properties().contains("Name"));
    assert!(orch.available_properties().contains("Score"));
    assert!(orch.pagination().has_more());
    assert_eq!(orch.pagination().next_cursor(), "c2");
    assert!(orch.status_warning().is_none());
}

#[tokio::test]
async fn test_repeated_update_is_idempotent() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    orch.on_page_change(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    orch.first_page().await;
    let hash = orch.content_hash();
    let status = orch.update().await;

    assert_eq!(status, CycleStatus::Unchanged);
    assert!(!orch.has_page_change());
    assert_eq!(orch.content_hash(), hash);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(orch.pagination().next_cursor(), "c2");
    assert_eq!(transport.cursors(), vec!["", ""]);
}

#[tokio::test]
async fn test_query_template_is_sent() {
    let transport = three_pages();
    let mut config = DatabaseConfig::new("secret_abc", "db1");
    config.query = Some(r#"{"page_size": 2, "sorts": []}"#.to_string());
    let mut orch = FetchOrchestrator::new(config, Box::new(transport.clone())).unwrap();

    orch.first_page().await;
    orch.next_page().await;

    let requests = transport.requests();
    assert_eq!(requests[0], json!({"page_size": 2, "sorts": []}));
    assert_eq!(
        requests[1],
        json!({"page_size": 2, "sorts": [], "start_cursor": "c2"})
    );
}

// ============================================================================
// Navigation Tests
// ============================================================================

#[tokio::test]
async fn test_cursor_stack_law() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);

    orch.first_page().await;
    assert_eq!(orch.next_page().await, CycleStatus::Changed);
    let before_second_next = orch.pagination().current_cursor().to_string();
    assert_eq!(orch.next_page().await, CycleStatus::Changed);
    assert_eq!(first_id(&orch).as_deref(), Some("e"));
    assert!(!orch.pagination().has_more());

    assert_eq!(orch.previous_page().await, CycleStatus::Changed);

    assert_eq!(orch.pagination().current_cursor(), before_second_next);
    assert_eq!(first_id(&orch).as_deref(), Some("c"));
    assert_eq!(transport.cursors(), vec!["", "c2", "c3", "c2"]);
}

#[tokio::test]
async fn test_previous_on_first_page_is_noop() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.first_page().await;
    let before = orch.pagination().clone();

    let status = orch.previous_page().await;

    assert_eq!(status, CycleStatus::NoOp);
    assert_eq!(orch.pagination(), &before);
    assert_eq!(transport.requests().len(), 1);
    assert!(orch.has_page_change());
}

#[tokio::test]
async fn test_next_without_more_is_noop() {
    let transport = ScriptedTransport::default();
    transport.respond("", page_body(&["only"], None));
    let mut orch = orchestrator(&transport);
    orch.first_page().await;
    let before = orch.pagination().clone();

    let status = orch.next_page().await;

    assert_eq!(status, CycleStatus::NoOp);
    assert_eq!(orch.pagination(), &before);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_first_page_resets_history() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);

    orch.first_page().await;
    orch.next_page().await;
    orch.next_page().await;
    assert_eq!(orch.pagination().depth(), 2);

    orch.first_page().await;

    assert_eq!(orch.pagination().depth(), 0);
    assert!(orch.pagination().is_first_page());
    assert_eq!(first_id(&orch).as_deref(), Some("a"));
    assert!(orch.has_page_change());
}

#[tokio::test]
async fn test_reset_state_clears_everything_but_filters() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.set_property_filters(["Name"]);
    orch.first_page().await;
    orch.next_page().await;

    orch.reset_state();

    assert_eq!(orch.page_count(), 0);
    assert_eq!(orch.content_hash(), 0);
    assert!(!orch.has_page_change());
    assert!(orch.available_properties().is_empty());
    assert!(orch.pagination().is_first_page());
    assert!(!orch.pagination().has_more());
    assert_eq!(orch.pagination().depth(), 0);
    assert!(orch.filter().accepts_name("Name"));
    assert!(!orch.filter().accepts_name("Score"));
    assert_eq!(transport.requests().len(), 2);
}

// ============================================================================
// Filter Tests
// ============================================================================

#[tokio::test]
async fn test_filter_change_resets_state() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.first_page().await;
    orch.next_page().await;

    assert!(orch.set_property_filters(["X"]));

    assert_eq!(orch.page_count(), 0);
    assert!(orch.available_properties().is_empty());
    assert!(!orch.has_page_change());
    assert!(orch.pagination().is_first_page());
    assert_eq!(orch.content_hash(), 0);
    assert_eq!(transport.requests().len(), 2);

    orch.update().await;
    assert!(orch.available_properties().contains("Name"));
    assert!(orch.page(0).unwrap().is_empty());
}

#[tokio::test]
async fn test_same_filter_does_not_reset() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.first_page().await;

    assert!(!orch.set_property_filters(Vec::<String>::new()));
    assert_eq!(orch.page_count(), 2);

    assert!(orch.add_property_filter("Name"));
    assert_eq!(orch.page_count(), 0);
    assert!(!orch.add_property_filter("Name"));
}

#[tokio::test]
async fn test_supported_kinds_change_resets_state() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.first_page().await;

    assert!(orch.set_supported_kinds([PropertyKind::Title]));
    assert_eq!(orch.page_count(), 0);

    orch.update().await;
    assert!(orch.available_properties().contains("Name"));
    assert!(!orch.available_properties().contains("Score"));
    assert!(!orch.page(0).unwrap().contains("Score"));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_malformed_body_keeps_cache() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.first_page().await;
    let hash = orch.content_hash();

    transport.respond("", r#"{"results": [{"id": "#);
    let status = orch.update().await;

    assert_eq!(status.failure_category(), Some(ErrorCategory::Parse));
    assert_eq!(orch.content_hash(), hash);
    assert_eq!(orch.page_count(), 2);
    assert!(orch.has_page_change());
    assert_eq!(orch.pagination().next_cursor(), "c2");
    assert!(orch.status_warning().unwrap().starts_with("parse"));
}

#[tokio::test]
async fn test_network_failure_sets_and_clears_warning() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);
    orch.first_page().await;

    transport.fail_with(Some(503));
    let status = orch.update().await;
    assert_eq!(status.failure_category(), Some(ErrorCategory::Network));
    assert!(orch.status_warning().is_some());
    assert_eq!(orch.page_count(), 2);

    transport.fail_with(None);
    assert_eq!(orch.update().await, CycleStatus::Unchanged);
    assert!(orch.status_warning().is_none());
    assert_eq!(orch.stats().failures, 1);
}

#[tokio::test]
async fn test_invalid_config_skips_network() {
    let transport = three_pages();
    let config = DatabaseConfig::new("", "db1");
    let mut orch = FetchOrchestrator::new(config, Box::new(transport.clone())).unwrap();

    let status = orch.first_page().await;

    assert_eq!(status.failure_category(), Some(ErrorCategory::Config));
    assert!(transport.requests().is_empty());
    assert!(orch.status_warning().unwrap().contains("api_token"));
}

#[tokio::test]
async fn test_malformed_query_template_skips_network() {
    let transport = three_pages();
    let mut config = DatabaseConfig::new("secret_abc", "db1");
    config.query = Some("{not json".to_string());
    let mut orch = FetchOrchestrator::new(config, Box::new(transport.clone())).unwrap();

    let status = orch.update().await;

    assert_eq!(status.failure_category(), Some(ErrorCategory::Config));
    assert!(transport.requests().is_empty());
}

// ============================================================================
// Periodic Update Tests
// ============================================================================

#[tokio::test]
async fn test_run_until_shutdown() {
    let transport = three_pages();
    let mut orch = orchestrator(&transport);

    orch.run(
        Duration::from_millis(10),
        tokio::time::sleep(Duration::from_millis(55)),
    )
    .await;

    let cycles = transport.requests().len();
    assert!(cycles >= 2, "expected several cycles, got {cycles}");
    assert_eq!(orch.stats().changes, 1);
    assert_eq!(orch.stats().cycles, cycles);
}

#[tokio::test]
async fn test_liveness_fed_around_request() {
    let transport = three_pages();
    let dog = Arc::new(Watchdog::new(Duration::from_secs(15)));
    let mut orch = orchestrator(&transport).with_liveness(dog.clone());

    orch.first_page().await;

    // Two around the request, at least one body read, one per row.
    assert!(dog.feed_count() >= 5);
}

// ============================================================================
// Config Dump Tests
// ============================================================================

#[test]
fn test_config_summary_masks_token() {
    let transport = ScriptedTransport::default();
    let orch = orchestrator(&transport);

    let summary = orch.config_summary();
    let rendered = format!("{summary:?}");

    assert!(summary.contains(&("API Token", "set".to_string())));
    assert!(summary.contains(&("Database ID", "db1".to_string())));
    assert!(!rendered.contains("secret_abc"));
    assert!(rendered.contains("TITLE"));
}

#[test]
fn test_invalid_settings_rejected_at_construction() {
    let mut config = DatabaseConfig::new("secret_abc", "db1");
    config.utc_offset_minutes = Some(100_000);

    let result = FetchOrchestrator::new(config, Box::new(ScriptedTransport::default()));

    assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
}

//! Tests for response parser module

use super::*;
use crate::error::{Error, Result as CrateResult};
use crate::liveness::Watchdog;
use crate::memory::{BoundedArena, ValueAllocator};
use crate::property::{LocalTime, PropertyKind, Timestamp, TypedProperty};
use crate::schema::SchemaFilter;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

const ALPHA: &str = r#"{"results":[{"id":"p1","last_edited_time":"2024-01-01T00:00:00Z","properties":{"Name":{"type":"title","title":[{"plain_text":"Alpha"}]}}}],"has_more":false,"next_cursor":null}"#;

fn parser() -> ResponseParser {
    ResponseParser::new(20 * 1024).with_local_time(LocalTime::utc())
}

fn parse(body: &str) -> CrateResult<ParsedResponse> {
    parser().parse(body.as_bytes(), Some(body.len()), &SchemaFilter::default())
}

fn two_rows(first_title: &str, second_title: &str) -> String {
    json!({
        "results": [
            {"id": "a", "last_edited_time": "2024-01-01T00:00:00Z",
             "properties": {"Name": {"type": "title", "title": [{"plain_text": first_title}]}}},
            {"id": "b", "last_edited_time": "2024-02-01T00:00:00Z",
             "properties": {"Name": {"type": "title", "title": [{"plain_text": second_title}]}}}
        ],
        "has_more": false
    })
    .to_string()
}

#[derive(Debug)]
struct RefusingAllocator;

impl ValueAllocator for RefusingAllocator {
    fn max_free_block(&self) -> usize {
        1 << 20
    }

    fn allocate(&self, size: usize) -> CrateResult<()> {
        Err(Error::Allocation {
            requested: size,
            available: 0,
        })
    }

    fn deallocate(&self, _size: usize) {}
}

// ============================================================================
// Buffer Planning Tests
// ============================================================================

#[test_case(1 << 20, 20480, None, 20480, false ; "configured maximum binds")]
#[test_case(10_000, 20480, None, 7952, true ; "free memory binds")]
#[test_case(1 << 20, 20480, Some(10_000), 15_000, false ; "content length binds")]
#[test_case(1 << 20, 20480, Some(1_000), 1_500, true ; "small body warns")]
#[test_case(1 << 20, 20480, Some(0), 20480, false ; "zero length is unknown")]
#[test_case(1_000, 20480, None, 0, true ; "below safety margin")]
fn test_plan_buffer(
    max_free: usize,
    max_buffer: usize,
    content_length: Option<usize>,
    size: usize,
    undersized: bool,
) {
    assert_eq!(
        plan_buffer(max_free, max_buffer, content_length),
        BufferPlan { size, undersized }
    );
}

#[test]
fn test_body_limit_follows_free_memory() {
    assert_eq!(parser().body_limit(), 20 * 1024);

    let arena: Arc<dyn ValueAllocator> = Arc::new(BoundedArena::new(10_000));
    let constrained = parser().with_allocator(Arc::clone(&arena));
    assert_eq!(constrained.body_limit(), 7952);

    let _held = crate::memory::reserve(&arena, 4_000).unwrap();
    assert_eq!(constrained.body_limit(), 3952);
}

// ============================================================================
// Parse Tests
// ============================================================================

#[test]
fn test_parse_alpha_example() {
    let parsed = parse(ALPHA).unwrap();

    assert_eq!(parsed.pages.len(), 1);
    let name = parsed.pages[0].get("Name").unwrap();
    assert_eq!(name.kind(), PropertyKind::Title);
    assert_eq!(name.as_text(), Some("Alpha"));

    assert_ne!(parsed.hash, 0);
    assert_eq!(parsed.hash, parse(ALPHA).unwrap().hash);
    assert!(!parsed.has_more);
    assert_eq!(parsed.next_cursor, "");
    assert_eq!(parsed.bytes_read, ALPHA.len());
}

#[test]
fn test_parse_meta_properties() {
    let body = json!({
        "results": [{
            "id": "p1",
            "created_time": "2023-06-01T08:00:00.000Z",
            "last_edited_time": "2024-01-01T00:00:00.000Z",
            "archived": true,
            "properties": {}
        }]
    })
    .to_string();

    let parsed = parse(&body).unwrap();
    let page = &parsed.pages[0];

    assert_eq!(page.get("ID"), Some(&TypedProperty::Title("p1".into())));
    assert_eq!(
        page.get("Created Time").and_then(TypedProperty::as_timestamp),
        Timestamp::from_ymd_hms(2023, 6, 1, 8, 0, 0)
    );
    assert_eq!(
        page.get("Last Edited Time").unwrap().kind(),
        PropertyKind::LastEditedTime
    );
    assert_eq!(page.get("Archived"), Some(&TypedProperty::Checkbox(true)));
    assert_eq!(page.get("In Trash"), Some(&TypedProperty::Checkbox(false)));
}

#[test]
fn test_parse_meta_defaults() {
    let parsed = parse(r#"{"results":[{}]}"#).unwrap();
    let page = &parsed.pages[0];

    assert_eq!(page.get("ID").and_then(TypedProperty::as_text), Some("unknown_id"));
    assert_eq!(
        page.get("Created Time").and_then(TypedProperty::as_timestamp),
        Timestamp::from_ymd_hms(1970, 1, 1, 0, 0, 0)
    );
}

#[test]
fn test_parse_every_supported_kind() {
    let body = json!({
        "results": [{
            "id": "p1",
            "last_edited_time": "2024-01-01T00:00:00Z",
            "properties": {
                "Name": {"type": "title", "title": [{"plain_text": "Al"}, {"plain_text": "pha"}]},
                "Notes": {"type": "rich_text", "rich_text": [{"plain_text": "one"}, {"plain_text": "two"}]},
                "Score": {"type": "number", "number": 4.5},
                "Empty Score": {"type": "number", "number": null},
                "Due": {"type": "date", "date": {"start": "2024-03-05", "end": null}},
                "Tier": {"type": "select", "select": {"name": "Gold"}},
                "No Tier": {"type": "select", "select": null},
                "Tags": {"type": "multi_select", "multi_select": [{"name": "a"}, {"name": "b"}]},
                "Made": {"type": "created_time", "created_time": "2023-01-02T03:04:05Z"},
                "Mail": {"type": "email", "email": "a@b.c"},
                "Phone": {"type": "phone_number", "phone_number": null},
                "State": {"type": "status", "status": {"name": "Done"}},
                "Link": {"type": "url", "url": "https://example.com"}
            }
        }]
    })
    .to_string();

    let parsed = parse(&body).unwrap();
    let page = &parsed.pages[0];

    assert_eq!(page.get("Name"), Some(&TypedProperty::Title("Alpha".into())));
    assert_eq!(
        page.get("Notes"),
        Some(&TypedProperty::RichText(vec!["one".into(), "two".into()]))
    );
    assert_eq!(page.get("Score"), Some(&TypedProperty::Number(4.5)));
    assert_eq!(page.get("Empty Score"), Some(&TypedProperty::Number(0.0)));
    assert_eq!(
        page.get("Due"),
        Some(&TypedProperty::Date(Timestamp::from_ymd_hms(2024, 3, 5, 0, 0, 0)))
    );
    assert_eq!(page.get("Tier"), Some(&TypedProperty::Select("Gold".into())));
    assert_eq!(page.get("No Tier"), Some(&TypedProperty::Select(String::new())));
    assert_eq!(
        page.get("Tags"),
        Some(&TypedProperty::MultiSelect(vec!["a".into(), "b".into()]))
    );
    assert_eq!(
        page.get("Made"),
        Some(&TypedProperty::CreatedTime(Timestamp::from_ymd_hms(2023, 1, 2, 3, 4, 5)))
    );
    assert_eq!(page.get("Mail"), Some(&TypedProperty::Email("a@b.c".into())));
    assert_eq!(page.get("Phone"), Some(&TypedProperty::PhoneNumber(String::new())));
    assert_eq!(page.get("State"), Some(&TypedProperty::Status("Done".into())));
    assert_eq!(
        page.get("Link"),
        Some(&TypedProperty::Url("https://example.com".into()))
    );
}

#[test]
fn test_parse_preserves_upstream_order() {
    let body = r#"{"results":[{"properties":{
        "Zeta":{"type":"email","email":"z"},
        "Alpha":{"type":"email","email":"a"}}}]}"#;

    let parsed = parse(body).unwrap();
    let keys: Vec<u32> = parsed.pages[0].iter().map(|(k, _)| k).skip(5).collect();

    assert_eq!(
        keys,
        vec![crate::page::hash_key("Zeta"), crate::page::hash_key("Alpha")]
    );
}

#[test]
fn test_parse_pagination_metadata() {
    let parsed = parse(r#"{"results":[],"has_more":true,"next_cursor":"cur-2"}"#).unwrap();

    assert!(parsed.has_more);
    assert_eq!(parsed.next_cursor, "cur-2");
    assert!(parsed.pages.is_empty());
    assert_eq!(parsed.hash, 17);
}

#[test]
fn test_parse_malformed_json() {
    let err = parse(r#"{"results":[{"id":"p1""#).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(err.category(), crate::error::ErrorCategory::Parse);
}

// ============================================================================
// Hash Tests
// ============================================================================

#[test]
fn test_hash_ignores_field_values() {
    let first = parse(&two_rows("Alpha", "Beta")).unwrap();
    let second = parse(&two_rows("Gamma", "Delta")).unwrap();

    assert_eq!(first.hash, second.hash);
    assert_ne!(first.pages, second.pages);
}

#[test]
fn test_hash_follows_row_order() {
    let forward = r#"{"results":[
        {"id":"a","last_edited_time":"t1"},
        {"id":"b","last_edited_time":"t2"}]}"#;
    let reversed = r#"{"results":[
        {"id":"b","last_edited_time":"t2"},
        {"id":"a","last_edited_time":"t1"}]}"#;

    assert_ne!(parse(forward).unwrap().hash, parse(reversed).unwrap().hash);
}

#[test]
fn test_hash_tracks_last_edited_time() {
    let before = r#"{"results":[{"id":"a","last_edited_time":"2024-01-01T00:00:00Z"}]}"#;
    let after = r#"{"results":[{"id":"a","last_edited_time":"2024-01-02T00:00:00Z"}]}"#;

    assert_ne!(parse(before).unwrap().hash, parse(after).unwrap().hash);
}

// ============================================================================
// Filter Tests
// ============================================================================

#[test]
fn test_name_filter_limits_page_but_not_seen() {
    let filter = SchemaFilter::new().with_property_names(["Name"]);
    let parsed = parser()
        .parse(ALPHA.as_bytes(), None, &filter)
        .unwrap();

    let page = &parsed.pages[0];
    assert_eq!(page.len(), 1);
    assert!(page.contains("Name"));
    assert!(!page.contains("ID"));

    for meta in crate::schema::META_PROPERTY_NAMES {
        assert!(parsed.seen.contains(meta));
    }
    assert!(parsed.seen.contains("Name"));
}

#[test]
fn test_kind_allowlist_skips_entirely() {
    let body = r#"{"results":[{"properties":{
        "Done":{"type":"checkbox","checkbox":true},
        "Owner":{"type":"people","people":[]},
        "Name":{"type":"title","title":[]}}}]}"#;

    let parsed = parse(body).unwrap();
    let page = &parsed.pages[0];

    assert!(!parsed.seen.contains("Done"));
    assert!(!page.contains("Done"));

    assert!(parsed.seen.contains("Owner"));
    assert!(!page.contains("Owner"));

    assert!(page.contains("Name"));
}

#[test]
fn test_kind_allowlist_admits_checkbox() {
    let body = r#"{"results":[{"properties":{"Done":{"type":"checkbox","checkbox":true}}}]}"#;
    let filter = SchemaFilter::new().with_supported_kinds([PropertyKind::Checkbox]);

    let parsed = parser().parse(body.as_bytes(), None, &filter).unwrap();

    assert_eq!(
        parsed.pages[0].get("Done"),
        Some(&TypedProperty::Checkbox(true))
    );
}

// ============================================================================
// Resource Tests
// ============================================================================

#[test]
fn test_buffer_exhaustion_aborts() {
    let parser = ResponseParser::new(16);
    let err = parser
        .parse(ALPHA.as_bytes(), None, &SchemaFilter::default())
        .unwrap_err();

    assert!(matches!(err, Error::BufferExhausted { capacity: 16 }));
}

#[test]
fn test_reservation_failure_aborts() {
    let parser = parser().with_allocator(Arc::new(RefusingAllocator));
    let err = parser
        .parse(ALPHA.as_bytes(), None, &SchemaFilter::default())
        .unwrap_err();

    assert!(matches!(err, Error::Allocation { .. }));
}

#[test]
fn test_reservation_released_after_parse() {
    let arena = Arc::new(BoundedArena::new(64 * 1024));
    let parser = parser().with_allocator(arena.clone());

    parser
        .parse(ALPHA.as_bytes(), None, &SchemaFilter::default())
        .unwrap();
    assert_eq!(arena.used(), 0);

    parser
        .parse(&b"not json"[..], None, &SchemaFilter::default())
        .unwrap_err();
    assert_eq!(arena.used(), 0);
}

#[test]
fn test_undersized_buffer_is_reported() {
    let parsed = parser()
        .parse(ALPHA.as_bytes(), Some(ALPHA.len()), &SchemaFilter::default())
        .unwrap();
    assert!(parsed.undersized());

    let parsed = parser()
        .parse(ALPHA.as_bytes(), None, &SchemaFilter::default())
        .unwrap();
    assert!(!parsed.undersized());
}

#[test]
fn test_liveness_fed_per_row() {
    let dog = Arc::new(Watchdog::new(Duration::from_secs(15)));
    let parser = parser().with_liveness(dog.clone());

    parser
        .parse(two_rows("a", "b").as_bytes(), None, &SchemaFilter::default())
        .unwrap();

    // At least one feed per body read plus one per row.
    assert!(dog.feed_count() >= 3);
}

#[test]
fn test_fixed_offset_shifts_dates() {
    let body = r#"{"results":[{"properties":{"Due":{"type":"date","date":{"start":"2024-03-05"}}}}]}"#;
    let parser = parser().with_local_time(LocalTime::from_offset_minutes(-60).unwrap());

    let parsed = parser.parse(body.as_bytes(), None, &SchemaFilter::default()).unwrap();

    assert_eq!(
        parsed.pages[0].get("Due").and_then(TypedProperty::as_timestamp),
        Timestamp::from_ymd_hms(2024, 3, 4, 23, 0, 0)
    );
}

#[test]
fn test_out_of_range_dates_are_empty() {
    let body = json!({
        "results": [{
            "id": "p1",
            "created_time": "-262143-01-01T00:00:00Z",
            "properties": {
                "Due": {"type": "date", "date": {"start": "-262143-01-01"}},
                "Made": {"type": "created_time", "created_time": "-262143-01-01T00:00:00Z"}
            }
        }]
    })
    .to_string();
    let parser = parser().with_local_time(LocalTime::from_offset_minutes(-1439).unwrap());

    let parsed = parser.parse(body.as_bytes(), None, &SchemaFilter::default()).unwrap();
    let page = &parsed.pages[0];

    assert_eq!(page.get("Due"), Some(&TypedProperty::Date(None)));
    assert_eq!(page.get("Made"), Some(&TypedProperty::CreatedTime(None)));
    assert_eq!(page.get("Created Time"), Some(&TypedProperty::CreatedTime(None)));
    assert_eq!(page.get("Due").map(TypedProperty::to_display_string).as_deref(), Some(""));
}

//! Row to page extraction

use crate::decode::RawRow;
use crate::page::Page;
use crate::property::{LocalTime, PropertyKind, TypedProperty};
use crate::schema::SchemaFilter;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::trace;

const EPOCH: &str = "1970-01-01T00:00:00Z";
const UNKNOWN_ID: &str = "unknown_id";

/// Builds pages from decoded rows under one filter
#[derive(Debug)]
pub struct RowExtractor<'a> {
    filter: &'a SchemaFilter,
    local_time: LocalTime,
    seen: BTreeSet<String>,
}

impl<'a> RowExtractor<'a> {
    pub fn new(filter: &'a SchemaFilter, local_time: LocalTime) -> Self {
        Self {
            filter,
            local_time,
            seen: BTreeSet::new(),
        }
    }

    /// Property names observed so far
    pub fn seen(&self) -> &BTreeSet<String> {
        &self.seen
    }

    /// Consume the extractor, returning the observed property names
    pub fn into_seen(self) -> BTreeSet<String> {
        self.seen
    }

    /// Reduce one row to a page
    pub fn extract(&mut self, row: &RawRow) -> Page {
        let mut page = Page::new();

        self.meta(&mut page, "ID", || {
            TypedProperty::Title(row.id.clone().unwrap_or_else(|| UNKNOWN_ID.to_string()))
        });
        let local_time = self.local_time;
        self.meta(&mut page, "Created Time", || {
            TypedProperty::CreatedTime(local_time.parse(row.created_time.as_deref().unwrap_or(EPOCH)))
        });
        self.meta(&mut page, "Last Edited Time", || {
            TypedProperty::LastEditedTime(
                local_time.parse(row.last_edited_time.as_deref().unwrap_or(EPOCH)),
            )
        });
        self.meta(&mut page, "Archived", || {
            TypedProperty::Checkbox(row.archived.unwrap_or(false))
        });
        self.meta(&mut page, "In Trash", || {
            TypedProperty::Checkbox(row.in_trash.unwrap_or(false))
        });

        let Some(properties) = &row.properties else {
            return page;
        };

        for (name, prop) in properties {
            let kind = prop
                .get("type")
                .and_then(Value::as_str)
                .map(PropertyKind::from_type_str)
                .unwrap_or(PropertyKind::Unknown);

            if kind == PropertyKind::Unknown {
                trace!(property = %name, "unrecognised property type");
                self.seen.insert(name.clone());
                continue;
            }
            if !self.filter.supports(kind) {
                continue;
            }

            self.seen.insert(name.clone());
            if !self.filter.accepts_name(name) {
                continue;
            }

            page.set(name, extract_property(kind, prop, &self.local_time));
        }

        page
    }

    fn meta(&mut self, page: &mut Page, name: &str, build: impl FnOnce() -> TypedProperty) {
        self.seen.insert(name.to_string());
        if self.filter.accepts_name(name) {
            page.set(name, build());
        }
    }
}

/// Materialise one property object of a known kind
///
/// `prop` is the `{type, <type>: payload}` object. Missing or mistyped
/// payloads fall back to the kind's empty value.
pub fn extract_property(kind: PropertyKind, prop: &Value, local_time: &LocalTime) -> TypedProperty {
    let payload = prop.get(kind.as_type_str()).unwrap_or(&Value::Null);

    match kind {
        PropertyKind::Title => TypedProperty::Title(plain_texts(payload).concat()),
        PropertyKind::RichText => TypedProperty::RichText(plain_texts(payload)),
        PropertyKind::Number => TypedProperty::Number(payload.as_f64().unwrap_or(0.0)),
        PropertyKind::Date => TypedProperty::Date(
            payload
                .get("start")
                .and_then(Value::as_str)
                .and_then(|s| local_time.parse(s)),
        ),
        PropertyKind::Checkbox => TypedProperty::Checkbox(payload.as_bool().unwrap_or(false)),
        PropertyKind::Select => TypedProperty::Select(name_field(payload)),
        PropertyKind::Status => TypedProperty::Status(name_field(payload)),
        PropertyKind::MultiSelect => TypedProperty::MultiSelect(
            payload
                .as_array()
                .map(|items| items.iter().map(name_field).collect())
                .unwrap_or_default(),
        ),
        PropertyKind::CreatedTime => {
            TypedProperty::CreatedTime(payload.as_str().and_then(|s| local_time.parse(s)))
        }
        PropertyKind::LastEditedTime => {
            TypedProperty::LastEditedTime(payload.as_str().and_then(|s| local_time.parse(s)))
        }
        PropertyKind::Email => TypedProperty::Email(string_field(payload)),
        PropertyKind::PhoneNumber => TypedProperty::PhoneNumber(string_field(payload)),
        PropertyKind::Url => TypedProperty::Url(string_field(payload)),
        PropertyKind::Unknown => TypedProperty::Unknown,
    }
}

/// Bytes a row contributes to the content hash: id followed by last-edited time
pub fn row_hash_input(row: &RawRow) -> String {
    let id = row.id.as_deref().unwrap_or_default();
    let edited = row.last_edited_time.as_deref().unwrap_or_default();
    format!("{id}{edited}")
}

fn plain_texts(payload: &Value) -> Vec<String> {
    payload
        .as_array()
        .map(|fragments| {
            fragments
                .iter()
                .map(|f| {
                    f.get("plain_text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn name_field(payload: &Value) -> String {
    payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_field(payload: &Value) -> String {
    payload.as_str().unwrap_or_default().to_string()
}

//! Property kinds and typed values

use super::time::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

// ============================================================================
// Property Kind
// ============================================================================

/// Upstream property type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Title,
    RichText,
    Number,
    Date,
    Checkbox,
    Select,
    MultiSelect,
    CreatedTime,
    Email,
    LastEditedTime,
    PhoneNumber,
    Status,
    Url,
    Unknown,
}

/// Kinds extracted when the caller has not chosen an allowlist
pub const DEFAULT_SUPPORTED_KINDS: [PropertyKind; 11] = [
    PropertyKind::CreatedTime,
    PropertyKind::Date,
    PropertyKind::Email,
    PropertyKind::MultiSelect,
    PropertyKind::Number,
    PropertyKind::PhoneNumber,
    PropertyKind::RichText,
    PropertyKind::Select,
    PropertyKind::Status,
    PropertyKind::Title,
    PropertyKind::Url,
];

impl PropertyKind {
    /// Every recognised kind, `Unknown` excluded
    pub const KNOWN: [PropertyKind; 13] = [
        PropertyKind::Title,
        PropertyKind::RichText,
        PropertyKind::Number,
        PropertyKind::Date,
        PropertyKind::Checkbox,
        PropertyKind::Select,
        PropertyKind::MultiSelect,
        PropertyKind::CreatedTime,
        PropertyKind::Email,
        PropertyKind::LastEditedTime,
        PropertyKind::PhoneNumber,
        PropertyKind::Status,
        PropertyKind::Url,
    ];

    /// Map an upstream `type` string; anything unrecognised is `Unknown`
    pub fn from_type_str(type_str: &str) -> Self {
        match type_str {
            "title" => PropertyKind::Title,
            "rich_text" => PropertyKind::RichText,
            "number" => PropertyKind::Number,
            "date" => PropertyKind::Date,
            "checkbox" => PropertyKind::Checkbox,
            "select" => PropertyKind::Select,
            "multi_select" => PropertyKind::MultiSelect,
            "created_time" => PropertyKind::CreatedTime,
            "email" => PropertyKind::Email,
            "last_edited_time" => PropertyKind::LastEditedTime,
            "phone_number" => PropertyKind::PhoneNumber,
            "status" => PropertyKind::Status,
            "url" => PropertyKind::Url,
            _ => PropertyKind::Unknown,
        }
    }

    /// Upstream `type` string, also the key holding the payload
    pub fn as_type_str(&self) -> &'static str {
        match self {
            PropertyKind::Title => "title",
            PropertyKind::RichText => "rich_text",
            PropertyKind::Number => "number",
            PropertyKind::Date => "date",
            PropertyKind::Checkbox => "checkbox",
            PropertyKind::Select => "select",
            PropertyKind::MultiSelect => "multi_select",
            PropertyKind::CreatedTime => "created_time",
            PropertyKind::Email => "email",
            PropertyKind::LastEditedTime => "last_edited_time",
            PropertyKind::PhoneNumber => "phone_number",
            PropertyKind::Status => "status",
            PropertyKind::Url => "url",
            PropertyKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PropertyKind::Title => "TITLE",
            PropertyKind::RichText => "RICH_TEXT",
            PropertyKind::Number => "NUMBER",
            PropertyKind::Date => "DATE",
            PropertyKind::Checkbox => "CHECKBOX",
            PropertyKind::Select => "SELECT",
            PropertyKind::MultiSelect => "MULTI_SELECT",
            PropertyKind::CreatedTime => "CREATED_TIME",
            PropertyKind::Email => "EMAIL",
            PropertyKind::LastEditedTime => "LAST_EDITED_TIME",
            PropertyKind::PhoneNumber => "PHONE_NUMBER",
            PropertyKind::Status => "STATUS",
            PropertyKind::Url => "URL",
            PropertyKind::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PropertyKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match PropertyKind::from_type_str(&normalized) {
            PropertyKind::Unknown if normalized != "unknown" => {
                Err(crate::error::Error::invalid_value(
                    "supported_types",
                    format!("unknown property type '{s}'"),
                ))
            }
            kind => Ok(kind),
        }
    }
}

// ============================================================================
// Typed Property
// ============================================================================

/// One parsed field, the payload fixed by the variant
#[derive(Debug, Clone, PartialEq)]
pub enum TypedProperty {
    /// Joined `plain_text` of every title fragment
    Title(String),
    /// `plain_text` of each rich-text fragment
    RichText(Vec<String>),
    Number(f64),
    /// `None` when the value is absent or unparseable
    Date(Option<Timestamp>),
    Checkbox(bool),
    Select(String),
    MultiSelect(Vec<String>),
    CreatedTime(Option<Timestamp>),
    Email(String),
    LastEditedTime(Option<Timestamp>),
    PhoneNumber(String),
    Status(String),
    Url(String),
    Unknown,
}

impl TypedProperty {
    /// Kind tag of this value
    pub fn kind(&self) -> PropertyKind {
        match self {
            TypedProperty::Title(_) => PropertyKind::Title,
            TypedProperty::RichText(_) => PropertyKind::RichText,
            TypedProperty::Number(_) => PropertyKind::Number,
            TypedProperty::Date(_) => PropertyKind::Date,
            TypedProperty::Checkbox(_) => PropertyKind::Checkbox,
            TypedProperty::Select(_) => PropertyKind::Select,
            TypedProperty::MultiSelect(_) => PropertyKind::MultiSelect,
            TypedProperty::CreatedTime(_) => PropertyKind::CreatedTime,
            TypedProperty::Email(_) => PropertyKind::Email,
            TypedProperty::LastEditedTime(_) => PropertyKind::LastEditedTime,
            TypedProperty::PhoneNumber(_) => PropertyKind::PhoneNumber,
            TypedProperty::Status(_) => PropertyKind::Status,
            TypedProperty::Url(_) => PropertyKind::Url,
            TypedProperty::Unknown => PropertyKind::Unknown,
        }
    }

    /// Text payload of single-string kinds
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedProperty::Title(s)
            | TypedProperty::Select(s)
            | TypedProperty::Email(s)
            | TypedProperty::PhoneNumber(s)
            | TypedProperty::Status(s)
            | TypedProperty::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedProperty::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedProperty::Checkbox(b) => Some(*b),
            _ => None,
        }
    }

    /// List payload of RichText and MultiSelect
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            TypedProperty::RichText(items) | TypedProperty::MultiSelect(items) => Some(items),
            _ => None,
        }
    }

    /// Timestamp payload of the date-like kinds
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            TypedProperty::Date(ts)
            | TypedProperty::CreatedTime(ts)
            | TypedProperty::LastEditedTime(ts) => *ts,
            _ => None,
        }
    }

    /// Render for a table cell
    pub fn to_display_string(&self) -> String {
        match self {
            TypedProperty::Title(s)
            | TypedProperty::Select(s)
            | TypedProperty::Email(s)
            | TypedProperty::PhoneNumber(s)
            | TypedProperty::Status(s)
            | TypedProperty::Url(s) => s.clone(),
            TypedProperty::Date(ts) => ts.map(|t| t.to_date_string()).unwrap_or_default(),
            TypedProperty::CreatedTime(ts) | TypedProperty::LastEditedTime(ts) => {
                ts.map(|t| t.to_iso8601()).unwrap_or_default()
            }
            TypedProperty::RichText(parts) => parts.concat(),
            TypedProperty::Number(n) => n.to_string(),
            TypedProperty::Checkbox(b) => if *b { "Y" } else { "N" }.to_string(),
            TypedProperty::MultiSelect(names) => names.join(", "),
            TypedProperty::Unknown => "UNKNOWN".to_string(),
        }
    }

    /// JSON rendering of the payload
    pub fn to_json(&self) -> Value {
        match self {
            TypedProperty::Title(s)
            | TypedProperty::Select(s)
            | TypedProperty::Email(s)
            | TypedProperty::PhoneNumber(s)
            | TypedProperty::Status(s)
            | TypedProperty::Url(s) => json!(s),
            TypedProperty::RichText(items) | TypedProperty::MultiSelect(items) => json!(items),
            TypedProperty::Number(n) => json!(n),
            TypedProperty::Checkbox(b) => json!(b),
            TypedProperty::Date(ts)
            | TypedProperty::CreatedTime(ts)
            | TypedProperty::LastEditedTime(ts) => match ts {
                Some(t) => json!(t.to_iso8601()),
                None => Value::Null,
            },
            TypedProperty::Unknown => Value::Null,
        }
    }
}

impl std::fmt::Display for TypedProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

//! Typed property module
//!
//! Supports: Title, RichText, Number, Date, Checkbox, Select, MultiSelect,
//! CreatedTime, Email, LastEditedTime, PhoneNumber, Status, Url
//!
//! # Overview
//!
//! Every field of a database row is reduced to a [`TypedProperty`], a sum type
//! with one variant per upstream kind. Date-like kinds carry a [`Timestamp`]
//! already shifted into local time.

mod time;
mod types;

pub use time::{LocalTime, Timestamp};
pub use types::{PropertyKind, TypedProperty, DEFAULT_SUPPORTED_KINDS};

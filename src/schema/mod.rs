//! Schema filter module
//!
//! Narrows parsing work to the property names and kinds the caller asked for.
//!
//! # Overview
//!
//! - **Name filter**: empty means every property name is accepted
//! - **Kind allowlist**: properties of other kinds are skipped before they are
//!   even recorded as seen

mod filter;

pub use filter::{SchemaFilter, META_PROPERTY_NAMES};

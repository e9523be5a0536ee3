//! Result cache module
//!
//! Holds the last accepted page list and decides whether a fresh fetch
//! changed anything.
//!
//! # Overview
//!
//! The cache provides:
//! - `CachedResultSet` - Pages, content hash, change flag and seen names
//! - `ChangeOutcome` - Result of reconciling one fetch against the cache

mod cache;

pub use cache::{CachedResultSet, ChangeOutcome};

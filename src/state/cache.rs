//! Cached result set with hash-based change detection

use crate::page::Page;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Outcome of reconciling a parsed page list against the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Hash differed; pages were replaced
    Changed,
    /// Hash matched; pages were kept
    Unchanged,
    /// Hash 0 is never compared; nothing was touched
    Ignored,
}

impl ChangeOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Last accepted page list and its change state
#[derive(Debug, Clone, Default)]
pub struct CachedResultSet {
    pages: Vec<Page>,
    content_hash: u32,
    changed: bool,
    seen_property_names: BTreeSet<String>,
}

impl CachedResultSet {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Hash of the cached pages (0 = nothing cached)
    pub fn content_hash(&self) -> u32 {
        self.content_hash
    }

    /// True only right after a fetch that replaced the pages
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Every property name observed since the last reset
    pub fn seen_property_names(&self) -> &BTreeSet<String> {
        &self.seen_property_names
    }

    /// Merge names observed by a parse
    pub fn record_seen(&mut self, names: impl IntoIterator<Item = String>) {
        self.seen_property_names.extend(names);
    }

    /// Compare a fresh parse with the cache
    ///
    /// Pages and hash are replaced only when the hash differs. The change
    /// flag is recomputed on every call except for hash 0.
    pub fn reconcile(&mut self, pages: Vec<Page>, hash: u32) -> ChangeOutcome {
        if hash == 0 {
            debug!("hash 0, skipping change detection");
            return ChangeOutcome::Ignored;
        }

        if hash == self.content_hash {
            self.changed = false;
            debug!(hash, "pages unchanged");
            return ChangeOutcome::Unchanged;
        }

        info!(old = self.content_hash, new = hash, pages = pages.len(), "pages changed");
        self.pages = pages;
        self.content_hash = hash;
        self.changed = true;
        ChangeOutcome::Changed
    }

    /// Drop pages, hash, change flag and seen names
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

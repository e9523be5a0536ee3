//! Pagination state

use serde::Serialize;
use tracing::debug;

/// Cursor state for one paginated query
///
/// An empty `current_cursor` means the first page; an empty `next_cursor`
/// means no further page is known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    current_cursor: String,
    next_cursor: String,
    has_more: bool,
    history: Vec<String>,
}

impl PaginationState {
    /// Create a state positioned on the first page
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor sent with the next request (empty = first page)
    pub fn current_cursor(&self) -> &str {
        &self.current_cursor
    }

    /// Cursor of the following page (empty = none)
    pub fn next_cursor(&self) -> &str {
        &self.next_cursor
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Previously used cursors, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Number of pages behind the current one
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    pub fn is_first_page(&self) -> bool {
        self.current_cursor.is_empty()
    }

    /// Forward navigation is possible
    pub fn can_advance(&self) -> bool {
        self.has_more
    }

    /// Backward navigation is possible
    pub fn can_retreat(&self) -> bool {
        !self.history.is_empty()
    }

    /// Clear every cursor and the history
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move to the following page
    ///
    /// Pushes the current cursor onto the history and makes the next cursor
    /// current. Returns false, leaving the state untouched, when there is no
    /// further page.
    pub fn advance(&mut self) -> bool {
        if !self.has_more {
            return false;
        }
        let next = self.next_cursor.clone();
        let previous = std::mem::replace(&mut self.current_cursor, next);
        self.history.push(previous);
        debug!(cursor = %self.current_cursor, depth = self.history.len(), "advanced");
        true
    }

    /// Move back to the previously visited page
    ///
    /// Returns false, leaving the state untouched, when the history is empty.
    pub fn retreat(&mut self) -> bool {
        match self.history.pop() {
            Some(cursor) => {
                self.current_cursor = cursor;
                debug!(cursor = %self.current_cursor, depth = self.history.len(), "retreated");
                true
            }
            None => false,
        }
    }

    /// Record the pagination metadata of a successfully parsed response
    ///
    /// The next cursor is only replaced when `has_more` is set and the
    /// decoded cursor differs from the known one; repeated identical
    /// responses leave it alone. Without `has_more` the next cursor is
    /// cleared. Returns true when the next cursor was replaced.
    pub fn apply_response(&mut self, has_more: bool, next_cursor: &str) -> bool {
        self.has_more = has_more;
        if !has_more {
            self.next_cursor.clear();
            return false;
        }
        if self.next_cursor == next_cursor {
            return false;
        }
        self.next_cursor = next_cursor.to_string();
        debug!(next = %self.next_cursor, "next cursor updated");
        true
    }
}

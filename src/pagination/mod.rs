//! Pagination module
//!
//! Cursor-based forward/backward navigation over a paginated query.
//!
//! # Overview
//!
//! [`PaginationState`] keeps the cursor of the page on screen, the cursor of
//! the page after it and a LIFO history of cursors already visited. Forward
//! navigation pushes onto the history, backward navigation pops from it.

mod types;

pub use types::PaginationState;

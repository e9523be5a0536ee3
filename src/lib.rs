// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # notion-pager
//!
//! Paged, change-aware querying of a Notion database.
//!
//! ## Features
//!
//! - **Typed rows**: Every supported property becomes a [`property::TypedProperty`]
//! - **Schema filtering**: Restrict extraction by property name and type
//! - **Cursor navigation**: First, next and previous page with a cursor history
//! - **Change detection**: Row-set hash over ids and edit times, listeners on change
//! - **Bounded parsing**: Parse buffers sized from free memory and content length
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use notion_pager::{DatabaseConfig, FetchOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> notion_pager::Result<()> {
//!     let config = DatabaseConfig::new("secret_token", "database_id");
//!     let mut pager = FetchOrchestrator::from_config(config)?;
//!
//!     pager.on_page_change(|pages, names| {
//!         println!("{} rows, {} properties", pages.len(), names.len());
//!     });
//!
//!     pager.first_page().await;
//!     while pager.pagination().can_advance() {
//!         pager.next_page().await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        FetchOrchestrator                         │
//! │   update()  first_page()  next_page()  previous_page()  run()    │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌────────────┬──────────────┬───┴──────────┬───────────┬───────────┐
//! │    HTTP    │    Parser    │  Pagination  │   State   │  Schema   │
//! ├────────────┼──────────────┼──────────────┼───────────┼───────────┤
//! │ Transport  │ Buffer plan  │ Cursors      │ Pages     │ Names     │
//! │ Retry      │ Decoder      │ History      │ Hash      │ Kinds     │
//! │ Rate Limit │ Extraction   │              │ Seen      │           │
//! └────────────┴──────────────┴──────────────┴───────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Parse buffer reservations
pub mod memory;

/// Liveness signalling
pub mod liveness;

/// Typed property values and timestamps
pub mod property;

/// Parsed rows
pub mod page;

/// Property name and type filtering
pub mod schema;

/// Response envelope decoding
pub mod decode;

/// Response parsing into pages
pub mod parser;

/// Cursor navigation state
pub mod pagination;

/// Cached result set and change detection
pub mod state;

/// HTTP client and query transport
pub mod http;

/// Database configuration
pub mod config;

/// Fetch orchestration
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorCategory, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_config, load_config_from_str, DatabaseConfig};
pub use engine::{CycleStatus, FetchOrchestrator};
pub use page::Page;
pub use property::{PropertyKind, TypedProperty};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

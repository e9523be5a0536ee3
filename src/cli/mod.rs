//! CLI module
//!
//! Command-line interface for querying a Notion database.
//!
//! # Commands
//!
//! - `validate` - Check the configuration without contacting the API
//! - `query` - Fetch the first page, optionally walking N pages forward
//! - `properties` - List the property names seen on the first page
//! - `watch` - Re-run the query periodically and print every change
//! - `browse` - Navigate pages with commands read from stdin

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::{pages_message, render_table, BrowseCommand, Runner};

//! CLI commands and argument parsing

use crate::property::PropertyKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Notion database pager CLI
#[derive(Parser, Debug)]
#[command(name = "notion-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Integration token
    #[arg(long, global = true, env = "NOTION_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Database to query
    #[arg(long, global = true, env = "NOTION_DATABASE_ID")]
    pub database_id: Option<String>,

    /// Query body template (JSON object)
    #[arg(short, long, global = true)]
    pub query: Option<String>,

    /// Only extract these property names (repeatable or comma-separated)
    #[arg(long = "property", global = true, value_delimiter = ',')]
    pub properties: Vec<String>,

    /// Property types eligible for extraction (comma-separated)
    #[arg(long = "types", global = true, value_delimiter = ',', value_parser = parse_kind)]
    pub types: Vec<PropertyKind>,

    /// Fixed UTC offset in minutes for timestamps
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub utc_offset: Option<i32>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the configuration without contacting the API
    Validate,

    /// Fetch the first page, optionally walking further pages
    Query {
        /// Number of pages to fetch
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },

    /// List the property names seen on the first page
    Properties,

    /// Re-run the query periodically and print the page on every change
    Watch {
        /// Seconds between updates (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Navigate pages interactively with commands read from stdin
    ///
    /// n = next, p = previous, f = first, r = refresh, q = quit
    Browse,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

fn parse_kind(s: &str) -> Result<PropertyKind, String> {
    s.parse::<PropertyKind>().map_err(|e| e.to_string())
}

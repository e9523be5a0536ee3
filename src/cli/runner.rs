//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, DatabaseConfig};
use crate::engine::{CycleStatus, FetchOrchestrator};
use crate::error::{Error, Result, ResultExt};
use crate::page::Page;
use crate::pagination::PaginationState;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Validate => self.validate(),
            Commands::Query { pages } => self.query(*pages).await,
            Commands::Properties => self.properties().await,
            Commands::Watch { interval } => self.watch(*interval).await,
            Commands::Browse => self.browse().await,
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Load the config file, if any, and apply command-line overrides
    fn load_config(&self) -> Result<DatabaseConfig> {
        let mut config = match &self.cli.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => DatabaseConfig::default(),
        };

        if let Some(token) = &self.cli.token {
            config.api_token.clone_from(token);
        }
        if let Some(id) = &self.cli.database_id {
            config.database_id.clone_from(id);
        }
        if let Some(query) = &self.cli.query {
            config.query = Some(query.clone());
        }
        if !self.cli.properties.is_empty() {
            config.property_filters.clone_from(&self.cli.properties);
        }
        if !self.cli.types.is_empty() {
            config.supported_types.clone_from(&self.cli.types);
        }
        if self.cli.utc_offset.is_some() {
            config.utc_offset_minutes = self.cli.utc_offset;
        }

        Ok(config)
    }

    /// Build an orchestrator for a command that talks to the API
    fn orchestrator(&self) -> Result<FetchOrchestrator> {
        let config = self.load_config()?;
        config.validate()?;
        let orchestrator = FetchOrchestrator::from_config(config)?;
        if self.cli.verbose {
            orchestrator.dump_config();
        }
        Ok(orchestrator)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;
        let orchestrator = FetchOrchestrator::from_config(config)?;
        orchestrator.dump_config();

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Configuration for database '{}' is valid",
                    orchestrator.config().database_id
                )
            }
        }));

        Ok(())
    }

    /// Fetch the first page and walk forward up to `pages` pages
    async fn query(&self, pages: usize) -> Result<()> {
        let mut orchestrator = self.orchestrator()?;

        let status = orchestrator.first_page().await;
        ensure_success(&orchestrator, &status)?;
        self.output_pages(&orchestrator, &status);

        for _ in 1..pages {
            if !orchestrator.pagination().can_advance() {
                debug!("no further pages");
                break;
            }
            let status = orchestrator.next_page().await;
            ensure_success(&orchestrator, &status)?;
            self.output_pages(&orchestrator, &status);
        }

        self.output_summary(&orchestrator);
        Ok(())
    }

    /// List the property names seen on the first page
    async fn properties(&self) -> Result<()> {
        let mut orchestrator = self.orchestrator()?;
        let status = orchestrator.first_page().await;
        ensure_success(&orchestrator, &status)?;

        let names: Vec<&str> = orchestrator
            .available_properties()
            .iter()
            .map(String::as_str)
            .collect();

        match self.cli.format {
            OutputFormat::Json => self.output_message(&json!({
                "type": "PROPERTIES",
                "properties": names,
            })),
            OutputFormat::Pretty => {
                for name in names {
                    println!("{name}");
                }
            }
        }
        Ok(())
    }

    /// Re-run the current query until Ctrl-C, printing every change
    async fn watch(&self, interval: Option<u64>) -> Result<()> {
        let mut orchestrator = self.orchestrator()?;
        let interval = interval.map_or_else(
            || orchestrator.config().update_interval(),
            Duration::from_secs,
        );
        if interval.is_zero() {
            return Err(Error::invalid_value("interval", "must be greater than zero"));
        }

        let format = self.cli.format;
        orchestrator.on_page_change(move |pages, names| {
            print_pages(format, pages, names, None, &CycleStatus::Changed);
        });

        info!(interval_secs = interval.as_secs(), "Watching database, press Ctrl-C to stop");
        orchestrator
            .run(interval, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "cannot listen for Ctrl-C");
                }
            })
            .await;

        self.output_summary(&orchestrator);
        Ok(())
    }

    /// Interactive navigation driven by commands on stdin
    async fn browse(&self) -> Result<()> {
        let mut orchestrator = self.orchestrator()?;

        let status = orchestrator.first_page().await;
        self.report(&orchestrator, &status);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let command = match line.parse::<BrowseCommand>() {
                Ok(command) => command,
                Err(e) => {
                    if !line.trim().is_empty() {
                        eprintln!("{e}");
                    }
                    continue;
                }
            };

            let status = match command {
                BrowseCommand::Next => orchestrator.next_page().await,
                BrowseCommand::Previous => orchestrator.previous_page().await,
                BrowseCommand::First => orchestrator.first_page().await,
                BrowseCommand::Refresh => orchestrator.update().await,
                BrowseCommand::Quit => break,
            };
            self.report(&orchestrator, &status);
        }

        self.output_summary(&orchestrator);
        Ok(())
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Print the outcome of a browse command without aborting on failure
    fn report(&self, orchestrator: &FetchOrchestrator, status: &CycleStatus) {
        match status {
            CycleStatus::Failed { .. } => self.output_message(&json!({
                "type": "LOG",
                "log": {
                    "level": "WARN",
                    "message": orchestrator.status_warning().unwrap_or_default()
                }
            })),
            CycleStatus::NoOp => self.output_message(&json!({
                "type": "LOG",
                "log": {
                    "level": "INFO",
                    "message": "No page in that direction"
                }
            })),
            _ => self.output_pages(orchestrator, status),
        }
    }

    fn output_pages(&self, orchestrator: &FetchOrchestrator, status: &CycleStatus) {
        print_pages(
            self.cli.format,
            orchestrator.pages(),
            orchestrator.available_properties(),
            Some(orchestrator.pagination()),
            status,
        );
    }

    fn output_summary(&self, orchestrator: &FetchOrchestrator) {
        let stats = orchestrator.stats();
        self.output_message(&json!({
            "type": "SUMMARY",
            "summary": {
                "cycles": stats.cycles,
                "fetches": stats.fetches,
                "changes": stats.changes,
                "failures": stats.failures,
                "undersized_parses": stats.undersized_parses,
                "bytes_read": stats.bytes_read,
                "last_duration_ms": stats.last_duration_ms,
            }
        }));
    }

    /// Output a message in the configured format
    fn output_message(&self, msg: &Value) {
        output_message(self.cli.format, msg);
    }
}

// ============================================================================
// Browse Commands
// ============================================================================

/// One line of input in browse mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseCommand {
    Next,
    Previous,
    First,
    Refresh,
    Quit,
}

impl FromStr for BrowseCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "next" => Ok(Self::Next),
            "p" | "prev" | "previous" => Ok(Self::Previous),
            "f" | "first" => Ok(Self::First),
            "r" | "refresh" => Ok(Self::Refresh),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(Error::Other(format!(
                "unknown command '{other}' (n = next, p = previous, f = first, r = refresh, q = quit)"
            ))),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn ensure_success(orchestrator: &FetchOrchestrator, status: &CycleStatus) -> Result<()> {
    if status.is_failed() {
        let message = orchestrator
            .status_warning()
            .map_or_else(|| status.to_string(), str::to_string);
        return Err(Error::Other(message));
    }
    Ok(())
}

fn output_message(format: OutputFormat, msg: &Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(msg).unwrap_or_default());
        }
        OutputFormat::Pretty => {
            println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
        }
    }
}

fn print_pages(
    format: OutputFormat,
    pages: &[Page],
    names: &BTreeSet<String>,
    pagination: Option<&PaginationState>,
    status: &CycleStatus,
) {
    match format {
        OutputFormat::Json => {
            output_message(format, &pages_message(pages, names, pagination, status));
        }
        OutputFormat::Pretty => {
            if let Some(state) = pagination {
                println!(
                    "page {} ({}){}",
                    state.depth() + 1,
                    status,
                    if state.has_more() { ", more available" } else { "" }
                );
            }
            print!("{}", render_table(pages, names));
        }
    }
}

/// JSON message carrying one page of results
pub fn pages_message(
    pages: &[Page],
    names: &BTreeSet<String>,
    pagination: Option<&PaginationState>,
    status: &CycleStatus,
) -> Value {
    let records: Vec<Value> = pages
        .iter()
        .map(|page| page.to_json(names.iter().map(String::as_str)))
        .collect();

    let mut msg = json!({
        "type": "PAGE",
        "status": status.to_string(),
        "count": pages.len(),
        "records": records,
    });
    if let Some(state) = pagination {
        msg["pagination"] = json!({
            "depth": state.depth(),
            "has_more": state.has_more(),
            "next_cursor": state.next_cursor(),
        });
    }
    msg
}

/// Render pages as a text table, one column per property present on any page
pub fn render_table(pages: &[Page], names: &BTreeSet<String>) -> String {
    let columns: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| pages.iter().any(|page| page.contains(name)))
        .collect();
    if columns.is_empty() {
        return "(no rows)\n".to_string();
    }

    let rows: Vec<Vec<String>> = pages
        .iter()
        .map(|page| {
            columns
                .iter()
                .map(|name| {
                    page.get(name)
                        .map(|prop| prop.to_display_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = format_row(columns.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &rows {
        out.push_str(&format_row(row.iter().map(String::as_str), &widths));
    }
    out
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    format!("{}\n", line.join(" | ").trim_end())
}

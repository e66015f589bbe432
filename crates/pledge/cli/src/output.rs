//! Output formatting utilities

use colored::*;
use pledge_genesis::GenesisError;
use pledge_sync::SyncError;
use pledge_types::{ErrorKind, Operation, ValidationError};
use pledge_workspace::WorkspaceError;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and messages
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    pub fn is_table(self) -> bool {
        self == OutputFormat::Table
    }
}

/// Print rows as a table, or the serializable rows in a structured format.
pub fn print_output<T: Serialize + Tabled>(data: Vec<T>, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No results".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&data)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&data)?),
    }
    Ok(())
}

/// Print a single item in the specified format
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?)
        }
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
    }
    Ok(())
}

/// Report an appended operation: a one-line confirmation for humans, the
/// operation itself otherwise.
pub fn print_recorded(op: &Operation, format: OutputFormat) -> anyhow::Result<()> {
    if format.is_table() {
        print_success(&format!("{} {}", op.op_type(), op.id));
        Ok(())
    } else {
        print_single(op, format)
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Stable error code and kind behind a command failure.
pub fn error_code(err: &anyhow::Error) -> (&'static str, Option<ErrorKind>) {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<WorkspaceError>() {
            return (e.code(), Some(e.kind()));
        }
        if let Some(e) = cause.downcast_ref::<SyncError>() {
            return (e.code(), Some(e.kind()));
        }
        if let Some(e) = cause.downcast_ref::<ValidationError>() {
            return (e.code(), Some(e.kind()));
        }
        if let Some(e) = cause.downcast_ref::<GenesisError>() {
            return (e.code(), Some(e.kind()));
        }
    }
    ("E_CLI", None)
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    message: String,
}

/// Print a failed command to stderr.
pub fn print_failure(err: &anyhow::Error, format: OutputFormat) {
    let (code, kind) = error_code(err);
    let report = ErrorReport {
        error: code,
        kind: kind.map(ErrorKind::as_str),
        message: format!("{err:#}"),
    };
    let rendered = match format {
        OutputFormat::Table => None,
        OutputFormat::Json => serde_json::to_string_pretty(&report).ok(),
        OutputFormat::Yaml => serde_yaml::to_string(&report).ok(),
    };
    match rendered {
        Some(text) => eprintln!("{}", text.trim_end()),
        None => eprintln!("{} {} [{}]", "✗".red(), report.message, code),
    }
}

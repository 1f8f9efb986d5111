//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Log line format on stderr
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// JSON lines
    Json,
    /// Human-readable (default)
    #[default]
    Pretty,
}

/// Print rows as a table, or the raw records as JSON
pub fn print_records<R, T>(records: &[R], format: OutputFormat, to_row: impl Fn(&R) -> T)
where
    R: Serialize,
    T: Tabled,
{
    match format {
        OutputFormat::Table => {
            if records.is_empty() {
                print_warning("No items found");
                return;
            }
            let rows: Vec<T> = records.iter().map(to_row).collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(records) {
                println!("{}", json);
            }
        }
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a weight: green when close to 1, red when heavily reduced
pub fn color_weight(weight: f64) -> String {
    let formatted = format!("{:.3}", weight);
    if weight >= 0.9 {
        formatted.green().to_string()
    } else if weight >= 0.7 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Mark a value that was changed by policy limits
pub fn mark_capped(value: String, capped: bool) -> String {
    if capped {
        format!("{} {}", value, "(capped)".yellow())
    } else {
        value
    }
}

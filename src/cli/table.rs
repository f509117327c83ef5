//! Table formatting utilities for CLI list commands
//!
//! Every `list` subcommand builds [`TableRow`]s and hands them to a
//! [`TableFormatter`], which renders TSV (aligned, coloured when on a
//! terminal), CSV, Markdown or bare identifiers.

use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;

use crate::cli::helpers::{escape_csv, truncate_str};
use crate::cli::OutputFormat;
use crate::core::entity::Priority;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record identifier (cyan)
    Id(String),
    /// Plain text, truncated to the column width
    Text(String),
    /// Record status with colour coding
    Status(String),
    /// Priority with colour coding
    Priority(Priority),
    /// Calendar date
    Date(NaiveDate),
    /// Timestamp displayed as a local date
    Created(DateTime<Utc>),
    /// Monetary amount (two decimals, "-" if absent)
    Money(Option<f64>),
    /// Whole number
    Number(i64),
    Empty,
}

impl CellValue {
    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => format!("{:<width$}", style(id).cyan(), width = width),
            CellValue::Text(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::Status(s) => {
                let styled = match s.as_str() {
                    "open" | "draft" | "new" => style(s).cyan(),
                    "in_progress" | "submitted" | "fair" => style(s).yellow(),
                    "resolved" | "approved" | "active" | "good" => style(s).green(),
                    "rejected" | "revoked" | "poor" => style(s).red(),
                    "closed" | "expired" | "disposed" => style(s).dim(),
                    _ => style(s).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Priority(priority) => {
                let s = priority.to_string();
                let styled = match priority {
                    Priority::Low => style(&s).dim(),
                    Priority::Medium => style(&s).white(),
                    Priority::High => style(&s).yellow(),
                    Priority::Critical => style(&s).red().bold(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Money(_) | CellValue::Number(_) => {
                format!("{:>width$}", self.raw_or_dash(), width = width)
            }
            _ => format!("{:<width$}", self.raw_or_dash(), width = width),
        }
    }

    /// Format for CSV output (RFC 4180, no colors)
    pub fn format_csv(&self) -> String {
        escape_csv(&self.raw())
    }

    /// Format for Markdown output (no colors, escaped pipes)
    pub fn format_md(&self) -> String {
        self.raw_or_dash().replace('|', "\\|")
    }

    /// Get raw string value (no formatting)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::Text(s) | CellValue::Status(s) => s.clone(),
            CellValue::Priority(p) => p.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Created(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d").to_string()
            }
            CellValue::Money(amount) => amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    fn raw_or_dash(&self) -> String {
        let raw = self.raw();
        if raw.is_empty() {
            "-".to_string()
        } else {
            raw
        }
    }

    /// Get the display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        self.raw_or_dash().chars().count()
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            show_summary: true,
        }
    }

    /// Skip the "N record(s) found" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    /// Output rows in the specified format
    pub fn output(&self, rows: &[TableRow], format: OutputFormat) {
        match format {
            OutputFormat::Csv => self.output_csv(rows),
            OutputFormat::Md => self.output_md(rows),
            OutputFormat::Id => self.output_ids(rows),
            _ => self.output_tsv(rows),
        }
    }

    /// Calculate dynamic column widths based on actual content
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(|v| v.display_width())
                    .max()
                    .unwrap_or(0);
                col.header
                    .len()
                    .max(max_content.saturating_add(2))
                    .min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = *w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<width$}", "-", width = *w),
                })
                .collect();
            println!("{}", parts.join(" "));
        }

        if self.show_summary {
            println!();
            println!("{} {}(s) found.", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_csv(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.key).collect();
        println!("{}", headers.join(","));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| row.get(col.key).map(|v| v.format_csv()).unwrap_or_default())
                .collect();
            println!("{}", values.join(","));
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let headers: Vec<&str> = self.columns.iter().map(|c| c.header).collect();
        println!("| {} |", headers.join(" | "));
        let separators: Vec<&str> = headers.iter().map(|_| "---").collect();
        println!("|{}|", separators.join("|"));

        for row in rows {
            let values: Vec<String> = self
                .columns
                .iter()
                .map(|col| {
                    row.get(col.key)
                        .map(|v| v.format_md())
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect();
            println!("| {} |", values.join(" | "));
        }
    }

    fn output_ids(&self, rows: &[TableRow]) {
        for row in rows {
            println!("{}", row.id);
        }
    }
}

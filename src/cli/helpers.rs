//! Shared helper functions for CLI commands
//!
//! Project/config/allocator setup and output plumbing used by every
//! command module.

use chrono::NaiveDate;
use clap::ValueEnum;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::allocator::Allocator;
use crate::core::identity::Period;
use crate::core::sequence::SqliteSequenceStore;
use crate::core::{Config, Project};
use crate::print::DocumentPrinter;

/// Locate the project (honouring `--project`)
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    Project::locate(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))
}

/// Project plus its effective configuration
pub fn open_project_with_config(global: &GlobalOpts) -> Result<(Project, Config)> {
    let project = open_project(global)?;
    let config = Config::load_for(Some(&project));
    Ok((project, config))
}

/// Allocator backed by the project's sequence database
pub fn open_allocator(project: &Project, config: &Config) -> Result<Allocator<SqliteSequenceStore>> {
    let office = config.office_code().map_err(|e| miette::miette!("{}", e))?;
    let categories = config
        .category_registry()
        .map_err(|e| miette::miette!("{}", e))?;
    let store = SqliteSequenceStore::open(&project.sequence_db_path())
        .map_err(|e| miette::miette!("{}", e))?;
    Ok(Allocator::new(office, categories, store))
}

/// Template renderer headed with the configured council name
pub fn document_printer(config: &Config) -> Result<DocumentPrinter> {
    let council = config.council().map_err(|e| miette::miette!("{}", e))?;
    DocumentPrinter::new(council).map_err(|e| miette::miette!("{}", e))
}

/// Output format after applying `auto` and the configured default
pub fn output_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    config
        .default_format
        .as_deref()
        .and_then(|f| OutputFormat::from_str(f, true).ok())
        .unwrap_or(OutputFormat::Auto)
        .or(fallback)
}

/// Print a serializable value as YAML or JSON
pub fn print_serialized<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
        }
        _ => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
        }
    }
    Ok(())
}

/// Write rendered text to a file, or stdout when no path is given
pub fn write_output(content: &str, output_path: Option<&std::path::Path>) -> Result<()> {
    match output_path {
        Some(path) => {
            std::fs::write(path, content).into_diagnostic()?;
            eprintln!(
                "{} Written to {}",
                console::style("✓").green(),
                console::style(path.display()).cyan()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date argument.
///
/// Only years `0000..=9999` are accepted, since the year is written into
/// document numbers as exactly four digits.
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {} (expected YYYY-MM-DD)", s, e))?;
    Period::from_date(date).map_err(|e| e.to_string())?;
    Ok(date)
}

/// Truncate a string to max_len, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(format: OutputFormat) -> GlobalOpts {
        GlobalOpts {
            format,
            quiet: false,
            verbose: 0,
            project: None,
        }
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("čćžšđčćž", 6), "čćž...");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("with\nnewline"), "\"with\nnewline\"");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-02-14"), Ok(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()));
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_date("14/02/2026").is_err());
        assert!(parse_date("+10000-01-01").is_err());
        assert!(parse_date("-0005-01-01").is_err());
        assert!(parse_date("10000-01-01").is_err());
    }

    #[test]
    fn test_output_format_resolution() {
        let config = Config::default();
        assert_eq!(output_format(&global(OutputFormat::Auto), &config, OutputFormat::Tsv), OutputFormat::Tsv);
        assert_eq!(output_format(&global(OutputFormat::Json), &config, OutputFormat::Tsv), OutputFormat::Json);

        let config = Config {
            default_format: Some("csv".into()),
            ..Default::default()
        };
        assert_eq!(output_format(&global(OutputFormat::Auto), &config, OutputFormat::Tsv), OutputFormat::Csv);
    }
}

//! `creg category` command - Asset category registry

use clap::Subcommand;
use console::style;
use miette::Result;
use serde::Serialize;

use crate::cli::helpers::{output_format, print_serialized};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{Config, Project};

#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// List registered categories and their class codes
    List,

    /// Show the class code a category name resolves to
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Category name (matched case-insensitively)
    pub name: String,
}

#[derive(Serialize)]
struct CategoryRow<'a> {
    code: &'a str,
    name: &'a str,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 6),
    ColumnDef::new("name", "CATEGORY", 30),
];

/// Run a category subcommand
pub fn run(cmd: CategoryCommands, global: &GlobalOpts) -> Result<()> {
    // Works outside a project too, using global config and the defaults
    let project = Project::locate(global.project.as_deref()).ok();
    let config = Config::load_for(project.as_ref());
    let registry = config
        .category_registry()
        .map_err(|e| miette::miette!("{}", e))?;

    match cmd {
        CategoryCommands::List => {
            let format = output_format(global, &config, OutputFormat::Tsv);
            if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
                let rows: Vec<CategoryRow> = registry
                    .iter()
                    .map(|c| CategoryRow {
                        code: c.code.as_str(),
                        name: &c.name,
                    })
                    .collect();
                return print_serialized(&rows, format);
            }
            let rows: Vec<TableRow> = registry
                .iter()
                .map(|c| {
                    TableRow::new(c.code.to_string())
                        .cell("code", CellValue::Id(c.code.to_string()))
                        .cell("name", CellValue::Text(c.name.clone()))
                })
                .collect();
            TableFormatter::new(COLUMNS, "category")
                .without_summary()
                .output(&rows, format);
            Ok(())
        }
        CategoryCommands::Resolve(args) => {
            let resolved = registry.resolve(Some(args.name.as_str()));
            if global.quiet || global.format == OutputFormat::Id {
                println!("{}", resolved.code);
                return Ok(());
            }
            match resolved.name {
                Some(name) => println!("{} {}", style(&resolved.code).cyan().bold(), name),
                None => println!(
                    "{} {}",
                    style(&resolved.code).yellow().bold(),
                    style(format!("('{}' is not registered, fallback class)", args.name)).dim()
                ),
            }
            Ok(())
        }
    }
}

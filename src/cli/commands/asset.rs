//! `creg asset` command - Fixed-asset register

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use csv::ReaderBuilder;
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{create_numbered, edit_numbered, print_created};
use crate::cli::helpers::{
    document_printer, open_allocator, open_project_with_config, output_format, print_serialized,
    parse_date, write_output,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::allocator::{Allocation, AllocationRequest};
use crate::core::identity::DocumentKind;
use crate::core::RecordStore;
use crate::entities::asset::{Asset, AssetCondition};

#[derive(Subcommand, Debug)]
pub enum AssetCommands {
    /// List assets with filtering
    List(ListArgs),

    /// Register a new asset
    New(NewArgs),

    /// Show an asset's details
    Show(ShowArgs),

    /// Edit an asset (descriptive fields only)
    Edit(EditArgs),

    /// Register assets from a CSV file
    Import(ImportArgs),

    /// Print an asset tag
    Tag(TagArgs),

    /// Markdown audit report of the register
    Report(ReportArgs),
}

/// Condition filter
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConditionFilter {
    New,
    Good,
    Fair,
    Poor,
    Disposed,
    /// Everything except disposed assets
    InService,
    All,
}

impl ConditionFilter {
    fn matches(self, condition: AssetCondition) -> bool {
        match self {
            ConditionFilter::New => condition == AssetCondition::New,
            ConditionFilter::Good => condition == AssetCondition::Good,
            ConditionFilter::Fair => condition == AssetCondition::Fair,
            ConditionFilter::Poor => condition == AssetCondition::Poor,
            ConditionFilter::Disposed => condition == AssetCondition::Disposed,
            ConditionFilter::InService => condition != AssetCondition::Disposed,
            ConditionFilter::All => true,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by category name or class code
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Filter by register year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Filter by condition
    #[arg(long, default_value = "all")]
    pub condition: ConditionFilter,

    /// Search in title, location and notes
    #[arg(long)]
    pub search: Option<String>,

    /// Reverse sort order
    #[arg(long, short = 'r')]
    pub reverse: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Asset description
    #[arg(long, short = 't')]
    pub title: String,

    /// Category name (unregistered names get class code 99)
    #[arg(long, short = 'c')]
    pub category: String,

    /// Entry date, YYYY-MM-DD (default: today)
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    #[arg(long, short = 'l')]
    pub location: Option<String>,

    #[arg(long)]
    pub condition: Option<AssetCondition>,

    /// Acquisition value
    #[arg(long)]
    pub value: Option<f64>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Show the number that would be assigned without reserving it
    #[arg(long, alias = "dry-run")]
    pub preview: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Register number (or unique prefix)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Register number (or unique prefix)
    pub id: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'l')]
    pub location: Option<String>,

    #[arg(long)]
    pub condition: Option<AssetCondition>,

    #[arg(long)]
    pub value: Option<f64>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl EditArgs {
    fn has_field_updates(&self) -> bool {
        self.title.is_some()
            || self.location.is_some()
            || self.condition.is_some()
            || self.value.is_some()
            || self.notes.is_some()
    }
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// CSV file with columns title,category,entry_date,location,value,notes
    pub file: PathBuf,

    /// Show the numbers that would be assigned without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Continue importing after errors (default: stop on first error)
    #[arg(long)]
    pub skip_errors: bool,
}

#[derive(clap::Args, Debug)]
pub struct TagArgs {
    /// Register number (or unique prefix)
    pub id: String,

    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ReportArgs {
    /// Only include assets registered in this year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 18),
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("category", "CATEGORY", 18),
    ColumnDef::new("entered", "ENTERED", 12),
    ColumnDef::new("condition", "CONDITION", 10),
    ColumnDef::new("location", "LOCATION", 20),
    ColumnDef::new("value", "VALUE", 12),
];

/// Run an asset subcommand
pub fn run(cmd: AssetCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        AssetCommands::List(args) => run_list(args, global),
        AssetCommands::New(args) => run_new(args, global),
        AssetCommands::Show(args) => run_show(args, global),
        AssetCommands::Edit(args) => run_edit(args, global),
        AssetCommands::Import(args) => run_import(args, global),
        AssetCommands::Tag(args) => run_tag(args, global),
        AssetCommands::Report(args) => run_report(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let mut assets: Vec<Asset> = store.list().map_err(|e| miette::miette!("{}", e))?;

    assets.retain(|a| {
        let category_ok = args.category.as_ref().map_or(true, |c| {
            a.category.eq_ignore_ascii_case(c.trim()) || a.class_code.as_str() == c.trim()
        });
        let year_ok = args.year.map_or(true, |y| a.id.period().year() == y);
        let search_ok = args.search.as_ref().map_or(true, |search| {
            let needle = search.to_lowercase();
            a.title.to_lowercase().contains(&needle)
                || a.location.as_ref().is_some_and(|l| l.to_lowercase().contains(&needle))
                || a.notes.as_ref().is_some_and(|n| n.to_lowercase().contains(&needle))
        });
        category_ok && year_ok && search_ok && args.condition.matches(a.condition)
    });

    assets.sort_by(|a, b| a.id.cmp(&b.id));
    if args.reverse {
        assets.reverse();
    }
    if let Some(limit) = args.limit {
        assets.truncate(limit);
    }

    if args.count {
        println!("{}", assets.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(&assets, format),
        _ => {
            if assets.is_empty() && format == OutputFormat::Tsv {
                println!("No assets found.");
                return Ok(());
            }
            let rows: Vec<TableRow> = assets
                .iter()
                .map(|a| {
                    TableRow::new(a.id.to_string())
                        .cell("id", CellValue::Id(a.id.to_string()))
                        .cell("title", CellValue::Text(a.title.clone()))
                        .cell("category", CellValue::Text(a.category.clone()))
                        .cell("entered", CellValue::Date(a.entry_date))
                        .cell("condition", CellValue::Status(a.condition.to_string()))
                        .cell(
                            "location",
                            a.location.clone().map_or(CellValue::Empty, CellValue::Text),
                        )
                        .cell("value", CellValue::Money(a.value))
                })
                .collect();
            TableFormatter::new(COLUMNS, "asset").output(&rows, format);
            Ok(())
        }
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let allocator = open_allocator(&project, &config)?;

    let entry_date = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let request =
        AllocationRequest::new(DocumentKind::Asset, entry_date).with_category(args.category.clone());
    let author = config.author();

    let created = create_numbered(&project, &allocator, &request, args.preview, |allocation| {
        let category = registered_category(&allocation, args.category);
        let mut asset = Asset::new(allocation.id, args.title, category, entry_date, author);
        asset.location = args.location;
        asset.condition = args.condition.unwrap_or_default();
        asset.value = args.value;
        asset.notes = args.notes;
        asset
    })?;

    if let Some((path, asset)) = created {
        print_created(&asset, &path, global);
    }
    Ok(())
}

/// Category name stored on an asset: the registered spelling when the
/// name resolved, otherwise the trimmed input
fn registered_category(allocation: &Allocation, raw: String) -> String {
    allocation
        .group
        .category
        .clone()
        .unwrap_or_else(|| raw.trim().to_string())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, asset) = store
        .find::<Asset>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Yaml | OutputFormat::Json => print_serialized(&asset, global.format),
        OutputFormat::Id => {
            println!("{}", asset.id);
            Ok(())
        }
        _ => {
            let registry = config
                .category_registry()
                .map_err(|e| miette::miette!("{}", e))?;
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("ID").bold(), style(&asset.id).cyan());
            println!("{}: {}", style("Title").bold(), style(&asset.title).yellow());
            let registered = if asset.class_code.is_fallback() {
                " (unregistered category)"
            } else if registry.name_for(&asset.class_code).is_none() {
                " (class code no longer registered)"
            } else {
                ""
            };
            println!(
                "{}: {} [{}]{}",
                style("Category").bold(),
                asset.category,
                asset.class_code,
                style(registered).dim()
            );
            println!("{}: {}", style("Entered").bold(), asset.entry_date);
            println!("{}: {}", style("Condition").bold(), asset.condition);
            if let Some(ref location) = asset.location {
                println!("{}: {}", style("Location").bold(), location);
            }
            if let Some(value) = asset.value {
                println!("{}: {:.2}", style("Value").bold(), value);
            }
            if let Some(ref notes) = asset.notes {
                println!();
                println!("{}", style("Notes:").bold());
                println!("{}", notes);
            }
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {}",
                style("Author").dim(),
                asset.author,
                style("Created").dim(),
                asset.created.format("%Y-%m-%d %H:%M")
            );
            Ok(())
        }
    }
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;

    if !args.has_field_updates() {
        return edit_numbered::<Asset>(&project, &config, &args.id);
    }

    let store = RecordStore::new(&project);
    let (_, mut asset) = store
        .find::<Asset>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(title) = args.title {
        asset.title = title;
    }
    if let Some(location) = args.location {
        asset.location = Some(location).filter(|l| !l.is_empty());
    }
    if let Some(condition) = args.condition {
        asset.condition = condition;
    }
    if let Some(value) = args.value {
        asset.value = Some(value);
    }
    if let Some(notes) = args.notes {
        asset.notes = Some(notes).filter(|n| !n.is_empty());
    }

    store.update(&asset).map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        println!("{} Updated asset {}", style("✓").green(), style(&asset.id).cyan());
    }
    Ok(())
}

/// One CSV row of `asset import`
#[derive(Debug, Deserialize)]
struct AssetRow {
    title: String,
    #[serde(default)]
    category: Option<String>,
    entry_date: NaiveDate,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let allocator = open_allocator(&project, &config)?;
    let store = RecordStore::new(&project);
    let author = config.author();

    let file = File::open(&args.file).into_diagnostic()?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    // Rows are numbered in file order, so each allocation sees the ones before it.
    let mut existing = store.existing_ids::<Asset>();
    let mut imported = 0usize;
    let mut errors = 0usize;

    for (row_idx, result) in rdr.deserialize::<AssetRow>().enumerate() {
        let row_num = row_idx + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                errors += 1;
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, e);
                if !args.skip_errors {
                    return Err(miette::miette!("CSV parse error at row {}: {}", row_num, e));
                }
                continue;
            }
        };

        let category = row.category.unwrap_or_default();
        let request = AllocationRequest::new(DocumentKind::Asset, row.entry_date)
            .with_category(category.clone());

        if args.dry_run {
            let allocation = allocator
                .preview(&request, &existing)
                .map_err(|e| miette::miette!("{}", e))?;
            println!("{}\t{}", style(&allocation.id).cyan(), row.title);
            existing.push(allocation.id.to_string());
            imported += 1;
            continue;
        }

        let allocation = allocator
            .commit(&request, &existing)
            .map_err(|e| miette::miette!("{}", e))?;
        let category = registered_category(&allocation, category);
        let mut asset = Asset::new(allocation.id, row.title, category, row.entry_date, author.clone());
        asset.location = row.location;
        asset.value = row.value;
        asset.notes = row.notes;

        match store.create(&asset) {
            Ok(_) => {
                existing.push(asset.id.to_string());
                imported += 1;
                if !global.quiet {
                    println!("{} {}\t{}", style("✓").green(), style(&asset.id).cyan(), asset.title);
                }
            }
            Err(e) => {
                errors += 1;
                eprintln!("{} Row {}: {}", style("✗").red(), row_num, e);
                if !args.skip_errors {
                    return Err(miette::miette!("{}", e));
                }
            }
        }
    }

    if !global.quiet {
        println!();
        let verb = if args.dry_run { "would be imported" } else { "imported" };
        println!("{} asset(s) {}, {} error(s)", style(imported).cyan(), verb, errors);
    }
    Ok(())
}

fn run_tag(args: TagArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, asset) = store
        .find::<Asset>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    let tag = document_printer(&config)?
        .asset_tag(&asset)
        .map_err(|e| miette::miette!("{}", e))?;
    write_output(&tag, args.output.as_deref())
}

fn run_report(args: ReportArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let mut assets: Vec<Asset> = store.list().map_err(|e| miette::miette!("{}", e))?;
    if let Some(year) = args.year {
        assets.retain(|a| a.id.period().year() == year);
    }
    assets.sort_by(|a, b| a.id.cmp(&b.id));

    let council = config.council().unwrap_or("Council");
    let report = generate_report(council, args.year, &assets);
    write_output(&report, args.output.as_deref())
}

fn generate_report(council: &str, year: Option<i32>, assets: &[Asset]) -> String {
    let mut output = String::new();
    match year {
        Some(year) => output.push_str(&format!("# Asset Register {} - {}\n\n", year, council)),
        None => output.push_str(&format!("# Asset Register - {}\n\n", council)),
    }

    // Totals per class code
    let mut by_class: BTreeMap<String, (String, usize, f64)> = BTreeMap::new();
    for asset in assets {
        let entry = by_class
            .entry(asset.class_code.to_string())
            .or_insert_with(|| (asset.category.clone(), 0, 0.0));
        entry.1 += 1;
        entry.2 += asset.value.unwrap_or(0.0);
    }

    output.push_str("## Summary by Category\n\n");
    let mut summary = Builder::default();
    summary.push_record(["Code", "Category", "Assets", "Value"]);
    for (code, (name, count, value)) in &by_class {
        summary.push_record([
            code.clone(),
            name.clone(),
            count.to_string(),
            format!("{:.2}", value),
        ]);
    }
    output.push_str(&summary.build().with(Style::markdown()).to_string());

    output.push_str("\n\n## Register\n\n");
    let mut register = Builder::default();
    register.push_record(["ID", "Title", "Category", "Entered", "Condition", "Location", "Value"]);
    for asset in assets {
        register.push_record([
            asset.id.to_string(),
            asset.title.clone(),
            asset.category.clone(),
            asset.entry_date.to_string(),
            asset.condition.to_string(),
            asset.location.clone().unwrap_or_else(|| "-".to_string()),
            asset.value.map_or("-".to_string(), |v| format!("{:.2}", v)),
        ]);
    }
    output.push_str(&register.build().with(Style::markdown()).to_string());

    let disposed = assets
        .iter()
        .filter(|a| a.condition == AssetCondition::Disposed)
        .count();
    let total: f64 = assets.iter().filter_map(|a| a.value).sum();
    let unclassified = assets.iter().filter(|a| a.class_code.is_fallback()).count();

    output.push_str("\n\n## Totals\n\n");
    output.push_str(&format!("- **Assets:** {}\n", assets.len()));
    output.push_str(&format!("- **Disposed:** {}\n", disposed));
    output.push_str(&format!("- **Recorded value:** {:.2}\n", total));
    if unclassified > 0 {
        output.push_str(&format!(
            "- **Unregistered category (class 99):** {}\n",
            unclassified
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, category: &str, value: Option<f64>) -> Asset {
        let mut a = Asset::new(
            id.parse().unwrap(),
            format!("{} item", category),
            category.to_string(),
            NaiveDate::from_ymd_opt(2026, 2, 14).unwrap(),
            "Clerk".to_string(),
        );
        a.value = value;
        a
    }

    #[test]
    fn test_report_summarises_by_class() {
        let assets = vec![
            asset("258-2026-04-01", "Fleet", Some(30000.0)),
            asset("258-2026-04-02", "Fleet", Some(12500.5)),
            asset("258-2026-99-01", "Drones", None),
        ];
        let report = generate_report("Test Council", Some(2026), &assets);

        assert!(report.starts_with("# Asset Register 2026 - Test Council"));
        let fleet_row = report
            .lines()
            .find(|l| l.starts_with("| 04 "))
            .expect("fleet summary row");
        assert!(fleet_row.contains("Fleet"));
        assert!(fleet_row.contains("42500.50"));
        assert!(report.contains("258-2026-99-01"));
        assert!(report.contains("- **Assets:** 3"));
        assert!(report.contains("- **Unregistered category (class 99):** 1"));
    }

    #[test]
    fn test_registered_category_uses_configured_spelling() {
        use crate::core::category::CategoryRegistry;
        use crate::core::identity::OfficeCode;
        use crate::core::sequence::MemorySequenceStore;
        use crate::core::Allocator;

        let allocator = Allocator::new(
            OfficeCode::new("258").unwrap(),
            CategoryRegistry::new(CategoryRegistry::defaults()).unwrap(),
            MemorySequenceStore::new(),
        );
        let date = NaiveDate::from_ymd_opt(2026, 2, 14).unwrap();
        let existing: Vec<String> = Vec::new();

        let request = AllocationRequest::new(DocumentKind::Asset, date).with_category(" FLEET ");
        let allocation = allocator.preview(&request, &existing).unwrap();
        assert_eq!(registered_category(&allocation, " FLEET ".to_string()), "Fleet");

        let request = AllocationRequest::new(DocumentKind::Asset, date).with_category(" Drones ");
        let allocation = allocator.preview(&request, &existing).unwrap();
        assert_eq!(registered_category(&allocation, " Drones ".to_string()), "Drones");
    }

    #[test]
    fn test_condition_filter() {
        assert!(ConditionFilter::InService.matches(AssetCondition::Poor));
        assert!(!ConditionFilter::InService.matches(AssetCondition::Disposed));
        assert!(ConditionFilter::All.matches(AssetCondition::Disposed));
    }
}

//! `creg id` command - Inspect numbering without creating records

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::Result;
use std::collections::BTreeMap;

use crate::cli::helpers::{
    open_allocator, open_project_with_config, output_format, parse_date, print_serialized,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::allocator::AllocationRequest;
use crate::core::identity::{DocumentId, DocumentKind};
use crate::core::sequence::SequenceStore;
use crate::core::RecordStore;
use crate::entities::{Asset, GaragePermit, Requisition};

#[derive(Subcommand, Debug)]
pub enum IdCommands {
    /// Show the identifier the next record would receive (nothing is reserved)
    Preview(PreviewArgs),

    /// List allocation groups and the last sequence issued in each
    Groups,

    /// Break an identifier into its parts
    Parse(ParseArgs),
}

#[derive(clap::Args, Debug)]
pub struct PreviewArgs {
    /// Document kind: asset, permit, requisition
    pub kind: DocumentKind,

    /// Asset category name (ignored for other kinds)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Effective date, YYYY-MM-DD (default: today)
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

#[derive(clap::Args, Debug)]
pub struct ParseArgs {
    pub id: String,
}

const GROUP_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("group", "GROUP", 20),
    ColumnDef::new("last", "LAST ISSUED", 12),
];

/// Run an id subcommand
pub fn run(cmd: IdCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        IdCommands::Preview(args) => run_preview(args, global),
        IdCommands::Groups => run_groups(global),
        IdCommands::Parse(args) => run_parse(args),
    }
}

/// Identifiers already on disk for a kind
pub fn existing_ids_for(store: &RecordStore<'_>, kind: DocumentKind) -> Vec<String> {
    match kind {
        DocumentKind::Asset => store.existing_ids::<Asset>(),
        DocumentKind::GaragePermit => store.existing_ids::<GaragePermit>(),
        DocumentKind::Requisition => store.existing_ids::<Requisition>(),
    }
}

fn run_preview(args: PreviewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let allocator = open_allocator(&project, &config)?;
    let store = RecordStore::new(&project);

    let date = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut request = AllocationRequest::new(args.kind, date);
    if let Some(category) = args.category {
        request = request.with_category(category);
    }

    let existing = existing_ids_for(&store, args.kind);
    let allocation = allocator
        .preview(&request, &existing)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.quiet || global.format == OutputFormat::Id {
        println!("{}", allocation.id);
        return Ok(());
    }

    println!("{}", style(&allocation.id).cyan().bold());
    println!("   {}: {}", style("group").dim(), allocation.group.key);
    if let Some(ref class) = allocation.group.class {
        match allocation.group.category {
            Some(ref name) => println!("   {}: {} ({})", style("class").dim(), class, name),
            None => println!(
                "   {}: {} {}",
                style("class").dim(),
                style(class).yellow(),
                style("(category not registered)").yellow()
            ),
        }
    }
    Ok(())
}

fn run_groups(global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let allocator = open_allocator(&project, &config)?;
    let groups = allocator
        .store()
        .groups()
        .map_err(|e| miette::miette!("{}", e))?;

    let format = output_format(global, &config, OutputFormat::Tsv);
    if matches!(format, OutputFormat::Json | OutputFormat::Yaml) {
        let map: BTreeMap<String, u32> = groups
            .into_iter()
            .map(|(key, last)| (key.to_string(), last))
            .collect();
        return print_serialized(&map, format);
    }
    if groups.is_empty() && format == OutputFormat::Tsv {
        println!("No identifiers issued yet.");
        return Ok(());
    }

    let rows: Vec<TableRow> = groups
        .iter()
        .map(|(key, last)| {
            TableRow::new(key.to_string())
                .cell("group", CellValue::Id(key.to_string()))
                .cell("last", CellValue::Number(i64::from(*last)))
        })
        .collect();
    TableFormatter::new(GROUP_COLUMNS, "group").output(&rows, format);
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let kind = DocumentKind::from_id_shape(&args.id)
        .ok_or_else(|| miette::miette!("'{}' does not look like a document identifier", args.id))?;
    let id = DocumentId::parse_kind(kind, &args.id).map_err(|e| miette::miette!("{}", e))?;

    println!("{}: {}", style("Kind").bold(), id.kind());
    println!("{}: {}", style("Office").bold(), id.office());
    println!("{}: {}", style("Year").bold(), id.period().year());
    if let Some(class) = id.class() {
        println!("{}: {}", style("Class").bold(), class);
    }
    println!("{}: {}", style("Sequence").bold(), id.sequence());
    println!("{}: {}", style("Group").bold(), id.group_key());
    Ok(())
}

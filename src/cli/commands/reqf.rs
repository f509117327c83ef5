//! `creg reqf` command - Requisition forms

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::utils::{create_numbered, print_created};
use crate::cli::helpers::{
    document_printer, open_allocator, open_project_with_config, output_format, print_serialized,
    parse_date, write_output,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::allocator::AllocationRequest;
use crate::core::identity::DocumentKind;
use crate::core::RecordStore;
use crate::entities::requisition::{LineItem, Requisition, RequisitionStatus};

#[derive(Subcommand, Debug)]
pub enum ReqfCommands {
    /// List requisition forms
    List(ListArgs),

    /// Raise a new requisition form
    New(NewArgs),

    /// Show a requisition's details
    Show(ShowArgs),

    /// Move a form through draft, submitted, approved or rejected
    Status(StatusArgs),

    /// Render the printable form
    Print(PrintArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Draft,
    Submitted,
    Approved,
    Rejected,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by year
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Filter by department (substring match)
    #[arg(long)]
    pub department: Option<String>,

    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Person or unit requesting
    #[arg(long, short = 'r')]
    pub requester: String,

    /// What the purchase is for
    #[arg(long, short = 'p')]
    pub purpose: String,

    #[arg(long)]
    pub department: Option<String>,

    /// Form date, YYYY-MM-DD (default: today)
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Line item as description[:quantity[:unit_cost]] (repeatable)
    #[arg(long = "item", short = 'i')]
    pub items: Vec<LineItem>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Show the number that would be assigned without reserving it
    #[arg(long, alias = "dry-run")]
    pub preview: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Requisition number (e.g. RF258/2026/01) or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Requisition number or unique prefix
    pub id: String,

    /// New status
    pub status: RequisitionStatus,
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    /// Requisition number or unique prefix
    pub id: String,

    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 18),
    ColumnDef::new("date", "DATE", 12),
    ColumnDef::new("requester", "REQUESTER", 20),
    ColumnDef::new("department", "DEPARTMENT", 16),
    ColumnDef::new("purpose", "PURPOSE", 30),
    ColumnDef::new("items", "ITEMS", 6),
    ColumnDef::new("total", "TOTAL", 12),
    ColumnDef::new("status", "STATUS", 10),
];

/// Run a requisition subcommand
pub fn run(cmd: ReqfCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReqfCommands::List(args) => run_list(args, global),
        ReqfCommands::New(args) => run_new(args, global),
        ReqfCommands::Show(args) => run_show(args, global),
        ReqfCommands::Status(args) => run_status(args, global),
        ReqfCommands::Print(args) => run_print(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let mut forms: Vec<Requisition> = store.list().map_err(|e| miette::miette!("{}", e))?;

    forms.retain(|r| {
        let status_ok = match args.status {
            StatusFilter::Draft => r.requisition_status == RequisitionStatus::Draft,
            StatusFilter::Submitted => r.requisition_status == RequisitionStatus::Submitted,
            StatusFilter::Approved => r.requisition_status == RequisitionStatus::Approved,
            StatusFilter::Rejected => r.requisition_status == RequisitionStatus::Rejected,
            StatusFilter::All => true,
        };
        let year_ok = args.year.map_or(true, |y| r.id.period().year() == y);
        let dept_ok = args.department.as_ref().map_or(true, |d| {
            r.department
                .as_ref()
                .is_some_and(|rd| rd.to_lowercase().contains(&d.to_lowercase()))
        });
        status_ok && year_ok && dept_ok
    });
    forms.sort_by(|a, b| a.id.cmp(&b.id));
    if let Some(limit) = args.limit {
        forms.truncate(limit);
    }

    if args.count {
        println!("{}", forms.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(&forms, format),
        _ => {
            if forms.is_empty() && format == OutputFormat::Tsv {
                println!("No requisitions found.");
                return Ok(());
            }
            let rows: Vec<TableRow> = forms
                .iter()
                .map(|r| {
                    let priced = r.items.iter().any(|i| i.unit_cost.is_some());
                    TableRow::new(r.id.to_string())
                        .cell("id", CellValue::Id(r.id.to_string()))
                        .cell("date", CellValue::Date(r.date))
                        .cell("requester", CellValue::Text(r.requester.clone()))
                        .cell(
                            "department",
                            r.department.clone().map_or(CellValue::Empty, CellValue::Text),
                        )
                        .cell("purpose", CellValue::Text(r.purpose.clone()))
                        .cell("items", CellValue::Number(r.items.len() as i64))
                        .cell("total", CellValue::Money(priced.then(|| r.estimated_total())))
                        .cell("status", CellValue::Status(r.requisition_status.to_string()))
                })
                .collect();
            TableFormatter::new(COLUMNS, "requisition").output(&rows, format);
            Ok(())
        }
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let allocator = open_allocator(&project, &config)?;

    let date = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let request = AllocationRequest::new(DocumentKind::Requisition, date);
    let author = config.author();

    let created = create_numbered(&project, &allocator, &request, args.preview, |allocation| {
        let mut form = Requisition::new(allocation.id, args.requester, args.purpose, date, author);
        form.department = args.department;
        form.items = args.items;
        form.notes = args.notes;
        form
    })?;

    if let Some((path, form)) = created {
        print_created(&form, &path, global);
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, form) = store
        .find::<Requisition>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Yaml | OutputFormat::Json => print_serialized(&form, global.format),
        OutputFormat::Id => {
            println!("{}", form.id);
            Ok(())
        }
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("Requisition").bold(), style(&form.id).cyan());
            println!("{}: {}", style("Date").bold(), form.date);
            println!("{}: {}", style("Requester").bold(), style(&form.requester).yellow());
            if let Some(ref department) = form.department {
                println!("{}: {}", style("Department").bold(), department);
            }
            println!("{}: {}", style("Status").bold(), form.requisition_status);
            println!("{}: {}", style("Purpose").bold(), form.purpose);

            if !form.items.is_empty() {
                println!();
                println!("{} ({}):", style("Items").bold(), form.items.len());
                for item in &form.items {
                    print!("  • {} x {}", item.description, item.quantity);
                    if let Some(ref unit) = item.unit {
                        print!(" {}", unit);
                    }
                    if let Some(total) = item.line_total() {
                        print!(" = {:.2}", total);
                    }
                    println!();
                }
                if form.items.iter().any(|i| i.unit_cost.is_some()) {
                    println!("  {}: {:.2}", style("Estimated total").bold(), form.estimated_total());
                }
            }
            if let Some(ref notes) = form.notes {
                println!();
                println!("{}", style("Notes:").bold());
                println!("{}", notes);
            }
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {}",
                style("Author").dim(),
                form.author,
                style("Created").dim(),
                form.created.format("%Y-%m-%d %H:%M")
            );
            Ok(())
        }
    }
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, mut form) = store
        .find::<Requisition>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if matches!(
        form.requisition_status,
        RequisitionStatus::Approved | RequisitionStatus::Rejected
    ) && form.requisition_status != args.status
    {
        return Err(miette::miette!(
            "requisition {} is already {}",
            form.id,
            form.requisition_status
        ));
    }

    form.requisition_status = args.status;
    store.update(&form).map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        println!(
            "{} Requisition {} is now {}",
            style("✓").green(),
            style(&form.id).cyan(),
            form.requisition_status
        );
    }
    Ok(())
}

fn run_print(args: PrintArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, form) = store
        .find::<Requisition>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    let document = document_printer(&config)?
        .requisition(&form)
        .map_err(|e| miette::miette!("{}", e))?;
    write_output(&document, args.output.as_deref())
}

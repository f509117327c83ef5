//! `creg permit` command - Garage permits

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::utils::{create_numbered, edit_numbered, print_created};
use crate::cli::helpers::{
    document_printer, open_allocator, open_project_with_config, output_format, print_serialized,
    parse_date, write_output,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::allocator::AllocationRequest;
use crate::core::identity::DocumentKind;
use crate::core::RecordStore;
use crate::entities::garage_permit::{GaragePermit, PermitStatus};

#[derive(Subcommand, Debug)]
pub enum PermitCommands {
    /// List garage permits
    List(ListArgs),

    /// Issue a new garage permit
    New(NewArgs),

    /// Show a permit's details
    Show(ShowArgs),

    /// Edit a permit (the number and issue date are fixed)
    Edit(EditArgs),

    /// Render the printable permit
    Print(PrintArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Active,
    Expired,
    Revoked,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status (expiry is evaluated against today)
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by year of issue
    #[arg(long, short = 'y')]
    pub year: Option<i32>,

    /// Search in holder, address and plate
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Permit holder
    #[arg(long)]
    pub holder: String,

    /// Property address
    #[arg(long, short = 'a')]
    pub address: String,

    /// Vehicle registration plate
    #[arg(long, short = 'p')]
    pub plate: Option<String>,

    /// Issue date, YYYY-MM-DD (default: today)
    #[arg(long, short = 'd', value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Expiry date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub expires: Option<NaiveDate>,

    #[arg(long)]
    pub fee: Option<f64>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Show the number that would be assigned without reserving it
    #[arg(long, alias = "dry-run")]
    pub preview: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Permit number (e.g. 258/2026/01) or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Permit number or unique prefix
    pub id: String,

    #[arg(long)]
    pub holder: Option<String>,

    #[arg(long, short = 'a')]
    pub address: Option<String>,

    #[arg(long, short = 'p')]
    pub plate: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub expires: Option<NaiveDate>,

    #[arg(long)]
    pub fee: Option<f64>,

    #[arg(long)]
    pub status: Option<PermitStatus>,

    #[arg(long)]
    pub notes: Option<String>,
}

impl EditArgs {
    fn has_field_updates(&self) -> bool {
        self.holder.is_some()
            || self.address.is_some()
            || self.plate.is_some()
            || self.expires.is_some()
            || self.fee.is_some()
            || self.status.is_some()
            || self.notes.is_some()
    }
}

#[derive(clap::Args, Debug)]
pub struct PrintArgs {
    /// Permit number or unique prefix
    pub id: String,

    /// Write to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 16),
    ColumnDef::new("holder", "HOLDER", 24),
    ColumnDef::new("address", "ADDRESS", 30),
    ColumnDef::new("plate", "PLATE", 12),
    ColumnDef::new("issued", "ISSUED", 12),
    ColumnDef::new("expires", "EXPIRES", 12),
    ColumnDef::new("status", "STATUS", 10),
];

/// Run a permit subcommand
pub fn run(cmd: PermitCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PermitCommands::List(args) => run_list(args, global),
        PermitCommands::New(args) => run_new(args, global),
        PermitCommands::Show(args) => run_show(args, global),
        PermitCommands::Edit(args) => run_edit(args, global),
        PermitCommands::Print(args) => run_print(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let mut permits: Vec<GaragePermit> = store.list().map_err(|e| miette::miette!("{}", e))?;
    let today = chrono::Local::now().date_naive();

    permits.retain(|p| {
        let status_ok = match args.status {
            StatusFilter::Active => p.effective_status(today) == PermitStatus::Active,
            StatusFilter::Expired => p.effective_status(today) == PermitStatus::Expired,
            StatusFilter::Revoked => p.effective_status(today) == PermitStatus::Revoked,
            StatusFilter::All => true,
        };
        let year_ok = args.year.map_or(true, |y| p.id.period().year() == y);
        let search_ok = args.search.as_ref().map_or(true, |search| {
            let needle = search.to_lowercase();
            p.holder.to_lowercase().contains(&needle)
                || p.address.to_lowercase().contains(&needle)
                || p.plate.as_ref().is_some_and(|pl| pl.to_lowercase().contains(&needle))
        });
        status_ok && year_ok && search_ok
    });
    permits.sort_by(|a, b| a.id.cmp(&b.id));
    if let Some(limit) = args.limit {
        permits.truncate(limit);
    }

    if args.count {
        println!("{}", permits.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(&permits, format),
        _ => {
            if permits.is_empty() && format == OutputFormat::Tsv {
                println!("No permits found.");
                return Ok(());
            }
            let rows: Vec<TableRow> = permits
                .iter()
                .map(|p| {
                    TableRow::new(p.id.to_string())
                        .cell("id", CellValue::Id(p.id.to_string()))
                        .cell("holder", CellValue::Text(p.holder.clone()))
                        .cell("address", CellValue::Text(p.address.clone()))
                        .cell("plate", p.plate.clone().map_or(CellValue::Empty, CellValue::Text))
                        .cell("issued", CellValue::Date(p.issue_date))
                        .cell("expires", p.expiry_date.map_or(CellValue::Empty, CellValue::Date))
                        .cell("status", CellValue::Status(p.effective_status(today).to_string()))
                })
                .collect();
            TableFormatter::new(COLUMNS, "permit").output(&rows, format);
            Ok(())
        }
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let allocator = open_allocator(&project, &config)?;

    let issue_date = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    if let Some(expires) = args.expires {
        if expires < issue_date {
            return Err(miette::miette!(
                "expiry date {} is before the issue date {}",
                expires,
                issue_date
            ));
        }
    }

    let request = AllocationRequest::new(DocumentKind::GaragePermit, issue_date);
    let author = config.author();

    let created = create_numbered(&project, &allocator, &request, args.preview, |allocation| {
        let mut permit = GaragePermit::new(allocation.id, args.holder, args.address, issue_date, author);
        permit.plate = args.plate;
        permit.expiry_date = args.expires;
        permit.fee = args.fee;
        permit.notes = args.notes;
        permit
    })?;

    if let Some((path, permit)) = created {
        print_created(&permit, &path, global);
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, permit) = store
        .find::<GaragePermit>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Yaml | OutputFormat::Json => print_serialized(&permit, global.format),
        OutputFormat::Id => {
            println!("{}", permit.id);
            Ok(())
        }
        _ => {
            let today = chrono::Local::now().date_naive();
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("Permit").bold(), style(&permit.id).cyan());
            println!("{}: {}", style("Holder").bold(), style(&permit.holder).yellow());
            println!("{}: {}", style("Address").bold(), permit.address);
            if let Some(ref plate) = permit.plate {
                println!("{}: {}", style("Plate").bold(), plate);
            }
            println!("{}: {}", style("Issued").bold(), permit.issue_date);
            if let Some(expiry) = permit.expiry_date {
                println!("{}: {}", style("Expires").bold(), expiry);
            }
            if let Some(fee) = permit.fee {
                println!("{}: {:.2}", style("Fee").bold(), fee);
            }
            println!("{}: {}", style("Status").bold(), permit.effective_status(today));
            if let Some(ref notes) = permit.notes {
                println!();
                println!("{}", style("Notes:").bold());
                println!("{}", notes);
            }
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {}",
                style("Author").dim(),
                permit.author,
                style("Created").dim(),
                permit.created.format("%Y-%m-%d %H:%M")
            );
            Ok(())
        }
    }
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;

    if !args.has_field_updates() {
        return edit_numbered::<GaragePermit>(&project, &config, &args.id);
    }

    let store = RecordStore::new(&project);
    let (_, mut permit) = store
        .find::<GaragePermit>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(holder) = args.holder {
        permit.holder = holder;
    }
    if let Some(address) = args.address {
        permit.address = address;
    }
    if let Some(plate) = args.plate {
        permit.plate = Some(plate).filter(|p| !p.is_empty());
    }
    if let Some(expires) = args.expires {
        if expires < permit.issue_date {
            return Err(miette::miette!(
                "expiry date {} is before the issue date {}",
                expires,
                permit.issue_date
            ));
        }
        permit.expiry_date = Some(expires);
    }
    if let Some(fee) = args.fee {
        permit.fee = Some(fee);
    }
    if let Some(status) = args.status {
        permit.permit_status = status;
    }
    if let Some(notes) = args.notes {
        permit.notes = Some(notes).filter(|n| !n.is_empty());
    }

    store.update(&permit).map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        println!("{} Updated permit {}", style("✓").green(), style(&permit.id).cyan());
    }
    Ok(())
}

fn run_print(args: PrintArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, permit) = store
        .find::<GaragePermit>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    let document = document_printer(&config)?
        .permit(&permit)
        .map_err(|e| miette::miette!("{}", e))?;
    write_output(&document, args.output.as_deref())
}

//! `creg request` command - Citizen service requests

use clap::{Subcommand, ValueEnum};
use console::style;
use miette::Result;

use crate::cli::helpers::{open_project_with_config, output_format, print_serialized, truncate_str};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Priority;
use crate::core::RecordStore;
use crate::entities::service_request::{RequestStatus, ServiceRequest};

#[derive(Subcommand, Debug)]
pub enum RequestCommands {
    /// List service requests
    List(ListArgs),

    /// Log a new service request
    New(NewArgs),

    /// Show a request's details
    Show(ShowArgs),

    /// Change status or priority
    Update(UpdateArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusFilter {
    Open,
    InProgress,
    Resolved,
    Closed,
    /// Open or in progress
    Pending,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    #[arg(long, short = 's', default_value = "pending")]
    pub status: StatusFilter,

    /// Minimum priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Filter by category (case-insensitive)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Citizen raising the request
    #[arg(long)]
    pub citizen: String,

    /// Short subject line
    #[arg(long, short = 's')]
    pub subject: String,

    /// Phone or email
    #[arg(long)]
    pub contact: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Free-form category (roads, lighting, waste...)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long, short = 'p', default_value = "medium")]
    pub priority: Priority,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Request ID (SR-...) or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Request ID or unique prefix
    pub id: String,

    #[arg(long, short = 's')]
    pub status: Option<RequestStatus>,

    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,

    /// Resolution note (kept when resolving or closing)
    #[arg(long)]
    pub note: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 16),
    ColumnDef::new("subject", "SUBJECT", 34),
    ColumnDef::new("citizen", "CITIZEN", 20),
    ColumnDef::new("category", "CATEGORY", 12),
    ColumnDef::new("priority", "PRIORITY", 10),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("created", "CREATED", 12),
];

/// Run a service request subcommand
pub fn run(cmd: RequestCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        RequestCommands::List(args) => run_list(args, global),
        RequestCommands::New(args) => run_new(args, global),
        RequestCommands::Show(args) => run_show(args, global),
        RequestCommands::Update(args) => run_update(args, global),
    }
}

fn status_matches(filter: StatusFilter, status: RequestStatus) -> bool {
    match filter {
        StatusFilter::Open => status == RequestStatus::Open,
        StatusFilter::InProgress => status == RequestStatus::InProgress,
        StatusFilter::Resolved => status == RequestStatus::Resolved,
        StatusFilter::Closed => status == RequestStatus::Closed,
        StatusFilter::Pending => !status.is_terminal(),
        StatusFilter::All => true,
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let mut requests: Vec<ServiceRequest> = store.list().map_err(|e| miette::miette!("{}", e))?;

    requests.retain(|r| {
        status_matches(args.status, r.request_status)
            && args.priority.map_or(true, |p| r.priority >= p)
            && args.category.as_ref().map_or(true, |c| {
                r.category.as_ref().is_some_and(|rc| rc.eq_ignore_ascii_case(c))
            })
    });

    // Most urgent first, then oldest
    requests.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created.cmp(&b.created)));
    if let Some(limit) = args.limit {
        requests.truncate(limit);
    }

    if args.count {
        println!("{}", requests.len());
        return Ok(());
    }

    let format = output_format(global, &config, OutputFormat::Tsv);
    match format {
        OutputFormat::Json | OutputFormat::Yaml => print_serialized(&requests, format),
        _ => {
            if requests.is_empty() && format == OutputFormat::Tsv {
                println!("No service requests found.");
                return Ok(());
            }
            let rows: Vec<TableRow> = requests
                .iter()
                .map(|r| {
                    TableRow::new(r.id.to_string())
                        .cell("id", CellValue::Id(r.id.to_string()))
                        .cell("subject", CellValue::Text(r.subject.clone()))
                        .cell("citizen", CellValue::Text(r.citizen.clone()))
                        .cell("category", r.category.clone().map_or(CellValue::Empty, CellValue::Text))
                        .cell("priority", CellValue::Priority(r.priority))
                        .cell("status", CellValue::Status(r.request_status.to_string()))
                        .cell("created", CellValue::Created(r.created))
                })
                .collect();
            TableFormatter::new(COLUMNS, "request").output(&rows, format);
            Ok(())
        }
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);

    let mut request = ServiceRequest::new(args.citizen, args.subject, config.author());
    request.contact = args.contact;
    request.description = args.description;
    request.category = args.category;
    request.priority = args.priority;

    let path = store.create(&request).map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", request.id);
    } else if !global.quiet {
        println!(
            "{} Logged request {} {}",
            style("✓").green(),
            style(&request.id).cyan(),
            style(truncate_str(&request.subject, 40)).dim()
        );
        println!("   {}", style(path.display()).dim());
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (project, _config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, request) = store
        .find::<ServiceRequest>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Yaml | OutputFormat::Json => print_serialized(&request, global.format),
        OutputFormat::Id => {
            println!("{}", request.id);
            Ok(())
        }
        _ => {
            println!("{}", style("─".repeat(60)).dim());
            println!("{}: {}", style("Request").bold(), style(&request.id).cyan());
            println!("{}: {}", style("Subject").bold(), style(&request.subject).yellow());
            println!("{}: {}", style("Citizen").bold(), request.citizen);
            if let Some(ref contact) = request.contact {
                println!("{}: {}", style("Contact").bold(), contact);
            }
            if let Some(ref category) = request.category {
                println!("{}: {}", style("Category").bold(), category);
            }
            println!("{}: {}", style("Priority").bold(), request.priority);
            println!("{}: {}", style("Status").bold(), request.request_status);
            if let Some(ref description) = request.description {
                println!();
                println!("{}", style("Description:").bold());
                println!("{}", description);
            }
            if let Some(ref resolution) = request.resolution {
                println!();
                println!("{}", style("Resolution:").bold());
                println!("{}", resolution);
            }
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "{}: {} | {}: {}",
                style("Author").dim(),
                request.author,
                style("Created").dim(),
                request.created.format("%Y-%m-%d %H:%M")
            );
            Ok(())
        }
    }
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    if args.status.is_none() && args.priority.is_none() {
        return Err(miette::miette!("nothing to update; pass --status and/or --priority"));
    }

    let (project, _config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let (_, mut request) = store
        .find::<ServiceRequest>(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if let Some(priority) = args.priority {
        request.priority = priority;
    }
    if let Some(status) = args.status {
        request
            .transition(status, args.note)
            .map_err(|e| miette::miette!("{}", e))?;
    }

    store.update(&request).map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        println!(
            "{} Updated request {} ({}, {})",
            style("✓").green(),
            style(&request.id).cyan(),
            request.request_status,
            request.priority
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_filter_excludes_terminal_states() {
        assert!(status_matches(StatusFilter::Pending, RequestStatus::Open));
        assert!(status_matches(StatusFilter::Pending, RequestStatus::InProgress));
        assert!(!status_matches(StatusFilter::Pending, RequestStatus::Resolved));
        assert!(!status_matches(StatusFilter::Pending, RequestStatus::Closed));
        assert!(status_matches(StatusFilter::All, RequestStatus::Closed));
    }
}

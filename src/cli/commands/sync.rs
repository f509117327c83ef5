//! `creg sync` command - Push/pull the registry to a mirror

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::helpers::open_project_with_config;
use crate::cli::GlobalOpts;
use crate::core::mirror::{ensure_office, CouncilSnapshot, FileMirror, MirrorBackend};
use crate::core::RecordStore;

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Upload the full local registry, replacing the mirror's copy
    Push(PushArgs),

    /// Replace local records with the mirror's copy
    Pull(PullArgs),
}

#[derive(clap::Args, Debug)]
pub struct PushArgs {
    /// Mirror directory
    #[arg(long)]
    pub to: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct PullArgs {
    /// Mirror directory
    #[arg(long)]
    pub from: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Run a sync subcommand
pub fn run(cmd: SyncCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SyncCommands::Push(args) => run_push(args, global),
        SyncCommands::Pull(args) => run_pull(args, global),
    }
}

fn run_push(args: PushArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let council = config.council().map_err(|e| miette::miette!("{}", e))?;
    let office = config.office_code().map_err(|e| miette::miette!("{}", e))?;
    let categories = config
        .category_registry()
        .map_err(|e| miette::miette!("{}", e))?
        .iter()
        .cloned()
        .collect();

    let snapshot = CouncilSnapshot::capture(&store, council, office, categories)
        .map_err(|e| miette::miette!("{}", e))?;
    let mirror = FileMirror::new(args.to);
    mirror.push(&snapshot).map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Pushed {} record(s) to {}",
            style("✓").green(),
            snapshot.record_count(),
            style(mirror.location(council)).cyan()
        );
    }
    Ok(())
}

fn run_pull(args: PullArgs, global: &GlobalOpts) -> Result<()> {
    let (project, config) = open_project_with_config(global)?;
    let store = RecordStore::new(&project);
    let council = config.council().map_err(|e| miette::miette!("{}", e))?;
    let office = config.office_code().map_err(|e| miette::miette!("{}", e))?;

    let mirror = FileMirror::new(args.from);
    let snapshot = mirror
        .pull(council)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| {
            miette::miette!("no mirror document for '{}' at {}", council, mirror.location(council))
        })?;
    ensure_office(&snapshot, &office).map_err(|e| miette::miette!("{}", e))?;

    if !args.yes {
        let prompt = format!(
            "Replace all local records with {} record(s) exported {}?",
            snapshot.record_count(),
            snapshot.exported_at.format("%Y-%m-%d %H:%M")
        );
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let stats = snapshot
        .restore(&store)
        .map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Pulled {} asset(s), {} permit(s), {} requisition(s), {} request(s)",
            style("✓").green(),
            stats.assets,
            stats.permits,
            stats.requisitions,
            stats.requests
        );
        println!(
            "   {}",
            style("allocation counters are untouched; the next commit continues past every restored number").dim()
        );
    }
    Ok(())
}

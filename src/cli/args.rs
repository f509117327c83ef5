//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    asset::AssetCommands, category::CategoryCommands, completions::CompletionsArgs,
    config::ConfigCommands, id::IdCommands, init::InitArgs, permit::PermitCommands,
    reqf::ReqfCommands, request::RequestCommands, sync::SyncCommands, validate::ValidateArgs,
};

#[derive(Parser)]
#[command(name = "creg")]
#[command(author, version, about = "Council Registry")]
#[command(long_about = "Municipal council registry for fixed assets, garage permits, requisition forms and service requests, with sequential document numbering.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Project root (default: auto-detect by finding .creg/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new registry project
    Init(InitArgs),

    /// Fixed-asset register
    #[command(subcommand)]
    Asset(AssetCommands),

    /// Garage permits
    #[command(subcommand)]
    Permit(PermitCommands),

    /// Requisition forms
    #[command(subcommand)]
    Reqf(ReqfCommands),

    /// Citizen service requests
    #[command(subcommand)]
    Request(RequestCommands),

    /// Document number allocation
    #[command(subcommand)]
    Id(IdCommands),

    /// Asset categories and class codes
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Check record files and document numbers
    Validate(ValidateArgs),

    /// Push or pull the whole registry to a mirror
    #[command(subcommand)]
    Sync(SyncCommands),

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Resolve `auto` to a concrete format
    pub fn or(self, fallback: OutputFormat) -> OutputFormat {
        match self {
            OutputFormat::Auto => fallback,
            f => f,
        }
    }
}

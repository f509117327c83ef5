//! `creg config` command - Configuration management
//!
//! Provides commands to view and modify registry configuration.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::identity::OfficeCode;
use crate::core::project::Project;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., author, editor)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of project config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("council", "Council name shown on printed documents and used as the mirror key"),
    ("office_code", "Office code embedded in every document number"),
    ("author", "Default author for new records"),
    ("editor", "Editor command for `creg ... edit`"),
    (
        "default_format",
        "Default output format (yaml, json, tsv, etc.)",
    ),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args, global),
        ConfigCommands::Unset(args) => run_unset(args, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = Project::locate(global.project.as_deref()).ok();
    let config = Config::load_for(project.as_ref());

    if let Some(key) = &args.key {
        return match get_config_value(&config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, get_config_value(&config, key).as_deref());
    }

    println!();
    match config.category_registry() {
        Ok(registry) => {
            let source = if config.categories.is_some() {
                "configured"
            } else {
                "built-in"
            };
            println!("  {} ({}):", style("categories").cyan(), style(source).dim());
            for category in registry.iter() {
                println!("    {} {}", style(&category.code).yellow(), category.name);
            }
        }
        Err(e) => println!("  {}: {}", style("categories").cyan(), style(e).red()),
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (CREG_AUTHOR, CREG_OFFICE_CODE, CREG_COUNCIL)");
    println!("  2. Project config (.creg/config.yaml)");
    println!("  3. Global config (~/.config/creg/config.yaml)");
    Ok(())
}

fn run_set(args: SetArgs, global: &GlobalOpts) -> Result<()> {
    check_key(&args.key)?;
    if args.key == "office_code" {
        OfficeCode::new(args.value.trim()).map_err(|e| miette::miette!("{}", e))?;
    }

    let config_path = config_path(args.global, global)?;
    let mut config_map = read_mapping(&config_path)?;
    config_map.insert(
        serde_yml::Value::String(args.key.clone()),
        serde_yml::Value::String(args.value.clone()),
    );
    write_mapping(&config_path, config_map)?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope
    );
    if args.key == "office_code" {
        println!(
            "   {}",
            style("existing document numbers keep their old office code").dim()
        );
    }
    Ok(())
}

fn run_unset(args: UnsetArgs, global: &GlobalOpts) -> Result<()> {
    let config_path = config_path(args.global, global)?;
    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    if config_map
        .remove(serde_yml::Value::String(args.key.clone()))
        .is_none()
    {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    write_mapping(&config_path, config_map)?;

    let scope = if args.global { "global" } else { "project" };
    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope
    );
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let global_path = global_config_path()?;
    println!("{}", style("Configuration file paths:").bold());
    println!();
    println!("  {} {}", style("Global:").cyan(), global_path.display());
    print_exists(global_path.exists(), 9);

    println!();
    match Project::locate(global.project.as_deref()) {
        Ok(project) => {
            let path = project.config_path();
            println!("  {} {}", style("Project:").cyan(), path.display());
            print_exists(path.exists(), 10);
        }
        Err(_) => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in a registry project)").dim()
        ),
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();
    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }
    println!();
    println!(
        "{}",
        style("Use 'creg config set <key> <value>' to set a value. Categories are edited in the config file.").dim()
    );
    Ok(())
}

fn check_key(key: &str) -> Result<()> {
    if VALID_KEYS.iter().any(|(k, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            "Unknown config key '{}' (run 'creg config keys')",
            key
        ))
    }
}

fn global_config_path() -> Result<PathBuf> {
    directories::ProjectDirs::from("", "", "creg")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
        .ok_or_else(|| miette::miette!("Could not determine global config directory"))
}

fn config_path(use_global: bool, global: &GlobalOpts) -> Result<PathBuf> {
    if use_global {
        return global_config_path();
    }
    let project = Project::locate(global.project.as_deref()).map_err(|e| miette::miette!("{}", e))?;
    Ok(project.config_path())
}

fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content).into_diagnostic()? {
        serde_yml::Value::Mapping(map) => Ok(map),
        serde_yml::Value::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(miette::miette!(
            "{} is not a YAML mapping",
            path.display()
        )),
    }
}

fn write_mapping(path: &std::path::Path, map: serde_yml::Mapping) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&serde_yml::Value::Mapping(map)).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "council" => config.council.clone(),
        "office_code" => config.office_code.clone(),
        "author" => config.author.clone(),
        "editor" => config.editor.clone(),
        "default_format" => config.default_format.clone(),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_exists(exists: bool, indent: usize) {
    let label = if exists {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {:indent$}{}", "", label, indent = indent);
}

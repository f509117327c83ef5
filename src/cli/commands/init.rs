//! `creg init` command - Initialize a new registry project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::core::identity::OfficeCode;
use crate::core::project::{Project, ProjectError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: std::path::PathBuf,

    /// Council name
    #[arg(long, env = "CREG_COUNCIL")]
    pub council: String,

    /// Office code embedded in document numbers (e.g. 258)
    #[arg(long, env = "CREG_OFFICE_CODE")]
    pub office_code: String,

    /// Force initialization even if .creg/ already exists (rewrites the config)
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let office = OfficeCode::new(args.office_code.trim()).map_err(|e| miette::miette!("{}", e))?;
    let council = args.council.trim();
    if council.is_empty() {
        return Err(miette::miette!("council name cannot be empty"));
    }

    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let project = if args.force {
        Project::init_force(&path, council, &office)
    } else {
        Project::init(&path, council, &office)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized registry for {} (office {}) at {}",
                style("✓").green(),
                style(council).bold(),
                style(&office).yellow(),
                style(project.root().display()).cyan()
            );
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Register an asset",
                style("creg asset new -t \"Refuse truck\" -c Fleet").yellow()
            );
            println!(
                "  {} Preview the next permit number",
                style("creg id preview permit").yellow()
            );
            println!(
                "  {} Validate record files",
                style("creg validate").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} Registry project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to rewrite its configuration",
                style("creg init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    println!("  {}/", style(".creg").cyan());
    println!("    config.yaml");
    for dir in Project::record_directories() {
        let marker = if root.join(dir).is_dir() { "" } else { " (missing)" };
        println!("  {}/{}", style(dir).cyan(), marker);
    }
}

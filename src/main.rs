use clap::Parser;
use creg::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    creg::telemetry::init(global.verbose, global.quiet);

    match cli.command {
        Commands::Init(args) => creg::cli::commands::init::run(args),
        Commands::Asset(cmd) => creg::cli::commands::asset::run(cmd, &global),
        Commands::Permit(cmd) => creg::cli::commands::permit::run(cmd, &global),
        Commands::Reqf(cmd) => creg::cli::commands::reqf::run(cmd, &global),
        Commands::Request(cmd) => creg::cli::commands::request::run(cmd, &global),
        Commands::Id(cmd) => creg::cli::commands::id::run(cmd, &global),
        Commands::Category(cmd) => creg::cli::commands::category::run(cmd, &global),
        Commands::Validate(args) => creg::cli::commands::validate::run(args, &global),
        Commands::Sync(cmd) => creg::cli::commands::sync::run(cmd, &global),
        Commands::Config(cmd) => creg::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => creg::cli::commands::completions::run(args),
    }
}

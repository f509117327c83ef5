//! Diagnostic logging
//!
//! Events go to stderr so that command output on stdout stays pipeable.
//! `CREG_LOG` takes an `EnvFilter` directive (e.g. `creg::core=debug`) and
//! overrides the level picked from `-v`.

use tracing::metadata::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Environment variable holding filter directives
pub const LOG_ENV_VAR: &str = "CREG_LOG";

/// Install the global subscriber. Calling it again is a no-op.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity, quiet).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let fmt = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .without_time();

    let _ = tracing_subscriber::registry().with(filter).with(fmt).try_init();
}

fn level_from_verbosity(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

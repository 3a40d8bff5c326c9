//! tierctl - tiered AWS environment configuration
//!
//! This is the main entry point for the tierctl CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::output::OutputFormatter;
use cli::{Cli, Commands};
use std::sync::Arc;
use tierctl::config::Config;
use tierctl::tier::TierCatalog;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = match Config::load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbosity(), None);
            fail(&cli, &e);
        }
    };

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), Some(&config.logging.level));

    match run(&cli, config) {
        Ok(code) => std::process::exit(code),
        Err(e) => fail(&cli, &e),
    }
}

fn run(cli: &Cli, config: Config) -> Result<i32> {
    let tiers = Arc::new(TierCatalog::builtin());
    let mut ctx = CommandContext::new(cli, config, tiers)?;

    // Execute the appropriate command
    match &cli.command {
        Commands::Validate(args) => args.execute(&mut ctx),
        Commands::Render(args) => args.execute(&mut ctx),
        Commands::Check(args) => args.execute(&mut ctx),
        Commands::Tiers(args) => args.execute(&mut ctx),
        Commands::Regions(args) => args.execute(&mut ctx),
    }
}

/// Report an error and exit with its code
fn fail(cli: &Cli, err: &anyhow::Error) -> ! {
    let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());
    output.error(&format!("{err:#}"));

    let code = match err.downcast_ref::<tierctl::error::Error>() {
        Some(e) => {
            if let tierctl::error::Error::UnknownField {
                suggestion: None, ..
            } = e
            {
                output.hint("run `tierctl tiers` to list the overridable settings");
            }
            e.exit_code()
        }
        None => 2,
    };
    std::process::exit(code);
}

/// Initialize logging based on verbosity level
///
/// Logs go to stderr so rendered output on stdout stays parseable.
fn init_logging(verbosity: u8, configured: Option<&str>) {
    let filter = match verbosity {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

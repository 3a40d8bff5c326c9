//! CLI module for tierctl
//!
//! This module provides the command-line interface for tierctl,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tierctl - tiered AWS environment configuration
///
/// Resolves, validates and renders environment parameters per compliance tier.
#[derive(Parser, Debug, Clone)]
#[command(name = "tierctl")]
#[command(version)]
#[command(about = "Validate and generate tiered AWS environment configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "TIERCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve one environment and check it against its tier policy
    Validate(commands::validate::ValidateArgs),

    /// Resolve one environment and emit its configuration
    Render(commands::render::RenderArgs),

    /// Check every environment in a manifest
    Check(commands::check::CheckArgs),

    /// Show tier policies and defaults
    Tiers(commands::tiers::TiersArgs),

    /// Show known regions
    Regions(commands::regions::RegionsArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["tierctl", "validate", "prod", "app1", "us-west-2"]).unwrap();
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.env.tier, "prod");
                assert_eq!(args.env.project, "app1");
                assert_eq!(args.env.region, "us-west-2");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["tierctl", "-vvvv", "regions"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }

    #[test]
    fn test_overrides_repeat() {
        let cli = Cli::try_parse_from([
            "tierctl",
            "render",
            "dev",
            "app1",
            "us-west-2",
            "--override",
            "multi_az=true",
            "-o",
            "az_count=3",
            "--format",
            "tfvars",
        ])
        .unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.env.overrides, vec!["multi_az=true", "az_count=3"]);
                assert_eq!(args.format, Some(commands::render::FormatArg::Tfvars));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tierctl", "tiers", "--output", "json", "--no-color"]).unwrap();
        assert!(cli.is_json());
        assert!(cli.no_color);
    }
}

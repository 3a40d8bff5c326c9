//! Subcommands module for tierctl CLI
//!
//! This module contains all the subcommand implementations.

pub mod check;
pub mod regions;
pub mod render;
pub mod tiers;
pub mod validate;

use crate::cli::output::OutputFormatter;
use anyhow::{Context, Result};
use clap::Args;
use indexmap::IndexMap;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tierctl::cidr::parse_cidr;
use tierctl::config::Config;
use tierctl::pipeline::{Outcome, Pipeline, PipelineDefaults, Request};
use tierctl::region::RegionCatalog;
use tierctl::settings::{parse_assignment, Overrides};
use tierctl::tier::{Tier, TierCatalog};

/// Inputs naming one environment, shared by `validate` and `render`
#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    /// Tier (dev, staging, prod)
    pub tier: String,

    /// Project identifier
    pub project: String,

    /// AWS region (e.g. us-west-2)
    pub region: String,

    /// Override a setting (key=value or @file.yml)
    #[arg(short = 'o', long = "override", action = clap::ArgAction::Append)]
    pub overrides: Vec<String>,

    /// VPC block for this environment
    #[arg(long)]
    pub base_cidr: Option<String>,
}

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Tier catalog, built once
    pub tiers: Arc<TierCatalog>,
    /// Region catalog with configured regions merged in
    pub regions: Arc<RegionCatalog>,
    /// Base CIDR and subnet prefix fallbacks
    pub defaults: PipelineDefaults,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config, tiers: Arc<TierCatalog>) -> Result<Self> {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.is_json(), cli.verbosity());
        let regions = Arc::new(config.region_catalog()?);
        let defaults = config.pipeline_defaults()?;

        Ok(Self {
            config,
            output,
            tiers,
            regions,
            defaults,
        })
    }

    /// A fresh pipeline over the context's catalogs
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            Arc::clone(&self.tiers),
            Arc::clone(&self.regions),
            self.defaults.clone(),
            &self.config.defaults.account,
        )
    }

    /// Parse override arguments into typed overrides
    ///
    /// `@file` entries load a YAML or JSON map; later entries win.
    pub fn parse_overrides(&self, raw: &[String]) -> tierctl::error::Result<Overrides> {
        let mut values: IndexMap<String, serde_yaml::Value> = IndexMap::new();

        for entry in raw {
            if let Some(file_path) = entry.strip_prefix('@') {
                let path = Path::new(file_path);
                if !path.exists() {
                    return Err(tierctl::error::Error::FileNotFound(path.to_path_buf()));
                }
                let content = std::fs::read_to_string(path)?;
                let file_values: IndexMap<String, serde_yaml::Value> =
                    serde_yaml::from_str(&content)?;
                self.output.debug(&format!(
                    "Loaded {} override(s) from {}",
                    file_values.len(),
                    path.display()
                ));
                values.extend(file_values);
            } else {
                let (key, value) = parse_assignment(entry)?;
                values.insert(key, value);
            }
        }

        Overrides::from_values(&values)
    }

    /// Build a pipeline request from environment arguments
    pub fn request(&self, args: &EnvironmentArgs) -> tierctl::error::Result<Request> {
        let tier: Tier = args.tier.parse()?;
        let overrides = self.parse_overrides(&args.overrides)?;
        let mut request =
            Request::new(tier, args.project.clone(), args.region.clone()).with_overrides(overrides);
        if let Some(raw) = &args.base_cidr {
            request = request.with_base_cidr(parse_cidr(raw)?);
        }
        Ok(request)
    }

    /// Resolve one environment
    pub fn resolve(&self, args: &EnvironmentArgs) -> Result<Outcome> {
        let request = self.request(args)?;
        let outcome = self
            .pipeline()
            .run(&request)
            .with_context(|| format!("Failed to resolve {}/{}", args.region, args.tier))?;
        Ok(outcome)
    }

    /// Print a resolved environment's summary and violations
    pub fn report_outcome(&self, outcome: &Outcome) {
        let config = &outcome.config;

        if self.output.is_json() {
            self.output.json(&json!({
                "type": "result",
                "environment": config.name_prefix,
                "tier": config.environment,
                "region": config.region,
                "vpc_cidr": config.network.vpc_cidr.to_string(),
                "passed": outcome.passed(),
                "violations": outcome.violations.len(),
            }));
            self.output.violations(&outcome.violations);
            return;
        }

        self.output.section(&config.name_prefix);
        self.output.field("tier", config.environment.as_str());
        self.output.field("region", &config.region);
        self.output.field("vpc_cidr", &config.network.vpc_cidr.to_string());
        self.output.field("availability zones", &config.network.azs.join(", "));
        self.output.field(
            "subnets",
            &format!(
                "{} x /{}",
                config.network.all_subnets().count(),
                config.network.subnet_prefix
            ),
        );

        if outcome.passed() {
            self.output
                .success(&format!("{}: all policy checks passed", config.name_prefix));
        } else {
            self.output.section("Policy violations");
            self.output.violations(&outcome.violations);
            self.output.failure(&format!(
                "{}: {} policy violation(s)",
                config.name_prefix,
                outcome.violations.len()
            ));
        }
    }
}

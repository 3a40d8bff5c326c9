//! Check command
//!
//! Runs every environment of a manifest and reports violations, CIDR
//! overlaps and name collisions across all of them.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tierctl::manifest::{Manifest, ManifestChecker, ManifestReport};

/// Arguments for the check command
#[derive(Parser, Debug, Clone)]
pub struct CheckArgs {
    /// Manifest file (YAML, JSON or TOML)
    #[arg(required = true)]
    pub manifest: PathBuf,
}

impl CheckArgs {
    /// Execute the check command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        ctx.output.banner("TIERCTL CHECK");

        let manifest = Manifest::load(&self.manifest)?;
        ctx.output.info(&format!(
            "Checking {} environment(s) of {}",
            manifest.environments.len(),
            manifest.project
        ));

        let checker = ManifestChecker::new(
            Arc::clone(&ctx.tiers),
            Arc::clone(&ctx.regions),
            ctx.defaults.clone(),
        );
        let report = checker.check(&manifest);

        if ctx.output.is_json() {
            print_json(ctx, &report);
        } else {
            print_human(ctx, &report);
        }

        Ok(report.exit_code())
    }
}

fn print_json(ctx: &CommandContext, report: &ManifestReport) {
    for env in &report.environments {
        ctx.output.json(&json!({
            "type": "environment",
            "environment": env,
        }));
    }
    ctx.output.json(&json!({
        "type": "summary",
        "project": report.project,
        "environments": report.environments.len(),
        "errors": report.error_count(),
        "violations": report.violation_count(),
        "passed": report.passed(),
    }));
}

fn print_human(ctx: &CommandContext, report: &ManifestReport) {
    for env in &report.environments {
        let title = match &env.name_prefix {
            Some(prefix) => format!("{} ({prefix})", env.label),
            None => env.label.clone(),
        };
        ctx.output.section(&title);
        ctx.output.field("account", &env.account);
        if let Some(description) = &env.description {
            ctx.output.field("description", description);
        }
        if let Some(cidr) = env.vpc_cidr {
            ctx.output.field("vpc_cidr", &cidr.to_string());
        }
        match &env.error {
            Some(error) => ctx.output.error(&format!("{}: {error}", env.label)),
            None if env.violations.is_empty() => ctx.output.field("policy", "passed"),
            None => ctx.output.violations(&env.violations),
        }
    }

    let summary = format!(
        "{} environment(s), {} error(s), {} policy violation(s) in {}",
        report.environments.len(),
        report.error_count(),
        report.violation_count(),
        ctx.output.elapsed()
    );
    if report.passed() {
        ctx.output.success(&summary);
    } else {
        ctx.output.failure(&summary);
    }
}

//! Validate command
//!
//! Resolves one environment and reports every policy violation.

use super::{CommandContext, EnvironmentArgs};
use anyhow::Result;
use clap::Parser;

/// Arguments for the validate command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub env: EnvironmentArgs,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        ctx.output.banner("TIERCTL VALIDATE");
        ctx.output.info(&format!(
            "Validating {} in {}/{}",
            self.env.project, self.env.region, self.env.tier
        ));

        let outcome = ctx.resolve(&self.env)?;
        ctx.report_outcome(&outcome);

        Ok(if outcome.passed() { 0 } else { 1 })
    }
}

//! Render command
//!
//! Emits a resolved configuration as JSON, YAML or tfvars. Nothing is
//! emitted when the configuration fails its tier policy.

use super::{CommandContext, EnvironmentArgs};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tierctl::render::{render, RenderFormat};

/// Render output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Pretty-printed JSON
    Json,
    /// YAML document
    Yaml,
    /// Terraform .tfvars file
    Tfvars,
}

impl From<FormatArg> for RenderFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => RenderFormat::Json,
            FormatArg::Yaml => RenderFormat::Yaml,
            FormatArg::Tfvars => RenderFormat::Tfvars,
        }
    }
}

/// Arguments for the render command
#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub env: EnvironmentArgs,

    /// Output format (defaults to the configured output_format)
    #[arg(short = 'f', long)]
    pub format: Option<FormatArg>,

    /// Write to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl RenderArgs {
    /// Execute the render command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let format = self
            .format
            .map_or(ctx.config.defaults.output_format, RenderFormat::from);

        let outcome = ctx.resolve(&self.env)?;
        if !outcome.passed() {
            ctx.output.error(&format!(
                "{} fails its tier policy, nothing rendered",
                outcome.config.name_prefix
            ));
            ctx.report_outcome(&outcome);
            return Ok(1);
        }

        let text = render(&outcome.config, format)?;
        match &self.out {
            Some(path) => {
                let implied = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(|e| e.parse::<RenderFormat>().ok());
                if implied.is_some_and(|implied| implied != format) {
                    ctx.output.warning(&format!(
                        "writing {format} output to {}",
                        path.display()
                    ));
                }
                std::fs::write(path, &text)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                ctx.output.info(&format!(
                    "Wrote {} {} to {}",
                    outcome.config.name_prefix,
                    format,
                    path.display()
                ));
            }
            None => {
                print!("{text}");
                ctx.output.flush();
            }
        }

        Ok(0)
    }
}

//! Regions command

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde_json::json;

/// Arguments for the regions command
#[derive(Parser, Debug, Clone)]
pub struct RegionsArgs {}

impl RegionsArgs {
    /// Execute the regions command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        if ctx.output.is_json() {
            for region in ctx.regions.iter() {
                ctx.output.json(&json!({
                    "type": "region",
                    "region": region,
                }));
            }
            return Ok(0);
        }

        ctx.output.banner("REGION CATALOG");
        let rows: Vec<Vec<String>> = ctx
            .regions
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    r.abbreviation.clone(),
                    r.az_count().to_string(),
                    r.azs.join(", "),
                ]
            })
            .collect();
        ctx.output
            .table(&["region", "abbreviation", "azs", "zones"], &rows);
        Ok(0)
    }
}

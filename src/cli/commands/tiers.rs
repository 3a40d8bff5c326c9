//! Tiers command
//!
//! Prints the compiled-in tier policies and defaults, followed by the
//! settings an override may change.

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tierctl::settings::{FieldKind, FIELDS, RESERVED_TAGS};
use tierctl::tier::TierProfile;

/// Key pattern for user tags, listed after the schema fields.
const TAG_KEY: &str = "tags.<key>";

/// Arguments for the tiers command
#[derive(Parser, Debug, Clone)]
pub struct TiersArgs {
    /// Show only this tier
    pub tier: Option<String>,
}

impl TiersArgs {
    /// Execute the tiers command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let profiles: Vec<&TierProfile> = match &self.tier {
            Some(name) => vec![ctx.tiers.resolve(name)?],
            None => ctx.tiers.iter().collect(),
        };

        if ctx.output.is_json() {
            for profile in &profiles {
                ctx.output.json(&json!({
                    "type": "tier",
                    "tier": profile.policy.tier,
                    "policy": profile.policy,
                    "defaults": profile.defaults,
                }));
            }
            if self.tier.is_none() {
                for (name, kind, description) in settings() {
                    ctx.output.json(&json!({
                        "type": "setting",
                        "name": name,
                        "kind": kind,
                        "description": description,
                    }));
                }
            }
            return Ok(0);
        }

        ctx.output.banner("TIER CATALOG");
        let headers: Vec<&str> = std::iter::once("setting")
            .chain(profiles.iter().map(|p| p.policy.tier.as_str()))
            .collect();

        let policy_rows = vec![
            row(&profiles, "min az count", |p| p.policy.min_az_count.to_string()),
            row(&profiles, "multi-AZ required", |p| yes_no(p.policy.multi_az_required)),
            row(&profiles, "deletion protection", |p| {
                yes_no(p.policy.deletion_protection_required)
            }),
            row(&profiles, "min backup retention", |p| {
                format!("{}d", p.policy.min_backup_retention_days)
            }),
            row(&profiles, "min log retention", |p| {
                format!("{}d", p.policy.min_log_retention_days)
            }),
            row(&profiles, "WAF required", |p| p.policy.waf.to_string()),
            row(&profiles, "storage encryption", |p| {
                yes_no(p.policy.storage_encryption_required)
            }),
            row(&profiles, "max monitoring interval", |p| {
                p.policy
                    .max_monitoring_interval
                    .map_or_else(|| "-".to_string(), |s| format!("{s}s"))
            }),
        ];
        ctx.output.section("Policy");
        ctx.output.table(&headers, &policy_rows);

        let default_rows = vec![
            row(&profiles, "az_count", |p| p.defaults.az_count.to_string()),
            row(&profiles, "multi_az", |p| p.defaults.multi_az.to_string()),
            row(&profiles, "deletion_protection", |p| {
                p.defaults.deletion_protection.to_string()
            }),
            row(&profiles, "backup_retention_days", |p| {
                p.defaults.backup_retention_days.to_string()
            }),
            row(&profiles, "log_retention_days", |p| {
                p.defaults.log_retention_days.to_string()
            }),
            row(&profiles, "monitoring_interval", |p| {
                p.defaults.monitoring_interval.to_string()
            }),
            row(&profiles, "enable_waf", |p| p.defaults.enable_waf.to_string()),
            row(&profiles, "public_ingress", |p| p.defaults.public_ingress.to_string()),
            row(&profiles, "enable_nat_gateway", |p| {
                p.defaults.enable_nat_gateway.to_string()
            }),
            row(&profiles, "single_nat_gateway", |p| {
                p.defaults.single_nat_gateway.to_string()
            }),
            row(&profiles, "storage_encrypted", |p| p.defaults.storage_encrypted.to_string()),
            row(&profiles, "enable_flow_logs", |p| p.defaults.enable_flow_logs.to_string()),
            row(&profiles, "performance_insights", |p| {
                p.defaults.performance_insights.to_string()
            }),
            row(&profiles, "db_instance_class", |p| p.defaults.db_instance_class.clone()),
            row(&profiles, "allocated_storage", |p| p.defaults.allocated_storage.to_string()),
        ];
        ctx.output.section("Defaults");
        ctx.output.table(&headers, &default_rows);

        if self.tier.is_none() {
            let setting_rows: Vec<Vec<String>> = settings()
                .map(|(name, kind, description)| {
                    vec![name.to_string(), kind.to_string(), description]
                })
                .collect();
            ctx.output.section("Overridable settings");
            ctx.output.table(&["setting", "type", "description"], &setting_rows);
        }

        Ok(0)
    }
}

fn row(profiles: &[&TierProfile], label: &str, value: fn(&TierProfile) -> String) -> Vec<String> {
    std::iter::once(label.to_string())
        .chain(profiles.iter().map(|p| value(p)))
        .collect()
}

fn yes_no(value: bool) -> String {
    (if value { "yes" } else { "no" }).to_string()
}

/// The override schema plus the user tag pattern.
fn settings() -> impl Iterator<Item = (&'static str, &'static str, String)> {
    let tags = format!("User tag (not {})", RESERVED_TAGS.join(", "));
    FIELDS
        .iter()
        .map(|f| (f.name, f.kind.as_str(), f.description.to_string()))
        .chain(std::iter::once((TAG_KEY, FieldKind::Str.as_str(), tags)))
}

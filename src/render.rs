//! Serialization of resolved configurations.
//!
//! JSON and YAML mirror [`ResolvedConfig`] directly. The `tfvars` form is a
//! flat variable file shaped for the VPC, RDS and ALB modules that consume
//! it. Every format is deterministic: maps are sorted and lists keep
//! allocation order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::cidr::SubnetRole;
use crate::error::{Error, Result};
use crate::synth::ResolvedConfig;

/// Output formats for `render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML document
    Yaml,
    /// Terraform variable definitions
    Tfvars,
}

impl RenderFormat {
    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            RenderFormat::Json => "json",
            RenderFormat::Yaml => "yaml",
            RenderFormat::Tfvars => "tfvars",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RenderFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(RenderFormat::Json),
            "yaml" | "yml" => Ok(RenderFormat::Yaml),
            "tfvars" | "hcl" => Ok(RenderFormat::Tfvars),
            other => Err(Error::invalid_value(
                "format",
                format!("'{other}' is not one of json, yaml, tfvars"),
            )),
        }
    }
}

/// Render `config` in `format`, always ending with a newline.
pub fn render(config: &ResolvedConfig, format: RenderFormat) -> Result<String> {
    let mut out = match format {
        RenderFormat::Json => serde_json::to_string_pretty(config)?,
        RenderFormat::Yaml => serde_yaml::to_string(config)?,
        RenderFormat::Tfvars => to_tfvars(config),
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Flat variable map handed to Terraform.
pub fn tfvars_variables(config: &ResolvedConfig) -> IndexMap<String, Value> {
    let mut vars = IndexMap::new();
    let network = &config.network;
    let settings = &config.settings;

    vars.insert("project".into(), json!(config.project));
    vars.insert("environment".into(), json!(config.environment));
    vars.insert("region".into(), json!(config.region));
    vars.insert("name_prefix".into(), json!(config.name_prefix));

    vars.insert("vpc_cidr".into(), json!(network.vpc_cidr.to_string()));
    vars.insert("azs".into(), json!(network.azs));
    for role in SubnetRole::ALL {
        let cidrs: Vec<String> = network
            .subnets(role)
            .iter()
            .map(|s| s.cidr.to_string())
            .collect();
        vars.insert(format!("{role}_subnets"), json!(cidrs));
    }
    vars.insert("enable_nat_gateway".into(), json!(settings.enable_nat_gateway));
    vars.insert("single_nat_gateway".into(), json!(settings.single_nat_gateway));
    vars.insert("enable_flow_logs".into(), json!(settings.enable_flow_logs));

    vars.insert("db_instance_class".into(), json!(settings.db_instance_class));
    vars.insert("allocated_storage".into(), json!(settings.allocated_storage));
    vars.insert("multi_az".into(), json!(settings.multi_az));
    vars.insert("storage_encrypted".into(), json!(settings.storage_encrypted));
    vars.insert("deletion_protection".into(), json!(settings.deletion_protection));
    vars.insert(
        "backup_retention_period".into(),
        json!(settings.backup_retention_days),
    );
    vars.insert("monitoring_interval".into(), json!(settings.monitoring_interval));
    vars.insert(
        "performance_insights_enabled".into(),
        json!(settings.performance_insights),
    );

    vars.insert("internal".into(), json!(!settings.public_ingress));
    vars.insert("enable_waf".into(), json!(settings.enable_waf));
    vars.insert("log_retention_days".into(), json!(settings.log_retention_days));

    vars.insert("resource_names".into(), json!(config.names));
    vars.insert("tags".into(), json!(config.tags));
    vars
}

fn to_tfvars(config: &ResolvedConfig) -> String {
    let vars = tfvars_variables(config);
    let width = vars.keys().map(String::len).max().unwrap_or(0);
    let mut out = format!(
        "# {} ({}/{})\n\n",
        config.name_prefix, config.region, config.environment
    );
    for (key, value) in &vars {
        let _ = writeln!(out, "{key:<width$} = {}", hcl_value(value, 0));
    }
    out
}

fn hcl_value(value: &Value, indent: usize) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => hcl_string(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(|v| hcl_value(v, indent)).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) if map.is_empty() => "{}".to_string(),
        Value::Object(map) => {
            let pad = "  ".repeat(indent + 1);
            let keys: Vec<String> = map.keys().map(|k| hcl_key(k)).collect();
            let width = keys.iter().map(String::len).max().unwrap_or(0);
            let mut out = String::from("{\n");
            for (key, v) in keys.iter().zip(map.values()) {
                let _ = writeln!(out, "{pad}{key:<width$} = {}", hcl_value(v, indent + 1));
            }
            out.push_str(&"  ".repeat(indent));
            out.push('}');
            out
        }
    }
}

fn hcl_key(key: &str) -> String {
    let bare = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare {
        key.to_string()
    } else {
        hcl_string(key)
    }
}

fn hcl_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    // Terraform would otherwise read these as template sequences
    out.replace("${", "$${").replace("%{", "%%{")
}

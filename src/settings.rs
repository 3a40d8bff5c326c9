//! Typed settings and the override schema.
//!
//! Overrides arrive as loosely typed key/value pairs (`--override k=v` or a
//! YAML map). They are checked against [`FIELDS`] and converted into an
//! [`Overrides`] struct; nothing untyped reaches the synthesizer.

use indexmap::IndexMap;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Tag keys the synthesizer always sets itself.
pub const RESERVED_TAGS: &[&str] = &["Project", "Environment", "Region", "ManagedBy"];

/// Prefix for user tag overrides (`tags.Owner=platform`).
pub const TAG_PREFIX: &str = "tags.";

/// CloudWatch Logs accepted retention periods.
pub const LOG_RETENTION_DAYS: &[u32] = &[
    1, 3, 5, 7, 14, 30, 60, 90, 120, 150, 180, 365, 400, 545, 731, 1096, 1827, 2192, 2557, 2922,
    3288, 3653,
];

/// RDS enhanced monitoring accepted intervals (0 disables).
pub const MONITORING_INTERVALS: &[u32] = &[0, 1, 5, 10, 15, 30, 60];

/// Longest automated backup retention RDS supports.
pub const MAX_BACKUP_RETENTION_DAYS: u32 = 35;

/// Most availability zones a single environment may span.
pub const MAX_AZ_COUNT: u8 = 6;

/// Resolved policy-relevant values for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of availability zones to span
    pub az_count: u8,
    /// Deploy the database multi-AZ
    pub multi_az: bool,
    /// Enable deletion protection on stateful resources
    pub deletion_protection: bool,
    /// Automated backup retention in days
    pub backup_retention_days: u32,
    /// CloudWatch log retention in days
    pub log_retention_days: u32,
    /// RDS enhanced monitoring interval in seconds (0 disables)
    pub monitoring_interval: u32,
    /// Attach a WAF web ACL to the load balancer
    pub enable_waf: bool,
    /// Load balancer is internet-facing
    pub public_ingress: bool,
    /// Provision NAT gateways for private subnets
    pub enable_nat_gateway: bool,
    /// Share one NAT gateway across all AZs
    pub single_nat_gateway: bool,
    /// Encrypt database storage at rest
    pub storage_encrypted: bool,
    /// Ship VPC flow logs
    pub enable_flow_logs: bool,
    /// Enable RDS performance insights
    pub performance_insights: bool,
    /// RDS instance class
    pub db_instance_class: String,
    /// RDS allocated storage in GiB
    pub allocated_storage: u32,
}

/// Value type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `true` / `false`
    Bool,
    /// Non-negative integer
    Int,
    /// Free-form string
    Str,
}

impl FieldKind {
    /// Human-readable type name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "boolean",
            FieldKind::Int => "integer",
            FieldKind::Str => "string",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One overridable field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Override key
    pub name: &'static str,
    /// Expected value type
    pub kind: FieldKind,
    /// Short description
    pub description: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, description: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        description,
    }
}

/// The declared override schema.
pub const FIELDS: &[FieldSpec] = &[
    field("vpc_cidr", FieldKind::Str, "VPC CIDR block"),
    field("subnet_prefix", FieldKind::Int, "Subnet prefix length"),
    field("az_count", FieldKind::Int, "Availability zones to span"),
    field("multi_az", FieldKind::Bool, "Multi-AZ database"),
    field("deletion_protection", FieldKind::Bool, "Deletion protection"),
    field("backup_retention_days", FieldKind::Int, "Backup retention in days"),
    field("log_retention_days", FieldKind::Int, "Log retention in days"),
    field("monitoring_interval", FieldKind::Int, "Enhanced monitoring interval in seconds"),
    field("enable_waf", FieldKind::Bool, "Attach a WAF to the load balancer"),
    field("public_ingress", FieldKind::Bool, "Internet-facing load balancer"),
    field("enable_nat_gateway", FieldKind::Bool, "NAT gateways for private subnets"),
    field("single_nat_gateway", FieldKind::Bool, "Share a single NAT gateway"),
    field("storage_encrypted", FieldKind::Bool, "Encrypt database storage"),
    field("enable_flow_logs", FieldKind::Bool, "VPC flow logs"),
    field("performance_insights", FieldKind::Bool, "RDS performance insights"),
    field("db_instance_class", FieldKind::Str, "RDS instance class"),
    field("allocated_storage", FieldKind::Int, "RDS storage in GiB"),
];

/// Look up a schema field by name.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Validated, typed overrides. `None` means "keep the tier default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// VPC CIDR block
    pub vpc_cidr: Option<Ipv4Net>,
    /// Explicit subnet prefix length
    pub subnet_prefix: Option<u8>,
    /// Availability zones to span
    pub az_count: Option<u8>,
    /// Multi-AZ database
    pub multi_az: Option<bool>,
    /// Deletion protection
    pub deletion_protection: Option<bool>,
    /// Backup retention in days
    pub backup_retention_days: Option<u32>,
    /// Log retention in days
    pub log_retention_days: Option<u32>,
    /// Enhanced monitoring interval
    pub monitoring_interval: Option<u32>,
    /// WAF attachment
    pub enable_waf: Option<bool>,
    /// Internet-facing load balancer
    pub public_ingress: Option<bool>,
    /// NAT gateways
    pub enable_nat_gateway: Option<bool>,
    /// Single shared NAT gateway
    pub single_nat_gateway: Option<bool>,
    /// Storage encryption
    pub storage_encrypted: Option<bool>,
    /// Flow logs
    pub enable_flow_logs: Option<bool>,
    /// Performance insights
    pub performance_insights: Option<bool>,
    /// RDS instance class
    pub db_instance_class: Option<String>,
    /// RDS storage
    pub allocated_storage: Option<u32>,
    /// User tags
    pub tags: BTreeMap<String, String>,
}

impl Overrides {
    /// Build typed overrides from a raw key/value map.
    ///
    /// Fails on the first unknown key, type mismatch or out-of-domain value.
    pub fn from_values(values: &IndexMap<String, Value>) -> Result<Self> {
        let mut overrides = Overrides::default();
        for (key, value) in values {
            overrides.set(key, value)?;
        }
        Ok(overrides)
    }

    /// Build typed overrides from `key=value` assignments.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = IndexMap::new();
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment.as_ref())?;
            values.insert(key, value);
        }
        Self::from_values(&values)
    }

    /// Whether nothing is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Overrides::default()
    }

    /// Apply one raw override.
    pub fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        if let Some(tag) = key.strip_prefix(TAG_PREFIX) {
            return self.set_tag(key, tag, value);
        }

        let spec = field_spec(key).ok_or_else(|| Error::UnknownField {
            field: key.to_string(),
            suggestion: suggest_field(key).map(String::from),
        })?;

        match spec.name {
            "vpc_cidr" => {
                let raw = expect_str(spec, value)?;
                let net: Ipv4Net = raw
                    .parse()
                    .map_err(|_| Error::invalid_value(key, format!("'{raw}' is not an IPv4 CIDR")))?;
                if net.network() != net.addr() {
                    return Err(Error::invalid_value(
                        key,
                        format!("'{raw}' has host bits set (did you mean {}?)", net.trunc()),
                    ));
                }
                self.vpc_cidr = Some(net);
            }
            "subnet_prefix" => {
                let prefix = expect_int(spec, value)?;
                if !(16..=28).contains(&prefix) {
                    return Err(Error::invalid_value(key, "must be between 16 and 28"));
                }
                self.subnet_prefix = Some(prefix as u8);
            }
            "az_count" => {
                let count = expect_int(spec, value)?;
                if count == 0 || count > u64::from(MAX_AZ_COUNT) {
                    return Err(Error::invalid_value(
                        key,
                        format!("must be between 1 and {MAX_AZ_COUNT}"),
                    ));
                }
                self.az_count = Some(count as u8);
            }
            "backup_retention_days" => {
                let days = expect_u32(spec, value)?;
                if days > MAX_BACKUP_RETENTION_DAYS {
                    return Err(Error::invalid_value(
                        key,
                        format!("RDS supports at most {MAX_BACKUP_RETENTION_DAYS} days"),
                    ));
                }
                self.backup_retention_days = Some(days);
            }
            "log_retention_days" => {
                let days = expect_u32(spec, value)?;
                if !LOG_RETENTION_DAYS.contains(&days) {
                    return Err(Error::invalid_value(
                        key,
                        format!("{days} is not a CloudWatch Logs retention period"),
                    ));
                }
                self.log_retention_days = Some(days);
            }
            "monitoring_interval" => {
                let secs = expect_u32(spec, value)?;
                if !MONITORING_INTERVALS.contains(&secs) {
                    return Err(Error::invalid_value(
                        key,
                        format!("must be one of {MONITORING_INTERVALS:?}"),
                    ));
                }
                self.monitoring_interval = Some(secs);
            }
            "allocated_storage" => {
                let gib = expect_u32(spec, value)?;
                if !(20..=65536).contains(&gib) {
                    return Err(Error::invalid_value(key, "must be between 20 and 65536 GiB"));
                }
                self.allocated_storage = Some(gib);
            }
            "db_instance_class" => {
                let class = expect_str(spec, value)?;
                if !class.starts_with("db.") || class.len() <= 3 {
                    return Err(Error::invalid_value(
                        key,
                        format!("'{class}' is not an RDS instance class"),
                    ));
                }
                self.db_instance_class = Some(class.to_string());
            }
            "multi_az" => self.multi_az = Some(expect_bool(spec, value)?),
            "deletion_protection" => self.deletion_protection = Some(expect_bool(spec, value)?),
            "enable_waf" => self.enable_waf = Some(expect_bool(spec, value)?),
            "public_ingress" => self.public_ingress = Some(expect_bool(spec, value)?),
            "enable_nat_gateway" => self.enable_nat_gateway = Some(expect_bool(spec, value)?),
            "single_nat_gateway" => self.single_nat_gateway = Some(expect_bool(spec, value)?),
            "storage_encrypted" => self.storage_encrypted = Some(expect_bool(spec, value)?),
            "enable_flow_logs" => self.enable_flow_logs = Some(expect_bool(spec, value)?),
            "performance_insights" => self.performance_insights = Some(expect_bool(spec, value)?),
            other => {
                return Err(Error::UnknownField {
                    field: other.to_string(),
                    suggestion: None,
                })
            }
        }
        Ok(())
    }

    fn set_tag(&mut self, key: &str, tag: &str, value: &Value) -> Result<()> {
        if tag.is_empty() {
            return Err(Error::invalid_value(key, "tag key cannot be empty"));
        }
        if RESERVED_TAGS.contains(&tag) {
            return Err(Error::invalid_value(
                key,
                format!("'{tag}' is set automatically and cannot be overridden"),
            ));
        }
        let text = match value {
            Value::String(s) => s.clone(),
            other => {
                return Err(Error::TypeMismatch {
                    field: key.to_string(),
                    expected: FieldKind::Str.as_str(),
                    actual: value_type(other).to_string(),
                })
            }
        };
        self.tags.insert(tag.to_string(), text);
        Ok(())
    }

    /// Overlay these overrides on `base`, returning the merged settings.
    pub fn apply(&self, base: &Settings) -> Settings {
        Settings {
            az_count: self.az_count.unwrap_or(base.az_count),
            multi_az: self.multi_az.unwrap_or(base.multi_az),
            deletion_protection: self.deletion_protection.unwrap_or(base.deletion_protection),
            backup_retention_days: self
                .backup_retention_days
                .unwrap_or(base.backup_retention_days),
            log_retention_days: self.log_retention_days.unwrap_or(base.log_retention_days),
            monitoring_interval: self.monitoring_interval.unwrap_or(base.monitoring_interval),
            enable_waf: self.enable_waf.unwrap_or(base.enable_waf),
            public_ingress: self.public_ingress.unwrap_or(base.public_ingress),
            enable_nat_gateway: self.enable_nat_gateway.unwrap_or(base.enable_nat_gateway),
            single_nat_gateway: self.single_nat_gateway.unwrap_or(base.single_nat_gateway),
            storage_encrypted: self.storage_encrypted.unwrap_or(base.storage_encrypted),
            enable_flow_logs: self.enable_flow_logs.unwrap_or(base.enable_flow_logs),
            performance_insights: self
                .performance_insights
                .unwrap_or(base.performance_insights),
            db_instance_class: self
                .db_instance_class
                .clone()
                .unwrap_or_else(|| base.db_instance_class.clone()),
            allocated_storage: self.allocated_storage.unwrap_or(base.allocated_storage),
        }
    }
}

/// Split `key=value`, parsing the value as a YAML scalar.
///
/// `multi_az=false` yields a boolean, `az_count=3` an integer, and anything
/// that does not parse as YAML is kept as a plain string. String fields and
/// tags take the text as written, so `tags.CostCenter=1234` stays `"1234"`.
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment.split_once('=').ok_or_else(|| {
        Error::invalid_value(assignment, "override must have the form key=value")
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::invalid_value(assignment, "override key cannot be empty"));
    }
    if takes_text(key) {
        return Ok((key.to_string(), Value::String(raw.trim().to_string())));
    }
    let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    // An empty right-hand side parses as null; treat it as an empty string instead.
    let value = if value.is_null() && raw.trim().is_empty() {
        Value::String(String::new())
    } else {
        value
    };
    Ok((key.to_string(), value))
}

fn takes_text(key: &str) -> bool {
    key.starts_with(TAG_PREFIX) || field_spec(key).is_some_and(|f| f.kind == FieldKind::Str)
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(n) if n.is_i64() && n.as_i64().is_some_and(|i| i < 0) => "negative integer",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn mismatch(spec: &FieldSpec, value: &Value) -> Error {
    Error::TypeMismatch {
        field: spec.name.to_string(),
        expected: spec.kind.as_str(),
        actual: value_type(value).to_string(),
    }
}

fn expect_bool(spec: &FieldSpec, value: &Value) -> Result<bool> {
    value.as_bool().ok_or_else(|| mismatch(spec, value))
}

fn expect_int(spec: &FieldSpec, value: &Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| mismatch(spec, value))
}

fn expect_u32(spec: &FieldSpec, value: &Value) -> Result<u32> {
    let n = expect_int(spec, value)?;
    u32::try_from(n).map_err(|_| Error::invalid_value(spec.name, format!("{n} is too large")))
}

fn expect_str<'a>(spec: &FieldSpec, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| mismatch(spec, value))
}

/// Closest schema field to a misspelled key.
pub fn suggest_field(key: &str) -> Option<&'static str> {
    let key_lower = key.to_lowercase();
    let mut best_match: Option<(&'static str, usize)> = None;

    for spec in FIELDS {
        let distance = levenshtein_distance(&key_lower, spec.name);
        if distance <= 2 && distance < key.len() / 2 + 1 {
            match best_match {
                None => best_match = Some((spec.name, distance)),
                Some((_, best_dist)) if distance < best_dist => {
                    best_match = Some((spec.name, distance));
                }
                _ => {}
            }
        }
    }

    best_match.map(|(s, _)| s)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

//! Deterministic resource naming.
//!
//! Every name derives from `{project}-{environment}-{region_abbr}` plus a
//! per-resource suffix. Names are pure functions of their inputs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cidr::SubnetRole;
use crate::error::{Error, Result};
use crate::region::abbreviate;
use crate::tier::Tier;

/// Longest accepted project identifier.
pub const MAX_PROJECT_LEN: usize = 32;

/// Cached regex for project identifiers.
static PROJECT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*[a-z0-9]$").expect("Invalid project regex"));

/// Named resources an environment provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// VPC
    Vpc,
    /// Internet gateway
    InternetGateway,
    /// NAT gateway
    NatGateway,
    /// Application load balancer
    Alb,
    /// ALB target group
    TargetGroup,
    /// Load balancer security group
    AlbSecurityGroup,
    /// Application security group
    AppSecurityGroup,
    /// Database security group
    DbSecurityGroup,
    /// RDS instance
    Rds,
    /// RDS subnet group
    DbSubnetGroup,
    /// WAF web ACL
    Waf,
    /// Application log group
    LogGroup,
    /// VPC flow log group
    FlowLogs,
}

impl ResourceKind {
    /// Every kind, in output order.
    pub const ALL: [ResourceKind; 13] = [
        ResourceKind::Vpc,
        ResourceKind::InternetGateway,
        ResourceKind::NatGateway,
        ResourceKind::Alb,
        ResourceKind::TargetGroup,
        ResourceKind::AlbSecurityGroup,
        ResourceKind::AppSecurityGroup,
        ResourceKind::DbSecurityGroup,
        ResourceKind::Rds,
        ResourceKind::DbSubnetGroup,
        ResourceKind::Waf,
        ResourceKind::LogGroup,
        ResourceKind::FlowLogs,
    ];

    /// Suffix appended to the name prefix.
    pub fn suffix(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::InternetGateway => "igw",
            ResourceKind::NatGateway => "nat",
            ResourceKind::Alb => "alb",
            ResourceKind::TargetGroup => "tg",
            ResourceKind::AlbSecurityGroup => "alb-sg",
            ResourceKind::AppSecurityGroup => "app-sg",
            ResourceKind::DbSecurityGroup => "db-sg",
            ResourceKind::Rds => "rds",
            ResourceKind::DbSubnetGroup => "db-subnets",
            ResourceKind::Waf => "waf",
            ResourceKind::LogGroup => "logs",
            ResourceKind::FlowLogs => "flow-logs",
        }
    }

    /// Provider limit on the name length, if any.
    pub fn max_len(&self) -> Option<usize> {
        match self {
            ResourceKind::Alb | ResourceKind::TargetGroup => Some(32),
            ResourceKind::Rds => Some(63),
            ResourceKind::Waf => Some(128),
            ResourceKind::DbSubnetGroup | ResourceKind::LogGroup | ResourceKind::FlowLogs => {
                Some(255)
            }
            _ => None,
        }
    }

    /// Key used in the resolved configuration's name map.
    pub fn key(&self) -> &'static str {
        match self {
            ResourceKind::Vpc => "vpc",
            ResourceKind::InternetGateway => "internet_gateway",
            ResourceKind::NatGateway => "nat_gateway",
            ResourceKind::Alb => "alb",
            ResourceKind::TargetGroup => "target_group",
            ResourceKind::AlbSecurityGroup => "alb_security_group",
            ResourceKind::AppSecurityGroup => "app_security_group",
            ResourceKind::DbSecurityGroup => "db_security_group",
            ResourceKind::Rds => "rds",
            ResourceKind::DbSubnetGroup => "db_subnet_group",
            ResourceKind::Waf => "waf",
            ResourceKind::LogGroup => "log_group",
            ResourceKind::FlowLogs => "flow_logs",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reject project identifiers that would produce invalid resource names.
pub fn validate_project(project: &str) -> Result<()> {
    if project.len() > MAX_PROJECT_LEN {
        return Err(Error::invalid_project_name(
            project,
            format!("must be at most {MAX_PROJECT_LEN} characters"),
        ));
    }
    if !PROJECT_REGEX.is_match(project) {
        return Err(Error::invalid_project_name(
            project,
            "must start with a lowercase letter, contain only lowercase letters, digits and hyphens, and not end with a hyphen",
        ));
    }
    Ok(())
}

/// Names for one (project, environment, region) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameResolver {
    prefix: String,
}

impl NameResolver {
    /// Validate inputs and build the name prefix.
    pub fn new(project: &str, environment: Tier, region: &str) -> Result<Self> {
        let abbr = abbreviate(region)?;
        Self::with_abbreviation(project, environment, &abbr)
    }

    /// Build the prefix from an already known region abbreviation.
    pub fn with_abbreviation(project: &str, environment: Tier, region_abbr: &str) -> Result<Self> {
        validate_project(project)?;
        Ok(Self {
            prefix: format!("{project}-{environment}-{region_abbr}"),
        })
    }

    /// `{project}-{environment}-{region_abbr}`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Name for one resource, checked against the provider's length limit.
    pub fn resource(&self, kind: ResourceKind) -> Result<String> {
        let name = format!("{}-{}", self.prefix, kind.suffix());
        match kind.max_len() {
            Some(limit) if name.len() > limit => Err(Error::NameTooLong {
                len: name.len(),
                name,
                kind: kind.key().to_string(),
                limit,
            }),
            _ => Ok(name),
        }
    }

    /// Names for every resource kind, keyed by [`ResourceKind::key`].
    pub fn all(&self) -> Result<BTreeMap<String, String>> {
        ResourceKind::ALL
            .iter()
            .map(|kind| -> Result<(String, String)> {
                Ok((kind.key().to_string(), self.resource(*kind)?))
            })
            .collect()
    }

    /// Subnet name: `{prefix}-{role}-{az}`.
    pub fn subnet(&self, role: SubnetRole, az: &str) -> String {
        format!("{}-{}-{}", self.prefix, role, az)
    }
}

/// Convenience wrapper returning only the prefix.
pub fn name_prefix(project: &str, environment: Tier, region: &str) -> Result<String> {
    NameResolver::new(project, environment, region).map(|r| r.prefix)
}

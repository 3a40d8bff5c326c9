//! Environment tier catalog.
//!
//! Tier policies are compiled in. They are not read from the tool
//! configuration, so a typo in a config file can never weaken what `prod`
//! demands. The catalog is built once at startup and handed to the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Environment classification driving policy strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Development
    Dev,
    /// Pre-production
    Staging,
    /// Production
    Prod,
}

impl Tier {
    /// All tiers, least strict first.
    pub const ALL: [Tier; 3] = [Tier::Dev, Tier::Staging, Tier::Prod];

    /// Canonical short name used in resource names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Dev => "dev",
            Tier::Staging => "staging",
            Tier::Prod => "prod",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Tier::Dev),
            "staging" | "stage" => Ok(Tier::Staging),
            "prod" | "production" => Ok(Tier::Prod),
            _ => Err(Error::UnknownTier(s.to_string())),
        }
    }
}

/// When a tier demands a web application firewall in front of the load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WafRequirement {
    /// WAF is optional
    Never,
    /// WAF is required when the load balancer accepts public traffic
    PublicIngress,
    /// WAF is always required
    Always,
}

impl WafRequirement {
    /// Whether a configuration with the given ingress exposure needs a WAF.
    pub fn applies(&self, public_ingress: bool) -> bool {
        match self {
            WafRequirement::Never => false,
            WafRequirement::PublicIngress => public_ingress,
            WafRequirement::Always => true,
        }
    }
}

impl fmt::Display for WafRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WafRequirement::Never => write!(f, "never"),
            WafRequirement::PublicIngress => write!(f, "with public ingress"),
            WafRequirement::Always => write!(f, "always"),
        }
    }
}

/// Minimums and requirements a tier imposes on a resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    /// Tier this policy belongs to
    pub tier: Tier,
    /// Minimum number of availability zones
    pub min_az_count: u8,
    /// Database must be deployed multi-AZ
    pub multi_az_required: bool,
    /// Database and load balancer must have deletion protection
    pub deletion_protection_required: bool,
    /// Minimum automated backup retention in days
    pub min_backup_retention_days: u32,
    /// Minimum CloudWatch log retention in days
    pub min_log_retention_days: u32,
    /// When a WAF is required
    pub waf: WafRequirement,
    /// Storage must be encrypted at rest
    pub storage_encryption_required: bool,
    /// Longest allowed enhanced monitoring interval in seconds (`None` = unmonitored is fine)
    pub max_monitoring_interval: Option<u32>,
}

/// A tier's policy together with the defaults synthesis starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProfile {
    /// Validation policy
    pub policy: TierPolicy,
    /// Default settings
    pub defaults: Settings,
}

/// Immutable registry of tier profiles.
#[derive(Debug, Clone)]
pub struct TierCatalog {
    profiles: Vec<TierProfile>,
}

impl TierCatalog {
    /// Build the compiled-in catalog.
    pub fn builtin() -> Self {
        Self {
            profiles: vec![dev_profile(), staging_profile(), prod_profile()],
        }
    }

    /// Look up the policy for a tier.
    pub fn lookup(&self, tier: Tier) -> Result<&TierPolicy> {
        self.profile(tier).map(|p| &p.policy)
    }

    /// Look up the default settings for a tier.
    pub fn defaults(&self, tier: Tier) -> Result<&Settings> {
        self.profile(tier).map(|p| &p.defaults)
    }

    /// Look up the full profile for a tier.
    pub fn profile(&self, tier: Tier) -> Result<&TierProfile> {
        self.profiles
            .iter()
            .find(|p| p.policy.tier == tier)
            .ok_or_else(|| Error::UnknownTier(tier.to_string()))
    }

    /// Parse a tier name and look up its profile in one step.
    pub fn resolve(&self, name: &str) -> Result<&TierProfile> {
        let tier: Tier = name.parse()?;
        self.profile(tier)
    }

    /// Iterate profiles, least strict first.
    pub fn iter(&self) -> impl Iterator<Item = &TierProfile> {
        self.profiles.iter()
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn dev_profile() -> TierProfile {
    TierProfile {
        policy: TierPolicy {
            tier: Tier::Dev,
            min_az_count: 1,
            multi_az_required: false,
            deletion_protection_required: false,
            min_backup_retention_days: 1,
            min_log_retention_days: 7,
            waf: WafRequirement::Never,
            storage_encryption_required: false,
            max_monitoring_interval: None,
        },
        defaults: Settings {
            az_count: 2,
            multi_az: false,
            deletion_protection: false,
            backup_retention_days: 1,
            log_retention_days: 7,
            monitoring_interval: 0,
            enable_waf: false,
            public_ingress: true,
            enable_nat_gateway: true,
            single_nat_gateway: true,
            storage_encrypted: true,
            enable_flow_logs: false,
            performance_insights: false,
            db_instance_class: "db.t3.micro".to_string(),
            allocated_storage: 20,
        },
    }
}

fn staging_profile() -> TierProfile {
    TierProfile {
        policy: TierPolicy {
            tier: Tier::Staging,
            min_az_count: 2,
            multi_az_required: false,
            deletion_protection_required: false,
            min_backup_retention_days: 7,
            min_log_retention_days: 30,
            waf: WafRequirement::PublicIngress,
            storage_encryption_required: true,
            max_monitoring_interval: Some(60),
        },
        defaults: Settings {
            az_count: 2,
            multi_az: false,
            deletion_protection: false,
            backup_retention_days: 7,
            log_retention_days: 30,
            monitoring_interval: 60,
            enable_waf: true,
            public_ingress: true,
            enable_nat_gateway: true,
            single_nat_gateway: true,
            storage_encrypted: true,
            enable_flow_logs: true,
            performance_insights: false,
            db_instance_class: "db.t3.small".to_string(),
            allocated_storage: 50,
        },
    }
}

fn prod_profile() -> TierProfile {
    TierProfile {
        policy: TierPolicy {
            tier: Tier::Prod,
            min_az_count: 2,
            multi_az_required: true,
            deletion_protection_required: true,
            min_backup_retention_days: 30,
            min_log_retention_days: 90,
            waf: WafRequirement::Always,
            storage_encryption_required: true,
            max_monitoring_interval: Some(30),
        },
        defaults: Settings {
            az_count: 3,
            multi_az: true,
            deletion_protection: true,
            backup_retention_days: 30,
            log_retention_days: 90,
            monitoring_interval: 30,
            enable_waf: true,
            public_ingress: true,
            enable_nat_gateway: true,
            single_nat_gateway: false,
            storage_encrypted: true,
            enable_flow_logs: true,
            performance_insights: true,
            db_instance_class: "db.r6g.large".to_string(),
            allocated_storage: 100,
        },
    }
}

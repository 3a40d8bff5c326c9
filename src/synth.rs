//! Configuration synthesis.
//!
//! Tier defaults are overlaid with typed overrides and combined with the
//! network allocation, resource names and tags into a [`ResolvedConfig`].
//! Synthesis enforces the absolute schema only; tier policy is the
//! validator's job.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::cidr::{NetworkAllocation, SubnetCounts, SubnetRequest};
use crate::error::{Error, Result};
use crate::naming::NameResolver;
use crate::region::RegionProfile;
use crate::settings::{Overrides, Settings};
use crate::tier::{Tier, TierCatalog};

/// Value of the `ManagedBy` tag.
pub const MANAGED_BY: &str = "terraform";

/// The merged output for one (project, environment, region) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Project identifier
    pub project: String,
    /// Environment tier
    pub environment: Tier,
    /// Region identifier
    pub region: String,
    /// Region abbreviation used in names
    pub region_abbr: String,
    /// `{project}-{environment}-{region_abbr}`
    pub name_prefix: String,
    /// Resource names keyed by resource kind
    pub names: BTreeMap<String, String>,
    /// Subnet names in allocation order
    pub subnet_names: Vec<String>,
    /// Tags applied to every resource
    pub tags: BTreeMap<String, String>,
    /// VPC block and subnets
    pub network: NetworkAllocation,
    /// Policy-relevant settings
    pub settings: Settings,
}

/// Merges tier defaults with overrides.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    tiers: &'a TierCatalog,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer over an injected tier catalog.
    pub fn new(tiers: &'a TierCatalog) -> Self {
        Self { tiers }
    }

    /// Tier defaults with `overrides` applied.
    ///
    /// An explicit `az_count` above what the region offers is an error; a
    /// tier default above it is clamped with a warning.
    pub fn settings(
        &self,
        tier: Tier,
        overrides: &Overrides,
        region: &RegionProfile,
    ) -> Result<Settings> {
        let defaults = self.tiers.defaults(tier)?;
        let mut settings = overrides.apply(defaults);
        let available = u8::try_from(region.az_count()).unwrap_or(u8::MAX);

        match overrides.az_count {
            Some(requested) if requested > available => {
                return Err(Error::invalid_value(
                    "az_count",
                    format!(
                        "{} offers {} availability zone(s), {} requested",
                        region.name, available, requested
                    ),
                ));
            }
            None if settings.az_count > available => {
                warn!(
                    region = %region.name,
                    tier = %tier,
                    default = settings.az_count,
                    available,
                    "clamping default az_count to the region's availability zones"
                );
                settings.az_count = available;
            }
            _ => {}
        }

        debug!(tier = %tier, region = %region.name, ?settings, "merged settings");
        Ok(settings)
    }

    /// Assemble the resolved configuration.
    pub fn assemble(
        &self,
        project: &str,
        tier: Tier,
        region: &RegionProfile,
        settings: Settings,
        network: NetworkAllocation,
        overrides: &Overrides,
    ) -> Result<ResolvedConfig> {
        let names = NameResolver::with_abbreviation(project, tier, &region.abbreviation)?;
        let subnet_names = network
            .all_subnets()
            .map(|s| names.subnet(s.role, &s.az))
            .collect();

        Ok(ResolvedConfig {
            project: project.to_string(),
            environment: tier,
            region: region.name.clone(),
            region_abbr: region.abbreviation.clone(),
            name_prefix: names.prefix().to_string(),
            names: names.all()?,
            subnet_names,
            tags: tags(project, tier, &region.name, &overrides.tags),
            network,
            settings,
        })
    }
}

/// Build the subnet request for merged settings.
///
/// `vpc_cidr` and `subnet_prefix` overrides win over the caller's defaults.
pub fn subnet_request(
    settings: &Settings,
    overrides: &Overrides,
    region: &RegionProfile,
    base_cidr: Ipv4Net,
    target_prefix: u8,
) -> SubnetRequest {
    let az_count = usize::from(settings.az_count);
    SubnetRequest {
        base: overrides.vpc_cidr.unwrap_or(base_cidr),
        counts: SubnetCounts::per_az(az_count),
        azs: region.take_azs(az_count),
        target_prefix,
        subnet_prefix: overrides.subnet_prefix,
    }
}

/// Reserved tags merged with user tags.
pub fn tags(
    project: &str,
    tier: Tier,
    region: &str,
    user: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut tags = user.clone();
    tags.insert("Project".to_string(), project.to_string());
    tags.insert("Environment".to_string(), tier.to_string());
    tags.insert("Region".to_string(), region.to_string());
    tags.insert("ManagedBy".to_string(), MANAGED_BY.to_string());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::{parse_cidr, plan_subnets, DEFAULT_SUBNET_PREFIX};
    use crate::region::RegionCatalog;

    fn region(name: &str) -> RegionProfile {
        RegionCatalog::builtin().lookup(name).unwrap().clone()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let tiers = TierCatalog::builtin();
        let synth = Synthesizer::new(&tiers);
        let settings = synth
            .settings(Tier::Staging, &Overrides::default(), &region("us-west-2"))
            .unwrap();
        assert_eq!(&settings, tiers.defaults(Tier::Staging).unwrap());
    }

    #[test]
    fn test_default_az_count_is_clamped() {
        let tiers = TierCatalog::builtin();
        let synth = Synthesizer::new(&tiers);
        let settings = synth
            .settings(Tier::Prod, &Overrides::default(), &region("us-west-1"))
            .unwrap();
        assert_eq!(settings.az_count, 2);
    }

    #[test]
    fn test_explicit_az_count_above_region_fails() {
        let tiers = TierCatalog::builtin();
        let synth = Synthesizer::new(&tiers);
        let overrides = Overrides::from_assignments(["az_count=3"]).unwrap();
        let err = synth
            .settings(Tier::Dev, &overrides, &region("us-west-1"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "az_count"));
    }

    #[test]
    fn test_synthesis_does_not_apply_policy() {
        let tiers = TierCatalog::builtin();
        let synth = Synthesizer::new(&tiers);
        let overrides =
            Overrides::from_assignments(["multi_az=false", "backup_retention_days=0"]).unwrap();
        let settings = synth
            .settings(Tier::Prod, &overrides, &region("us-east-1"))
            .unwrap();
        assert!(!settings.multi_az);
        assert_eq!(settings.backup_retention_days, 0);
    }

    #[test]
    fn test_assemble() {
        let tiers = TierCatalog::builtin();
        let synth = Synthesizer::new(&tiers);
        let usw2 = region("us-west-2");
        let overrides =
            Overrides::from_assignments(["az_count=3", "tags.CostCenter=42a"]).unwrap();
        let settings = synth.settings(Tier::Dev, &overrides, &usw2).unwrap();
        let request = subnet_request(
            &settings,
            &overrides,
            &usw2,
            parse_cidr("172.16.0.0/16").unwrap(),
            DEFAULT_SUBNET_PREFIX,
        );
        let network = plan_subnets(&request).unwrap();
        let config = synth
            .assemble("app1", Tier::Dev, &usw2, settings, network, &overrides)
            .unwrap();

        assert_eq!(config.name_prefix, "app1-dev-usw2");
        assert_eq!(config.names["vpc"], "app1-dev-usw2-vpc");
        assert_eq!(config.subnet_names.len(), 9);
        assert_eq!(config.subnet_names[0], "app1-dev-usw2-public-us-west-2a");
        assert_eq!(config.tags["ManagedBy"], "terraform");
        assert_eq!(config.tags["Environment"], "dev");
        assert_eq!(config.tags["CostCenter"], "42a");
    }

    #[test]
    fn test_vpc_cidr_override_wins() {
        let usw2 = region("us-west-2");
        let tiers = TierCatalog::builtin();
        let overrides = Overrides::from_assignments(["vpc_cidr=10.9.0.0/16"]).unwrap();
        let settings = Synthesizer::new(&tiers)
            .settings(Tier::Dev, &overrides, &usw2)
            .unwrap();
        let request = subnet_request(
            &settings,
            &overrides,
            &usw2,
            parse_cidr("10.0.0.0/16").unwrap(),
            DEFAULT_SUBNET_PREFIX,
        );
        assert_eq!(request.base.to_string(), "10.9.0.0/16");
        assert_eq!(request.azs, vec!["us-west-2a", "us-west-2b"]);
    }
}

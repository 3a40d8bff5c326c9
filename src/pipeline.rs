//! End-to-end resolution of one environment request.
//!
//! Stages run in a fixed order: tier lookup, region lookup, naming,
//! settings merge, CIDR allocation, assembly, policy. Structural errors
//! stop the run at the stage that raised them. Policy violations never do;
//! they are returned next to the configuration.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cidr::{CidrAllocator, DEFAULT_SUBNET_PREFIX};
use crate::error::{Error, Result};
use crate::naming::NameResolver;
use crate::policy::{self, PolicyViolation};
use crate::region::RegionCatalog;
use crate::settings::Overrides;
use crate::synth::{self, ResolvedConfig, Synthesizer};
use crate::tier::{Tier, TierCatalog};

/// Default VPC block when neither the request nor an override names one.
pub const DEFAULT_BASE_CIDR: &str = "10.0.0.0/16";

/// Fallback values applied to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDefaults {
    /// VPC block used when a request has none
    pub base_cidr: Ipv4Net,
    /// Preferred subnet prefix
    pub subnet_prefix: u8,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            base_cidr: Ipv4Net::new(std::net::Ipv4Addr::new(10, 0, 0, 0), 16)
                .unwrap_or_default(),
            subnet_prefix: DEFAULT_SUBNET_PREFIX,
        }
    }
}

/// Inputs for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Environment tier
    pub tier: Tier,
    /// Project identifier
    pub project: String,
    /// Region identifier
    pub region: String,
    /// VPC block, falling back to the pipeline default
    pub base_cidr: Option<Ipv4Net>,
    /// Typed overrides
    pub overrides: Overrides,
}

impl Request {
    /// A request with no base CIDR and no overrides.
    pub fn new(tier: Tier, project: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            tier,
            project: project.into(),
            region: region.into(),
            base_cidr: None,
            overrides: Overrides::default(),
        }
    }

    /// Set the VPC block.
    pub fn with_base_cidr(mut self, base: Ipv4Net) -> Self {
        self.base_cidr = Some(base);
        self
    }

    /// Set the overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Result of a successful run: the configuration and every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Resolved configuration
    pub config: ResolvedConfig,
    /// Policy violations in rule order
    pub violations: Vec<PolicyViolation>,
}

impl Outcome {
    /// Whether the configuration satisfies its tier policy.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// The configuration, or [`Error::PolicyViolations`] when any rule failed.
    pub fn into_result(self) -> Result<ResolvedConfig> {
        if self.violations.is_empty() {
            Ok(self.config)
        } else {
            Err(Error::PolicyViolations(self.violations))
        }
    }
}

/// Wires the catalogs, defaults and one account's CIDR registry together.
#[derive(Debug, Clone)]
pub struct Pipeline {
    tiers: Arc<TierCatalog>,
    regions: Arc<RegionCatalog>,
    defaults: PipelineDefaults,
    allocator: Arc<CidrAllocator>,
}

impl Pipeline {
    /// Create a pipeline with its own registry for `scope`.
    pub fn new(
        tiers: Arc<TierCatalog>,
        regions: Arc<RegionCatalog>,
        defaults: PipelineDefaults,
        scope: &str,
    ) -> Self {
        Self::with_allocator(tiers, regions, defaults, Arc::new(CidrAllocator::new(scope)))
    }

    /// Create a pipeline sharing an existing registry.
    pub fn with_allocator(
        tiers: Arc<TierCatalog>,
        regions: Arc<RegionCatalog>,
        defaults: PipelineDefaults,
        allocator: Arc<CidrAllocator>,
    ) -> Self {
        Self {
            tiers,
            regions,
            defaults,
            allocator,
        }
    }

    /// Pipeline over the built-in catalogs and default settings.
    pub fn builtin(scope: &str) -> Self {
        Self::new(
            Arc::new(TierCatalog::builtin()),
            Arc::new(RegionCatalog::builtin()),
            PipelineDefaults::default(),
            scope,
        )
    }

    /// The shared CIDR registry.
    pub fn allocator(&self) -> &Arc<CidrAllocator> {
        &self.allocator
    }

    /// Resolve one request.
    ///
    /// Returns `Err` only for structural problems. Policy violations come
    /// back in [`Outcome::violations`].
    pub fn run(&self, request: &Request) -> Result<Outcome> {
        let policy = self.tiers.lookup(request.tier)?;
        let region = self.regions.lookup(&request.region)?;
        let names =
            NameResolver::with_abbreviation(&request.project, request.tier, &region.abbreviation)?;
        debug!(prefix = names.prefix(), "resolving environment");
        // Length limits fail the run before the block is registered.
        names.all()?;

        let synthesizer = Synthesizer::new(&self.tiers);
        let settings = synthesizer.settings(request.tier, &request.overrides, region)?;

        let subnets = synth::subnet_request(
            &settings,
            &request.overrides,
            region,
            request.base_cidr.unwrap_or(self.defaults.base_cidr),
            self.defaults.subnet_prefix,
        );
        let network = self.allocator.allocate(names.prefix(), &subnets)?;

        let config = synthesizer.assemble(
            &request.project,
            request.tier,
            region,
            settings,
            network,
            &request.overrides,
        )?;
        let violations = policy::validate(&config, policy);

        info!(
            environment = %config.name_prefix,
            vpc_cidr = %config.network.vpc_cidr,
            violations = violations.len(),
            "environment resolved"
        );
        Ok(Outcome { config, violations })
    }
}

//! Multi-environment manifests.
//!
//! A manifest lists every environment of one project. Checking it runs each
//! environment through a pipeline, with one CIDR registry per account scope,
//! and reports violations, overlaps and name collisions for all of them
//! instead of stopping at the first failure.

use indexmap::IndexMap;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cidr::parse_cidr;
use crate::error::{Error, Result};
use crate::naming::NameResolver;
use crate::pipeline::{Pipeline, PipelineDefaults, Request};
use crate::policy::PolicyViolation;
use crate::region::RegionCatalog;
use crate::settings::Overrides;
use crate::tier::{Tier, TierCatalog};

/// Account scope used when an environment names none.
pub const DEFAULT_ACCOUNT: &str = "default";

fn default_account() -> String {
    DEFAULT_ACCOUNT.to_string()
}

/// Environments of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Project identifier shared by every environment
    pub project: String,
    /// Environments in check order
    pub environments: Vec<EnvironmentSpec>,
}

/// One `region/tier` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentSpec {
    /// Region identifier
    pub region: String,
    /// Tier name
    pub tier: String,
    /// Account scope for CIDR overlap checks
    #[serde(default = "default_account")]
    pub account: String,
    /// VPC block
    #[serde(default)]
    pub base_cidr: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Raw overrides, checked against the override schema
    #[serde(default)]
    pub overrides: IndexMap<String, serde_yaml::Value>,
}

impl EnvironmentSpec {
    /// `region/tier`, the directory layout the environment lives under.
    pub fn label(&self) -> String {
        format!("{}/{}", self.region, self.tier)
    }
}

impl Manifest {
    /// Load a manifest, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let parsed = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
        };
        let manifest: Manifest = parsed.map_err(|message| Error::manifest(path, message))?;

        if manifest.environments.is_empty() {
            return Err(Error::manifest(path, "no environments listed"));
        }
        debug!(
            path = %path.display(),
            environments = manifest.environments.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }
}

/// Result for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    /// `region/tier`
    pub label: String,
    /// Account scope
    pub account: String,
    /// Description from the manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name prefix, when naming succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// Allocated VPC block, when allocation succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_cidr: Option<Ipv4Net>,
    /// Policy violations
    pub violations: Vec<PolicyViolation>,
    /// Structural error that stopped this environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnvironmentReport {
    fn new(spec: &EnvironmentSpec) -> Self {
        Self {
            label: spec.label(),
            account: spec.account.clone(),
            description: spec.description.clone(),
            name_prefix: None,
            vpc_cidr: None,
            violations: Vec::new(),
            error: None,
        }
    }

    /// Whether the environment resolved and passed policy.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.violations.is_empty()
    }
}

/// Aggregate result for a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestReport {
    /// Project identifier
    pub project: String,
    /// Per-environment results in manifest order
    pub environments: Vec<EnvironmentReport>,
}

impl ManifestReport {
    /// Number of environments that failed structurally.
    pub fn error_count(&self) -> usize {
        self.environments.iter().filter(|e| e.error.is_some()).count()
    }

    /// Total policy violations across environments.
    pub fn violation_count(&self) -> usize {
        self.environments.iter().map(|e| e.violations.len()).sum()
    }

    /// Whether every environment passed.
    pub fn passed(&self) -> bool {
        self.environments.iter().all(EnvironmentReport::passed)
    }

    /// 0 when clean, 1 for policy violations only, 2 when anything failed structurally.
    pub fn exit_code(&self) -> i32 {
        if self.error_count() > 0 {
            2
        } else if self.violation_count() > 0 {
            1
        } else {
            0
        }
    }
}

/// Runs manifests through per-account pipelines.
#[derive(Debug, Clone)]
pub struct ManifestChecker {
    tiers: Arc<TierCatalog>,
    regions: Arc<RegionCatalog>,
    defaults: PipelineDefaults,
}

impl ManifestChecker {
    /// Create a checker over injected catalogs.
    pub fn new(
        tiers: Arc<TierCatalog>,
        regions: Arc<RegionCatalog>,
        defaults: PipelineDefaults,
    ) -> Self {
        Self {
            tiers,
            regions,
            defaults,
        }
    }

    /// Check every environment, collecting all problems.
    pub fn check(&self, manifest: &Manifest) -> ManifestReport {
        let mut pipelines: BTreeMap<String, Pipeline> = BTreeMap::new();
        let mut seen: BTreeMap<(String, String), String> = BTreeMap::new();
        let mut environments = Vec::with_capacity(manifest.environments.len());

        for spec in &manifest.environments {
            let mut report = EnvironmentReport::new(spec);

            let request = match self.request(&manifest.project, spec) {
                Ok(request) => request,
                Err(e) => {
                    report.error = Some(e.to_string());
                    environments.push(report);
                    continue;
                }
            };

            let prefix = match self.prefix(&request) {
                Ok(prefix) => prefix,
                Err(e) => {
                    report.error = Some(e.to_string());
                    environments.push(report);
                    continue;
                }
            };
            report.name_prefix = Some(prefix.clone());

            // Two entries resolving to the same names in one account would
            // share every resource name.
            let key = (spec.account.clone(), prefix.clone());
            if let Some(first) = seen.get(&key) {
                warn!(environment = %spec.label(), first = %first, "name collision");
                report.error = Some(format!(
                    "name collision: '{prefix}' is already used by {first} in account '{}'",
                    spec.account
                ));
                environments.push(report);
                continue;
            }
            seen.insert(key, spec.label());

            let pipeline = pipelines.entry(spec.account.clone()).or_insert_with(|| {
                Pipeline::new(
                    Arc::clone(&self.tiers),
                    Arc::clone(&self.regions),
                    self.defaults.clone(),
                    &spec.account,
                )
            });

            match pipeline.run(&request) {
                Ok(outcome) => {
                    report.vpc_cidr = Some(outcome.config.network.vpc_cidr);
                    report.violations = outcome.violations;
                }
                Err(e) => report.error = Some(e.to_string()),
            }
            environments.push(report);
        }

        ManifestReport {
            project: manifest.project.clone(),
            environments,
        }
    }

    fn request(&self, project: &str, spec: &EnvironmentSpec) -> Result<Request> {
        let tier: Tier = spec.tier.parse()?;
        let overrides = Overrides::from_values(&spec.overrides)?;
        let mut request = Request::new(tier, project, &spec.region).with_overrides(overrides);
        if let Some(raw) = &spec.base_cidr {
            request = request.with_base_cidr(parse_cidr(raw)?);
        }
        Ok(request)
    }

    fn prefix(&self, request: &Request) -> Result<String> {
        let region = self.regions.lookup(&request.region)?;
        let names =
            NameResolver::with_abbreviation(&request.project, request.tier, &region.abbreviation)?;
        Ok(names.prefix().to_string())
    }
}

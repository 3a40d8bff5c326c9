//! # tierctl - Tiered Infrastructure Configuration
//!
//! tierctl turns a handful of inputs (tier, project, region, overrides) into
//! a validated, deterministic parameter set for AWS environments laid out as
//! `region/tier` directories: CIDR allocations, security posture, backup and
//! retention policy, monitoring settings, resource names and tags.
//!
//! ## Core Concepts
//!
//! - **Tiers**: `dev`, `staging` and `prod`, each with a compiled-in policy
//!   and a set of default settings
//! - **Regions**: region identifiers, their name abbreviations and AZs
//! - **Overrides**: typed, schema-checked changes to tier defaults
//! - **Allocations**: a VPC block carved into public, private and database
//!   subnets, registered per account so environments never overlap
//! - **Policy**: rules every resolved configuration is checked against;
//!   all violations are reported, not just the first
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Tier Catalog │   │Region Catalog│   │  Overrides   │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        └──────────────────┼──────────────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │     Pipeline      │──► Naming Resolver
//!                 │                   │──► Config Synthesizer
//!                 │                   │──► CIDR Allocator (per account)
//!                 │                   │──► Policy Validator
//!                 └─────────┬─────────┘
//!                           ▼
//!          ResolvedConfig + violations ──► Renderer (json/yaml/tfvars)
//! ```
//!
//! ## Quick Example
//!
//! ```rust
//! use tierctl::prelude::*;
//!
//! let pipeline = Pipeline::builtin("default");
//! let request = Request::new(Tier::Prod, "app1", "us-west-2")
//!     .with_overrides(Overrides::from_assignments(["multi_az=false"])?);
//!
//! let outcome = pipeline.run(&request)?;
//! assert_eq!(outcome.violations[0].rule, Rule::MultiAzRequired);
//! # Ok::<(), tierctl::error::Error>(())
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::cidr::{CidrAllocator, NetworkAllocation, Subnet, SubnetRole};
    pub use crate::error::{Error, Result};
    pub use crate::manifest::{Manifest, ManifestChecker, ManifestReport};
    pub use crate::naming::{NameResolver, ResourceKind};
    pub use crate::pipeline::{Outcome, Pipeline, PipelineDefaults, Request};
    pub use crate::policy::{PolicyViolation, Rule, Severity};
    pub use crate::region::{RegionCatalog, RegionProfile};
    pub use crate::render::{render, RenderFormat};
    pub use crate::settings::{Overrides, Settings};
    pub use crate::synth::ResolvedConfig;
    pub use crate::tier::{Tier, TierCatalog, TierPolicy};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
///
/// Every error maps to a CLI exit code through
/// [`Error::exit_code`](error::Error::exit_code).
pub mod error;

/// Tier enum, tier policies and the tier catalog.
pub mod tier;

/// Region profiles and abbreviations.
pub mod region;

/// Typed settings and the override schema.
pub mod settings;

// ============================================================================
// Pipeline Stages
// ============================================================================

/// Subnet planning and the per-account CIDR registry.
pub mod cidr;

/// Deterministic resource naming.
pub mod naming;

/// Merging tier defaults with overrides.
pub mod synth;

/// Tier policy rules.
pub mod policy;

/// Stage wiring for a single environment.
pub mod pipeline;

/// Multi-environment manifests.
pub mod manifest;

// ============================================================================
// Configuration and Output
// ============================================================================

/// Tool configuration loaded from files and environment variables.
pub mod config;

/// JSON, YAML and tfvars rendering.
pub mod render;

/// Returns the current version of tierctl.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

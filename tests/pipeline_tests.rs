//! End-to-end tests for the resolution pipeline
//!
//! These drive the library the way the CLI does: one pipeline per account,
//! several requests against it, rendered output compared byte for byte.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use tierctl::cidr::parse_cidr;
use tierctl::prelude::*;

fn overrides(assignments: &[&str]) -> Overrides {
    Overrides::from_assignments(assignments.iter().copied()).unwrap()
}

// ============================================================================
// Tier Defaults
// ============================================================================

#[test]
fn test_dev_three_azs_private_block() {
    let pipeline = Pipeline::builtin("default");
    let request = Request::new(Tier::Dev, "app1", "us-west-2")
        .with_base_cidr(parse_cidr("172.16.0.0/16").unwrap())
        .with_overrides(overrides(&["az_count=3"]));

    let outcome = pipeline.run(&request).unwrap();
    assert!(outcome.passed());

    let config = outcome.config;
    assert_eq!(config.name_prefix, "app1-dev-usw2");
    assert!(!config.settings.enable_waf);

    let network = &config.network;
    assert_eq!(network.subnet_prefix, 24);
    assert_eq!(network.all_subnets().count(), 9);
    assert_eq!(network.azs, vec!["us-west-2a", "us-west-2b", "us-west-2c"]);

    let cidrs: Vec<String> = network.all_subnets().map(|s| s.cidr.to_string()).collect();
    let expected: Vec<String> = (0..9).map(|i| format!("172.16.{i}.0/24")).collect();
    assert_eq!(cidrs, expected);

    for role in SubnetRole::ALL {
        let zones: Vec<&str> = network.subnets(role).iter().map(|s| s.az.as_str()).collect();
        assert_eq!(zones, vec!["us-west-2a", "us-west-2b", "us-west-2c"]);
    }
}

#[test]
fn test_prod_defaults_pass() {
    let pipeline = Pipeline::builtin("default");
    let outcome = pipeline
        .run(&Request::new(Tier::Prod, "app1", "eu-west-1"))
        .unwrap();

    assert!(outcome.violations.is_empty());
    let settings = &outcome.config.settings;
    assert!(settings.multi_az);
    assert!(settings.deletion_protection);
    assert!(settings.enable_waf);
    assert_eq!(settings.az_count, 3);
    assert_eq!(outcome.config.tags["Environment"], "prod");
    assert_eq!(outcome.config.tags["ManagedBy"], "terraform");
}

#[test]
fn test_region_with_two_zones_caps_defaults() {
    let pipeline = Pipeline::builtin("default");
    let outcome = pipeline
        .run(&Request::new(Tier::Prod, "app1", "us-west-1"))
        .unwrap();

    assert_eq!(outcome.config.settings.az_count, 2);
    assert_eq!(outcome.config.network.azs, vec!["us-west-1a", "us-west-1c"]);
    assert!(outcome.passed());
}

#[test]
fn test_explicit_az_count_beyond_region_fails() {
    let pipeline = Pipeline::builtin("default");
    let request =
        Request::new(Tier::Prod, "app1", "us-west-1").with_overrides(overrides(&["az_count=3"]));

    let err = pipeline.run(&request).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { ref field, .. } if field == "az_count"));
    assert_eq!(err.exit_code(), 2);
}

// ============================================================================
// Policy
// ============================================================================

#[test]
fn test_prod_without_multi_az_reports_one_rule() {
    let pipeline = Pipeline::builtin("default");
    let request =
        Request::new(Tier::Prod, "app1", "us-west-2").with_overrides(overrides(&["multi_az=false"]));

    let outcome = pipeline.run(&request).unwrap();
    let rules: Vec<Rule> = outcome.violations.iter().map(|v| v.rule).collect();
    assert_eq!(rules, vec![Rule::MultiAzRequired]);
    assert_eq!(outcome.violations[0].severity, Severity::Critical);
    assert_eq!(outcome.violations[0].field, "multi_az");

    let err = outcome.into_result().unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_violations_are_exhaustive() {
    let pipeline = Pipeline::builtin("default");
    let request = Request::new(Tier::Prod, "app1", "us-west-2").with_overrides(overrides(&[
        "multi_az=false",
        "deletion_protection=false",
        "backup_retention_days=7",
        "enable_waf=false",
    ]));

    let outcome = pipeline.run(&request).unwrap();
    let rules: Vec<&str> = outcome.violations.iter().map(|v| v.rule.as_str()).collect();
    assert_eq!(
        rules,
        vec![
            "multi_az_required",
            "deletion_protection_required",
            "backup_retention_minimum",
            "waf_required",
        ]
    );
}

#[test]
fn test_staging_internal_needs_no_waf() {
    let pipeline = Pipeline::builtin("default");
    let internal = Request::new(Tier::Staging, "app1", "us-east-2")
        .with_overrides(overrides(&["public_ingress=false", "enable_waf=false"]));
    assert!(pipeline.run(&internal).unwrap().passed());

    let public = Request::new(Tier::Staging, "app2", "us-east-2")
        .with_base_cidr(parse_cidr("10.1.0.0/16").unwrap())
        .with_overrides(overrides(&["enable_waf=false"]));
    let outcome = pipeline.run(&public).unwrap();
    assert_eq!(outcome.violations[0].rule, Rule::WafRequired);
}

// ============================================================================
// Allocation Registry
// ============================================================================

#[test]
fn test_overlapping_blocks_rejected_in_account() {
    let pipeline = Pipeline::builtin("default");
    pipeline
        .run(
            &Request::new(Tier::Dev, "app1", "us-west-1")
                .with_base_cidr(parse_cidr("10.0.0.0/16").unwrap()),
        )
        .unwrap();

    let err = pipeline
        .run(
            &Request::new(Tier::Staging, "app1", "us-west-2")
                .with_base_cidr(parse_cidr("10.0.1.0/24").unwrap()),
        )
        .unwrap_err();

    match err {
        Error::Overlap {
            requested,
            existing,
            existing_owner,
            ..
        } => {
            assert_eq!(requested, "10.0.1.0/24");
            assert_eq!(existing, "10.0.0.0/16");
            assert_eq!(existing_owner, "app1-dev-usw1");
        }
        other => panic!("expected overlap, got {other:?}"),
    }
}

#[test]
fn test_separate_accounts_may_reuse_blocks() {
    let tiers = Arc::new(TierCatalog::builtin());
    let regions = Arc::new(RegionCatalog::builtin());
    let shared = Pipeline::new(
        Arc::clone(&tiers),
        Arc::clone(&regions),
        PipelineDefaults::default(),
        "shared",
    );
    let workloads = Pipeline::new(tiers, regions, PipelineDefaults::default(), "workloads");

    let request = Request::new(Tier::Dev, "app1", "us-west-2");
    let a = shared.run(&request).unwrap();
    let b = workloads
        .run(&Request::new(Tier::Prod, "app1", "us-west-2"))
        .unwrap();
    assert_eq!(a.config.network.vpc_cidr, b.config.network.vpc_cidr);
}

#[test]
fn test_rerun_same_environment_is_idempotent() {
    let pipeline = Pipeline::builtin("default");
    let request = Request::new(Tier::Dev, "app1", "us-west-2");

    let first = pipeline.run(&request).unwrap();
    let second = pipeline.run(&request).unwrap();
    assert_eq!(first.config, second.config);
    assert_eq!(pipeline.allocator().reservations().len(), 1);
}

#[test]
fn test_shared_allocator_across_pipelines() {
    let allocator = Arc::new(CidrAllocator::new("default"));
    let make = || {
        Pipeline::with_allocator(
            Arc::new(TierCatalog::builtin()),
            Arc::new(RegionCatalog::builtin()),
            PipelineDefaults::default(),
            Arc::clone(&allocator),
        )
    };

    make()
        .run(&Request::new(Tier::Dev, "app1", "us-west-2"))
        .unwrap();
    let err = make()
        .run(&Request::new(Tier::Dev, "app2", "us-west-2"))
        .unwrap_err();
    assert!(matches!(err, Error::Overlap { .. }));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_rendering_is_byte_identical_across_runs() {
    let request = Request::new(Tier::Staging, "app1", "ap-southeast-2")
        .with_overrides(overrides(&["tags.Team=platform", "tags.CostCenter=research"]));

    for format in [RenderFormat::Json, RenderFormat::Yaml, RenderFormat::Tfvars] {
        let first = Pipeline::builtin("default").run(&request).unwrap();
        let second = Pipeline::builtin("default").run(&request).unwrap();
        assert_eq!(
            render(&first.config, format).unwrap(),
            render(&second.config, format).unwrap()
        );
    }
}

#[test]
fn test_user_tags_merge_with_reserved_tags() {
    let request = Request::new(Tier::Staging, "app1", "ap-southeast-2")
        .with_overrides(overrides(&["tags.Team=platform"]));
    let outcome = Pipeline::builtin("default").run(&request).unwrap();

    let keys: Vec<&str> = outcome.config.tags.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["Environment", "ManagedBy", "Project", "Region", "Team"]
    );
    assert_eq!(outcome.config.tags["Region"], "ap-southeast-2");
}

#[test]
fn test_reserved_tag_override_rejected() {
    let err = Overrides::from_assignments(["tags.Environment=prod"]).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_rendered_json_round_trips() {
    let outcome = Pipeline::builtin("default")
        .run(&Request::new(Tier::Prod, "app1", "us-east-1"))
        .unwrap();
    let text = render(&outcome.config, RenderFormat::Json).unwrap();
    let parsed: ResolvedConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, outcome.config);
}

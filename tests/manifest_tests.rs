//! Manifest loading and checking tests

use std::fs;
use std::sync::Arc;
use tempfile::tempdir;
use tierctl::manifest::{Manifest, ManifestChecker, DEFAULT_ACCOUNT};
use tierctl::prelude::*;

fn checker() -> ManifestChecker {
    ManifestChecker::new(
        Arc::new(TierCatalog::builtin()),
        Arc::new(RegionCatalog::builtin()),
        PipelineDefaults::default(),
    )
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_yaml_manifest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.yml");
    fs::write(
        &path,
        r#"
project: app1
environments:
  - region: us-west-1
    tier: dev
    description: Development environment in us-west-1
    base_cidr: 10.10.0.0/16
    overrides:
      az_count: 2
      tags.Team: platform
  - region: eu-west-1
    tier: prod
    account: production
"#,
    )
    .unwrap();

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.project, "app1");
    assert_eq!(manifest.environments.len(), 2);

    let dev = &manifest.environments[0];
    assert_eq!(dev.label(), "us-west-1/dev");
    assert_eq!(dev.account, DEFAULT_ACCOUNT);
    assert_eq!(dev.base_cidr.as_deref(), Some("10.10.0.0/16"));
    assert_eq!(dev.overrides.len(), 2);

    let prod = &manifest.environments[1];
    assert_eq!(prod.account, "production");
    assert!(prod.base_cidr.is_none());
}

#[test]
fn test_load_json_manifest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.json");
    fs::write(
        &path,
        r#"{
  "project": "app1",
  "environments": [
    {"region": "us-east-1", "tier": "staging", "overrides": {"public_ingress": false}}
  ]
}"#,
    )
    .unwrap();

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.environments[0].label(), "us-east-1/staging");

    let report = checker().check(&manifest);
    assert!(report.passed(), "{report:?}");
}

#[test]
fn test_load_toml_manifest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.toml");
    fs::write(
        &path,
        r#"
project = "app1"

[[environments]]
region = "ap-southeast-2"
tier = "prod"
base_cidr = "10.30.0.0/16"

[environments.overrides]
monitoring_interval = 60
"#,
    )
    .unwrap();

    let manifest = Manifest::load(&path).unwrap();
    let report = checker().check(&manifest);
    assert_eq!(report.exit_code(), 1);

    let env = &report.environments[0];
    assert_eq!(env.name_prefix.as_deref(), Some("app1-prod-apse2"));
    assert_eq!(env.violations.len(), 1);
    assert_eq!(env.violations[0].rule, Rule::MonitoringIntervalMaximum);
}

#[test]
fn test_missing_manifest() {
    let err = Manifest::load(std::path::Path::new("/nonexistent/environments.yml")).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_unknown_keys_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.yml");
    fs::write(
        &path,
        "project: app1\nenvironments:\n  - region: us-west-2\n    tier: dev\n    zone: a\n",
    )
    .unwrap();

    let err = Manifest::load(&path).unwrap_err();
    assert!(matches!(err, Error::Manifest { .. }));
}

#[test]
fn test_empty_manifest_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.yml");
    fs::write(&path, "project: app1\nenvironments: []\n").unwrap();

    let err = Manifest::load(&path).unwrap_err();
    assert!(err.to_string().contains("no environments listed"));
}

// ============================================================================
// Checking
// ============================================================================

#[test]
fn test_problems_are_collected_across_environments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.yml");
    fs::write(
        &path,
        r#"
project: app1
environments:
  - region: us-west-2
    tier: qa
  - region: us-west-2
    tier: prod
    base_cidr: 10.20.0.0/16
    overrides:
      deletion_protection: false
  - region: us-east-1
    tier: dev
    base_cidr: 10.20.4.0/22
  - region: us-west-2
    tier: production
    base_cidr: 10.40.0.0/16
"#,
    )
    .unwrap();

    let report = checker().check(&Manifest::load(&path).unwrap());
    assert_eq!(report.environments.len(), 4);
    assert_eq!(report.error_count(), 3);
    assert_eq!(report.violation_count(), 1);
    assert_eq!(report.exit_code(), 2);

    let errors: Vec<&str> = report
        .environments
        .iter()
        .map(|e| e.error.as_deref().unwrap_or(""))
        .collect();
    assert!(errors[0].contains("Unknown tier"));
    assert!(errors[1].is_empty());
    assert!(errors[2].contains("overlaps"));
    assert!(errors[3].contains("name collision"));
}

#[test]
fn test_accounts_isolate_address_space() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.yml");
    fs::write(
        &path,
        r#"
project: app1
environments:
  - region: us-west-2
    tier: dev
    account: sandbox
  - region: us-west-2
    tier: prod
    account: production
"#,
    )
    .unwrap();

    let report = checker().check(&Manifest::load(&path).unwrap());
    assert!(report.passed(), "{report:?}");
    assert_eq!(
        report.environments[0].vpc_cidr,
        report.environments[1].vpc_cidr
    );
}

#[test]
fn test_rejected_names_do_not_hold_address_space() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("environments.yml");
    fs::write(
        &path,
        r#"
project: abcdefghijklmnopqrs
environments:
  - region: us-west-2
    tier: prod
    base_cidr: 10.0.0.0/16
  - region: us-west-2
    tier: dev
    base_cidr: 10.0.0.0/16
    account: default
"#,
    )
    .unwrap();

    let report = checker().check(&Manifest::load(&path).unwrap());
    assert_eq!(report.error_count(), 1);

    let prod = &report.environments[0];
    assert!(prod.error.as_deref().unwrap_or("").contains("limited to 32"));
    assert!(prod.vpc_cidr.is_none());

    let dev = &report.environments[1];
    assert!(dev.error.is_none(), "{:?}", dev.error);
    assert_eq!(dev.vpc_cidr.map(|c| c.to_string()).as_deref(), Some("10.0.0.0/16"));
}

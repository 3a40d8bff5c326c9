//! Property-based tests for tierctl
//!
//! Uses proptest to check:
//! - Subnet plans stay inside their block and never overlap
//! - Name resolution is deterministic and well-formed
//! - Policy checks cannot be silenced by unrelated overrides

use ipnet::Ipv4Net;
use proptest::prelude::*;
use std::net::Ipv4Addr;
use tierctl::cidr::{overlaps, plan_subnets, SubnetCounts, SubnetRequest, MAX_SUBNET_PREFIX};
use tierctl::naming::{validate_project, NameResolver, ResourceKind};
use tierctl::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// A network-aligned private block between /8 and /24
fn base_block_strategy() -> impl Strategy<Value = Ipv4Net> {
    (8u8..=24, any::<u32>()).prop_map(|(prefix, bits)| {
        let net = Ipv4Net::new(Ipv4Addr::from(bits), prefix).unwrap();
        net.trunc()
    })
}

fn azs_strategy() -> impl Strategy<Value = Vec<String>> {
    (1usize..=4).prop_map(|n| {
        ["a", "b", "c", "d"]
            .iter()
            .take(n)
            .map(|s| format!("us-west-2{s}"))
            .collect()
    })
}

fn project_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9]{1,12}").unwrap()
}

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop_oneof![Just(Tier::Dev), Just(Tier::Staging), Just(Tier::Prod)]
}

fn region_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("us-east-1"),
        Just("us-west-2"),
        Just("eu-west-1"),
        Just("eu-central-1"),
        Just("ap-southeast-2"),
    ]
}

/// Overrides that never touch `multi_az`
fn unrelated_overrides_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            prop::sample::select(vec![7u32, 14, 30, 35]).prop_map(|d| format!("backup_retention_days={d}")),
            prop::sample::select(vec![30u32, 90, 365]).prop_map(|d| format!("log_retention_days={d}")),
            any::<bool>().prop_map(|b| format!("enable_waf={b}")),
            any::<bool>().prop_map(|b| format!("deletion_protection={b}")),
            any::<bool>().prop_map(|b| format!("public_ingress={b}")),
            any::<bool>().prop_map(|b| format!("performance_insights={b}")),
            prop::string::string_regex("[a-z]{1,8}").unwrap().prop_map(|v| format!("tags.Team=team-{v}")),
        ],
        0..6,
    )
}

// ============================================================================
// Subnet Planning
// ============================================================================

proptest! {
    #[test]
    fn subnets_are_disjoint_and_contained(
        base in base_block_strategy(),
        azs in azs_strategy(),
        target in 16u8..=MAX_SUBNET_PREFIX,
    ) {
        let request = SubnetRequest {
            base,
            counts: SubnetCounts::per_az(azs.len()),
            azs: azs.clone(),
            target_prefix: target,
            subnet_prefix: None,
        };
        let allocation = plan_subnets(&request).unwrap();
        let subnets: Vec<Ipv4Net> = allocation.all_subnets().map(|s| s.cidr).collect();

        prop_assert_eq!(subnets.len(), azs.len() * 3);
        for (i, a) in subnets.iter().enumerate() {
            prop_assert!(base.contains(a));
            prop_assert!(a != &base);
            prop_assert_eq!(a.prefix_len(), allocation.subnet_prefix);
            for b in &subnets[i + 1..] {
                prop_assert!(!overlaps(a, b), "{} overlaps {}", a, b);
            }
        }
    }

    #[test]
    fn subnet_prefix_never_shorter_than_target(
        base in base_block_strategy(),
        azs in azs_strategy(),
        target in 16u8..=MAX_SUBNET_PREFIX,
    ) {
        let request = SubnetRequest {
            base,
            counts: SubnetCounts::per_az(azs.len()),
            azs,
            target_prefix: target,
            subnet_prefix: None,
        };
        let allocation = plan_subnets(&request).unwrap();
        prop_assert!(allocation.subnet_prefix >= target);
        prop_assert!(allocation.subnet_prefix > base.prefix_len());
    }

    #[test]
    fn subnet_azs_cycle_in_order(
        base in base_block_strategy(),
        azs in azs_strategy(),
    ) {
        let request = SubnetRequest {
            base,
            counts: SubnetCounts::per_az(azs.len()),
            azs: azs.clone(),
            target_prefix: 24,
            subnet_prefix: None,
        };
        let allocation = plan_subnets(&request).unwrap();
        for role in SubnetRole::ALL {
            let zones: Vec<String> = allocation.subnets(role).iter().map(|s| s.az.clone()).collect();
            prop_assert_eq!(&zones, &azs);
        }
    }
}

// ============================================================================
// Naming
// ============================================================================

proptest! {
    #[test]
    fn names_are_deterministic(
        project in project_strategy(),
        tier in tier_strategy(),
        region in region_strategy(),
    ) {
        let a = NameResolver::new(&project, tier, region).unwrap();
        let b = NameResolver::new(&project, tier, region).unwrap();
        prop_assert_eq!(a.prefix(), b.prefix());
        prop_assert_eq!(a.all().unwrap(), b.all().unwrap());
    }

    #[test]
    fn prefix_has_three_parts(
        project in project_strategy(),
        tier in tier_strategy(),
        region in region_strategy(),
    ) {
        let names = NameResolver::new(&project, tier, region).unwrap();
        let expected_start = format!("{}-{}-", project, tier);
        prop_assert!(names.prefix().starts_with(&expected_start));
        prop_assert!(!names.prefix().ends_with('-'));

        let vpc = names.resource(ResourceKind::Vpc).unwrap();
        prop_assert!(vpc.starts_with(names.prefix()));
    }

    #[test]
    fn invalid_projects_rejected(
        project in prop::string::string_regex("[A-Z_][A-Za-z0-9_]{0,8}").unwrap(),
    ) {
        prop_assert!(validate_project(&project).is_err());
    }
}

// ============================================================================
// Policy
// ============================================================================

proptest! {
    #[test]
    fn prod_without_multi_az_always_violates(
        extra in unrelated_overrides_strategy(),
        region in region_strategy(),
    ) {
        let mut assignments = extra;
        assignments.push("multi_az=false".to_string());
        let overrides = Overrides::from_assignments(assignments.iter()).unwrap();

        let request = Request::new(Tier::Prod, "app1", region).with_overrides(overrides);
        let outcome = Pipeline::builtin("default").run(&request).unwrap();

        prop_assert!(!outcome.violations.is_empty());
        prop_assert!(outcome.violations.iter().any(|v| v.rule == Rule::MultiAzRequired));
    }

    #[test]
    fn dev_never_violates_with_valid_overrides(
        extra in unrelated_overrides_strategy(),
        region in region_strategy(),
    ) {
        let overrides = Overrides::from_assignments(extra.iter()).unwrap();
        let request = Request::new(Tier::Dev, "app1", region).with_overrides(overrides);
        let outcome = Pipeline::builtin("default").run(&request).unwrap();
        prop_assert!(outcome.passed(), "{:?}", outcome.violations);
    }
}

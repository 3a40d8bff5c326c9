//! Tier policy validation.
//!
//! Every rule runs against every configuration; nothing short-circuits.
//! The validator returns the complete violation list in rule order and the
//! caller decides whether to abort.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::settings::Settings;
use crate::synth::ResolvedConfig;
use crate::tier::TierPolicy;

/// Severity level of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Should be addressed
    Medium,
    /// Significant availability or data-loss risk
    High,
    /// Directly contradicts the tier's compliance posture
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Named policy rules, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Tier requires a multi-AZ database
    MultiAzRequired,
    /// Tier requires deletion protection
    DeletionProtectionRequired,
    /// Backup retention below the tier minimum
    BackupRetentionMinimum,
    /// Log retention below the tier minimum
    LogRetentionMinimum,
    /// Tier requires a WAF for this ingress exposure
    WafRequired,
    /// Fewer availability zones than the tier minimum
    AzCountMinimum,
    /// Tier requires encrypted storage
    StorageEncryptionRequired,
    /// Enhanced monitoring disabled or too coarse
    MonitoringIntervalMaximum,
}

impl Rule {
    /// Every rule in evaluation order.
    pub const ALL: [Rule; 8] = [
        Rule::MultiAzRequired,
        Rule::DeletionProtectionRequired,
        Rule::BackupRetentionMinimum,
        Rule::LogRetentionMinimum,
        Rule::WafRequired,
        Rule::AzCountMinimum,
        Rule::StorageEncryptionRequired,
        Rule::MonitoringIntervalMaximum,
    ];

    /// Stable rule identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::MultiAzRequired => "multi_az_required",
            Rule::DeletionProtectionRequired => "deletion_protection_required",
            Rule::BackupRetentionMinimum => "backup_retention_minimum",
            Rule::LogRetentionMinimum => "log_retention_minimum",
            Rule::WafRequired => "waf_required",
            Rule::AzCountMinimum => "az_count_minimum",
            Rule::StorageEncryptionRequired => "storage_encryption_required",
            Rule::MonitoringIntervalMaximum => "monitoring_interval_maximum",
        }
    }

    /// Severity reported for violations of this rule.
    pub fn severity(&self) -> Severity {
        match self {
            Rule::MultiAzRequired
            | Rule::DeletionProtectionRequired
            | Rule::StorageEncryptionRequired => Severity::Critical,
            Rule::BackupRetentionMinimum | Rule::LogRetentionMinimum | Rule::WafRequired => {
                Severity::High
            }
            Rule::AzCountMinimum | Rule::MonitoringIntervalMaximum => Severity::Medium,
        }
    }

    /// Settings field the rule inspects.
    pub fn field(&self) -> &'static str {
        match self {
            Rule::MultiAzRequired => "multi_az",
            Rule::DeletionProtectionRequired => "deletion_protection",
            Rule::BackupRetentionMinimum => "backup_retention_days",
            Rule::LogRetentionMinimum => "log_retention_days",
            Rule::WafRequired => "enable_waf",
            Rule::AzCountMinimum => "az_count",
            Rule::StorageEncryptionRequired => "storage_encrypted",
            Rule::MonitoringIntervalMaximum => "monitoring_interval",
        }
    }

    /// Evaluate the rule, returning a message when it fails.
    fn check(&self, settings: &Settings, policy: &TierPolicy) -> Option<String> {
        let tier = policy.tier;
        match self {
            Rule::MultiAzRequired => (policy.multi_az_required && !settings.multi_az)
                .then(|| format!("{tier} requires a multi-AZ database")),
            Rule::DeletionProtectionRequired => (policy.deletion_protection_required
                && !settings.deletion_protection)
                .then(|| format!("{tier} requires deletion protection")),
            Rule::BackupRetentionMinimum => (settings.backup_retention_days
                < policy.min_backup_retention_days)
                .then(|| {
                    format!(
                        "backup retention of {} days is below the {tier} minimum of {}",
                        settings.backup_retention_days, policy.min_backup_retention_days
                    )
                }),
            Rule::LogRetentionMinimum => (settings.log_retention_days
                < policy.min_log_retention_days)
                .then(|| {
                    format!(
                        "log retention of {} days is below the {tier} minimum of {}",
                        settings.log_retention_days, policy.min_log_retention_days
                    )
                }),
            Rule::WafRequired => (policy.waf.applies(settings.public_ingress)
                && !settings.enable_waf)
                .then(|| format!("{tier} requires a WAF {}", policy.waf)),
            Rule::AzCountMinimum => (settings.az_count < policy.min_az_count).then(|| {
                format!(
                    "{} availability zone(s) is below the {tier} minimum of {}",
                    settings.az_count, policy.min_az_count
                )
            }),
            Rule::StorageEncryptionRequired => (policy.storage_encryption_required
                && !settings.storage_encrypted)
                .then(|| format!("{tier} requires encrypted database storage")),
            Rule::MonitoringIntervalMaximum => match policy.max_monitoring_interval {
                Some(max) if settings.monitoring_interval == 0 => Some(format!(
                    "{tier} requires enhanced monitoring at {max}s or finer"
                )),
                Some(max) if settings.monitoring_interval > max => Some(format!(
                    "monitoring interval of {}s exceeds the {tier} maximum of {max}s",
                    settings.monitoring_interval
                )),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Rule that failed
    pub rule: Rule,
    /// Offending settings field
    pub field: String,
    /// Severity of the failure
    pub severity: Severity,
    /// Human-readable explanation
    pub message: String,
}

impl PolicyViolation {
    /// Create a violation for `rule`.
    pub fn new(rule: Rule, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            field: field.into(),
            severity: rule.severity(),
            message: message.into(),
        }
    }
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.severity, self.rule, self.field, self.message
        )
    }
}

/// Evaluate every rule against `settings`.
pub fn check_settings(settings: &Settings, policy: &TierPolicy) -> Vec<PolicyViolation> {
    Rule::ALL
        .iter()
        .filter_map(|rule| {
            rule.check(settings, policy)
                .map(|message| PolicyViolation::new(*rule, rule.field(), message))
        })
        .collect()
}

/// Evaluate every rule against a resolved configuration draft.
pub fn validate(config: &ResolvedConfig, policy: &TierPolicy) -> Vec<PolicyViolation> {
    let violations = check_settings(&config.settings, policy);
    debug!(
        environment = %config.name_prefix,
        violations = violations.len(),
        "policy evaluated"
    );
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{Tier, TierCatalog};

    fn defaults(tier: Tier) -> (Settings, TierPolicy) {
        let catalog = TierCatalog::builtin();
        (
            catalog.defaults(tier).unwrap().clone(),
            catalog.lookup(tier).unwrap().clone(),
        )
    }

    #[test]
    fn test_defaults_pass() {
        for tier in Tier::ALL {
            let (settings, policy) = defaults(tier);
            assert!(check_settings(&settings, &policy).is_empty(), "{tier}");
        }
    }

    #[test]
    fn test_prod_multi_az_off() {
        let (mut settings, policy) = defaults(Tier::Prod);
        settings.multi_az = false;
        let violations = check_settings(&settings, &policy);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::MultiAzRequired);
        assert_eq!(violations[0].field, "multi_az");
        assert_eq!(violations[0].severity, Severity::Critical);
    }

    #[test]
    fn test_all_violations_collected_in_order() {
        let (mut settings, policy) = defaults(Tier::Prod);
        settings.multi_az = false;
        settings.deletion_protection = false;
        settings.backup_retention_days = 7;
        settings.log_retention_days = 30;
        settings.enable_waf = false;
        settings.az_count = 1;
        settings.storage_encrypted = false;
        settings.monitoring_interval = 0;

        let rules: Vec<Rule> = check_settings(&settings, &policy)
            .into_iter()
            .map(|v| v.rule)
            .collect();
        assert_eq!(rules, Rule::ALL.to_vec());
    }

    #[test]
    fn test_staging_waf_depends_on_ingress() {
        let (mut settings, policy) = defaults(Tier::Staging);
        settings.enable_waf = false;
        let violations = check_settings(&settings, &policy);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::WafRequired);

        settings.public_ingress = false;
        assert!(check_settings(&settings, &policy).is_empty());
    }

    #[test]
    fn test_dev_is_permissive() {
        let (mut settings, policy) = defaults(Tier::Dev);
        settings.multi_az = false;
        settings.enable_waf = false;
        settings.storage_encrypted = false;
        settings.monitoring_interval = 0;
        settings.az_count = 1;
        assert!(check_settings(&settings, &policy).is_empty());
    }

    #[test]
    fn test_monitoring_interval_cap() {
        let (mut settings, policy) = defaults(Tier::Prod);
        settings.monitoring_interval = 60;
        let violations = check_settings(&settings, &policy);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, Rule::MonitoringIntervalMaximum);
        assert!(violations[0].message.contains("60s"));
    }

    #[test]
    fn test_violation_display() {
        let v = PolicyViolation::new(Rule::WafRequired, "enable_waf", "prod requires a WAF always");
        assert_eq!(
            v.to_string(),
            "[HIGH] waf_required (enable_waf): prod requires a WAF always"
        );
    }
}

//! Configuration module for tierctl
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/tierctl/tierctl.toml)
//! - User configuration (~/.tierctl.toml, ~/.tierctl/config.toml)
//! - Project configuration (./tierctl.toml)
//! - Environment variables
//!
//! Tier policies are deliberately absent: nothing here can relax them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cidr::{parse_cidr, DEFAULT_SUBNET_PREFIX};
use crate::manifest::DEFAULT_ACCOUNT;
use crate::pipeline::{PipelineDefaults, DEFAULT_BASE_CIDR};
use crate::region::{RegionCatalog, RegionProfile};
use crate::render::RenderFormat;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default settings
    pub defaults: Defaults,

    /// Extra region profiles
    pub regions: Vec<RegionConfig>,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,
}

/// Default settings section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// VPC block used when a request names none
    pub base_cidr: String,

    /// Preferred subnet prefix length
    pub subnet_prefix: u8,

    /// Default `render` format
    pub output_format: RenderFormat,

    /// Default account scope
    pub account: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            base_cidr: DEFAULT_BASE_CIDR.to_string(),
            subnet_prefix: DEFAULT_SUBNET_PREFIX,
            output_format: RenderFormat::Json,
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }
}

/// A region profile declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Region identifier
    pub name: String,

    /// Abbreviation override; derived from the name when absent
    #[serde(default)]
    pub abbreviation: Option<String>,

    /// Full availability zone names, in allocation order
    pub azs: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no -v flag or RUST_LOG is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Colors configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colors
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        // Load from standard locations
        let config_paths = Self::get_config_paths(config_path);

        for path in config_paths {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        // Apply environment variable overrides
        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }
        if let Ok(env_config) = std::env::var("TIERCTL_CONFIG") {
            return vec![PathBuf::from(env_config)];
        }

        let mut paths = Vec::new();

        // System-wide config
        paths.push(PathBuf::from("/etc/tierctl/tierctl.toml"));

        // User config
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".tierctl.toml"));
            paths.push(home.join(".tierctl/config.toml"));
        }

        // Project config (current directory)
        paths.push(PathBuf::from("tierctl.toml"));

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        // Determine format based on extension
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file_config: Config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
            _ => {
                // Try TOML first, then YAML
                toml::from_str(&content)
                    .or_else(|_| serde_yaml::from_str(&content))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
        };

        Ok(self.merge(file_config))
    }

    /// Merge another config into this one
    fn merge(&self, other: Config) -> Config {
        let fallback = Defaults::default();
        Config {
            defaults: Defaults {
                base_cidr: if other.defaults.base_cidr != fallback.base_cidr {
                    other.defaults.base_cidr
                } else {
                    self.defaults.base_cidr.clone()
                },
                subnet_prefix: if other.defaults.subnet_prefix != fallback.subnet_prefix {
                    other.defaults.subnet_prefix
                } else {
                    self.defaults.subnet_prefix
                },
                output_format: if other.defaults.output_format != fallback.output_format {
                    other.defaults.output_format
                } else {
                    self.defaults.output_format
                },
                account: if other.defaults.account != fallback.account {
                    other.defaults.account
                } else {
                    self.defaults.account.clone()
                },
            },
            regions: {
                let mut regions = self.regions.clone();
                for region in other.regions {
                    match regions.iter_mut().find(|r| r.name == region.name) {
                        Some(existing) => *existing = region,
                        None => regions.push(region),
                    }
                }
                regions
            },
            logging: other.logging,
            colors: other.colors,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // TIERCTL_BASE_CIDR
        if let Ok(cidr) = std::env::var("TIERCTL_BASE_CIDR") {
            self.defaults.base_cidr = cidr;
        }

        // TIERCTL_SUBNET_PREFIX
        if let Ok(prefix) = std::env::var("TIERCTL_SUBNET_PREFIX") {
            if let Ok(n) = prefix.parse() {
                self.defaults.subnet_prefix = n;
            }
        }

        // TIERCTL_OUTPUT_FORMAT
        if let Ok(format) = std::env::var("TIERCTL_OUTPUT_FORMAT") {
            if let Ok(format) = format.parse() {
                self.defaults.output_format = format;
            }
        }

        // TIERCTL_LOG_LEVEL
        if let Ok(level) = std::env::var("TIERCTL_LOG_LEVEL") {
            self.logging.level = level;
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() || std::env::var("TIERCTL_NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }
    }

    /// Pipeline defaults derived from the `[defaults]` section
    pub fn pipeline_defaults(&self) -> Result<PipelineDefaults> {
        let base_cidr = parse_cidr(&self.defaults.base_cidr)
            .context("Invalid defaults.base_cidr in configuration")?;
        if !(16..=28).contains(&self.defaults.subnet_prefix) {
            anyhow::bail!(
                "Invalid defaults.subnet_prefix in configuration: /{} is outside /16../28",
                self.defaults.subnet_prefix
            );
        }
        Ok(PipelineDefaults {
            base_cidr,
            subnet_prefix: self.defaults.subnet_prefix,
        })
    }

    /// Built-in region catalog with configured regions merged in
    pub fn region_catalog(&self) -> Result<RegionCatalog> {
        let mut catalog = RegionCatalog::builtin();
        for region in &self.regions {
            if region.azs.is_empty() {
                anyhow::bail!("Region '{}' in configuration lists no azs", region.name);
            }
            let mut profile = RegionProfile::new(region.name.clone(), &[])
                .with_context(|| format!("Invalid region '{}' in configuration", region.name))?;
            if let Some(abbr) = &region.abbreviation {
                profile = profile
                    .with_abbreviation(abbr)
                    .with_context(|| format!("Invalid region '{}' in configuration", region.name))?;
            }
            profile.azs = region.azs.clone();
            catalog.insert(profile);
        }
        Ok(catalog)
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        Config::default().merge_from_file(&path_buf)
    }
}

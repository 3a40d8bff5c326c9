//! Region profiles: region identifiers, name abbreviations and the
//! availability zones an environment may span.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cached regex for AWS region identifiers (`us-west-2`, `ap-southeast-1`).
static REGION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]{2})-([a-z]+)-(\d+)$").expect("Invalid region regex"));

/// Abbreviations stay lowercase alphanumeric so name prefixes keep their shape.
static ABBREVIATION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+$").expect("Invalid abbreviation regex"));

/// An AWS region and its availability zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionProfile {
    /// Region identifier, e.g. `us-west-2`
    pub name: String,
    /// Short form used in resource names, e.g. `usw2`
    pub abbreviation: String,
    /// Availability zones in allocation order
    pub azs: Vec<String>,
}

impl RegionProfile {
    /// Create a profile, deriving the abbreviation from the region name.
    pub fn new(name: impl Into<String>, az_suffixes: &[&str]) -> Result<Self> {
        let name = name.into();
        let abbreviation = abbreviate(&name)?;
        let azs = az_suffixes.iter().map(|s| format!("{name}{s}")).collect();
        Ok(Self {
            name,
            abbreviation,
            azs,
        })
    }

    /// Replace the derived abbreviation.
    pub fn with_abbreviation(mut self, abbreviation: &str) -> Result<Self> {
        if !ABBREVIATION_REGEX.is_match(abbreviation) {
            return Err(Error::invalid_value(
                "abbreviation",
                format!("'{abbreviation}' must be lowercase letters and digits"),
            ));
        }
        self.abbreviation = abbreviation.to_string();
        Ok(self)
    }

    /// The first `count` availability zones.
    pub fn take_azs(&self, count: usize) -> Vec<String> {
        self.azs.iter().take(count).cloned().collect()
    }

    /// Number of availability zones offered.
    pub fn az_count(&self) -> usize {
        self.azs.len()
    }
}

/// Abbreviate a region identifier: `us-west-2` → `usw2`, `ap-southeast-2` → `apse2`.
pub fn abbreviate(region: &str) -> Result<String> {
    let caps = REGION_REGEX
        .captures(region)
        .ok_or_else(|| Error::UnknownRegion(region.to_string()))?;
    let direction = match &caps[2] {
        "north" => "n",
        "south" => "s",
        "east" => "e",
        "west" => "w",
        "central" => "c",
        "northeast" => "ne",
        "northwest" => "nw",
        "southeast" => "se",
        "southwest" => "sw",
        other => return Err(Error::UnknownRegion(format!("{region} (direction '{other}')"))),
    };
    Ok(format!("{}{}{}", &caps[1], direction, &caps[3]))
}

/// Registry of known regions.
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    regions: Vec<RegionProfile>,
}

impl RegionCatalog {
    /// The compiled-in region list.
    pub fn builtin() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("us-east-1", &["a", "b", "c", "d", "e", "f"]),
            ("us-east-2", &["a", "b", "c"]),
            // us-west-1 only exposes two zones to most accounts
            ("us-west-1", &["a", "c"]),
            ("us-west-2", &["a", "b", "c", "d"]),
            ("ca-central-1", &["a", "b", "d"]),
            ("eu-west-1", &["a", "b", "c"]),
            ("eu-west-2", &["a", "b", "c"]),
            ("eu-central-1", &["a", "b", "c"]),
            ("ap-southeast-1", &["a", "b", "c"]),
            ("ap-southeast-2", &["a", "b", "c"]),
            ("ap-northeast-1", &["a", "c", "d"]),
        ];
        let regions = table
            .iter()
            .filter_map(|(name, azs)| RegionProfile::new(*name, azs).ok())
            .collect();
        Self { regions }
    }

    /// Add or replace a region profile.
    pub fn insert(&mut self, profile: RegionProfile) {
        if let Some(existing) = self.regions.iter_mut().find(|r| r.name == profile.name) {
            *existing = profile;
        } else {
            self.regions.push(profile);
        }
    }

    /// Look up a region by identifier.
    pub fn lookup(&self, name: &str) -> Result<&RegionProfile> {
        self.regions
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::UnknownRegion(name.to_string()))
    }

    /// Iterate all regions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &RegionProfile> {
        self.regions.iter()
    }
}

impl Default for RegionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("us-west-2").unwrap(), "usw2");
        assert_eq!(abbreviate("us-east-1").unwrap(), "use1");
        assert_eq!(abbreviate("ap-southeast-2").unwrap(), "apse2");
        assert_eq!(abbreviate("eu-central-1").unwrap(), "euc1");
        assert!(abbreviate("mars-north-1").is_err());
        assert!(abbreviate("us-up-1").is_err());
        assert!(abbreviate("uswest2").is_err());
    }

    #[test]
    fn test_builtin_lookup() {
        let catalog = RegionCatalog::builtin();
        let usw1 = catalog.lookup("us-west-1").unwrap();
        assert_eq!(usw1.azs, vec!["us-west-1a", "us-west-1c"]);
        assert_eq!(usw1.abbreviation, "usw1");
        assert_eq!(catalog.lookup("us-west-2").unwrap().az_count(), 4);
        assert!(matches!(
            catalog.lookup("us-gov-west-1"),
            Err(Error::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_insert_replaces() {
        let mut catalog = RegionCatalog::builtin();
        catalog.insert(RegionProfile::new("us-west-1", &["a", "b", "c"]).unwrap());
        assert_eq!(catalog.lookup("us-west-1").unwrap().az_count(), 3);

        catalog.insert(RegionProfile::new("sa-east-1", &["a", "c"]).unwrap());
        assert_eq!(catalog.lookup("sa-east-1").unwrap().abbreviation, "sae1");
    }

    #[test]
    fn test_custom_abbreviation() {
        let profile = RegionProfile::new("sa-east-1", &["a"]).unwrap();
        assert_eq!(profile.clone().with_abbreviation("sp1").unwrap().abbreviation, "sp1");
        for bad in ["", "SAE1", "sa e1", "sa-e1"] {
            assert!(
                matches!(
                    profile.clone().with_abbreviation(bad),
                    Err(Error::InvalidValue { .. })
                ),
                "expected rejection of {bad:?}"
            );
        }
    }

    #[test]
    fn test_take_azs() {
        let catalog = RegionCatalog::builtin();
        let region = catalog.lookup("us-east-1").unwrap();
        assert_eq!(region.take_azs(2), vec!["us-east-1a", "us-east-1b"]);
    }
}

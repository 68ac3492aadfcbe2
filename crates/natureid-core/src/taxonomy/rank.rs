//! Taxonomic rank levels and the rank-name registry.
//!
//! Rank levels are numeric (coarser ranks have larger levels) and may be
//! fractional, e.g. 34.5 for parvorder. The registry maps both ways between
//! levels and rank names and can be extended with ranks discovered while
//! loading the reference taxonomy.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TaxonomyError, TaxonomyResult};

/// Name returned for levels that have no registered rank name.
pub const DEFAULT_RANK_NAME: &str = "clade";

/// Numeric taxonomic rank; larger is coarser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankLevel(f64);

impl RankLevel {
    /// Level of the synthetic root ("Life").
    pub const ROOT: RankLevel = RankLevel(100.0);
    /// Level of kingdoms, the coarsest real rank.
    pub const KINGDOM: RankLevel = RankLevel(70.0);
    pub const GENUS: RankLevel = RankLevel(20.0);
    pub const SPECIES: RankLevel = RankLevel(10.0);
    /// Sentinel for ranks whose level could not be determined; treated as finest.
    pub const UNKNOWN: RankLevel = RankLevel(-1.0);

    /// Create a rank level. NaN is mapped to [`RankLevel::UNKNOWN`].
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::UNKNOWN
        } else if value == 0.0 {
            // Collapse -0.0 so hashing agrees with equality.
            Self(0.0)
        } else {
            Self(value)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// True for ranks strictly finer than kingdom.
    pub fn is_below_kingdom(self) -> bool {
        self < Self::KINGDOM
    }
}

impl Eq for RankLevel {}

impl Hash for RankLevel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl Ord for RankLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for RankLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i32> for RankLevel {
    fn from(value: i32) -> Self {
        Self::new(f64::from(value))
    }
}

impl fmt::Display for RankLevel {
    /// Integral levels print without a fraction ("70"), others as-is ("34.5").
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl FromStr for RankLevel {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Self::new)
    }
}

/// Base rank table, level → name.
const BASE_RANKS: &[(f64, &str)] = &[
    (100.0, "stateofmatter"),
    (70.0, "kingdom"),
    (67.0, "subkingdom"),
    (60.0, "phylum"),
    (57.0, "subphylum"),
    (53.0, "superclass"),
    (50.0, "class"),
    (47.0, "subclass"),
    (45.0, "infraclass"),
    (44.0, "subterclass"),
    (43.0, "superorder"),
    (40.0, "order"),
    (37.0, "suborder"),
    (35.0, "infraorder"),
    (34.5, "parvorder"),
    (34.0, "zoosection"),
    (33.5, "zoosubsection"),
    (33.0, "superfamily"),
    (32.0, "epifamily"),
    (30.0, "family"),
    (27.0, "subfamily"),
    (26.0, "supertribe"),
    (25.0, "tribe"),
    (24.0, "subtribe"),
    (20.0, "genus"),
    (19.0, "genushybrid"),
    (15.0, "subgenus"),
    (13.0, "section"),
    (12.0, "subsection"),
    (11.0, "complex"),
    (10.0, "species"),
    (9.0, "hybrid"),
    (5.0, "subspecies"),
    (4.0, "variety"),
    (3.0, "form"),
    (2.0, "infrahybrid"),
];

/// Bidirectional mapping between rank levels and rank names.
#[derive(Debug, Clone)]
pub struct RankRegistry {
    by_level: HashMap<RankLevel, String>,
    by_name: HashMap<String, RankLevel>,
}

impl Default for RankRegistry {
    fn default() -> Self {
        let mut registry = Self {
            by_level: HashMap::with_capacity(BASE_RANKS.len()),
            by_name: HashMap::with_capacity(BASE_RANKS.len()),
        };
        for &(level, name) in BASE_RANKS {
            registry.register(name, RankLevel::new(level));
        }
        registry
    }
}

impl RankRegistry {
    /// Look up the level of a rank name.
    pub fn rank_level(&self, name: &str) -> TaxonomyResult<RankLevel> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TaxonomyError::UnknownRank(name.to_string()))
    }

    /// Rank name for a level, or `"clade"` when the level is not registered.
    pub fn rank_name(&self, level: RankLevel) -> &str {
        self.rank_name_or(level, DEFAULT_RANK_NAME)
    }

    /// Rank name for a level, or `default` when the level is not registered.
    pub fn rank_name_or<'a>(&'a self, level: RankLevel, default: &'a str) -> &'a str {
        self.by_level.get(&level).map(String::as_str).unwrap_or(default)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Register a rank name. The level keeps its existing name if it has one.
    pub fn register(&mut self, name: &str, level: RankLevel) {
        self.by_name.insert(name.to_string(), level);
        self.by_level
            .entry(level)
            .or_insert_with(|| name.to_string());
    }

    /// Map a rank name to [`RankLevel::UNKNOWN`] without naming that level.
    pub fn register_unknown(&mut self, name: &str) {
        self.by_name.insert(name.to_string(), RankLevel::UNKNOWN);
    }

    /// Number of registered rank names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_table_round_trips() {
        let registry = RankRegistry::default();
        for &(level, name) in BASE_RANKS {
            assert_eq!(registry.rank_level(name).unwrap(), RankLevel::new(level));
            assert_eq!(registry.rank_name(RankLevel::new(level)), name);
        }
    }

    #[test]
    fn test_unknown_rank_name_fails() {
        let registry = RankRegistry::default();
        let err = registry.rank_level("hyperfamily").unwrap_err();
        assert!(matches!(err, TaxonomyError::UnknownRank(ref r) if r == "hyperfamily"));
    }

    #[test]
    fn test_unregistered_level_defaults_to_clade() {
        let registry = RankRegistry::default();
        assert_eq!(registry.rank_name(RankLevel::new(42.0)), "clade");
        assert_eq!(registry.rank_name_or(RankLevel::new(42.0), "?"), "?");
    }

    #[test]
    fn test_register_extends_both_directions() {
        let mut registry = RankRegistry::default();
        registry.register("hyperfamily", RankLevel::new(31.5));
        assert_eq!(
            registry.rank_level("hyperfamily").unwrap(),
            RankLevel::new(31.5)
        );
        assert_eq!(registry.rank_name(RankLevel::new(31.5)), "hyperfamily");
    }

    #[test]
    fn test_register_keeps_existing_level_name() {
        let mut registry = RankRegistry::default();
        registry.register("alias_of_species", RankLevel::SPECIES);
        assert_eq!(
            registry.rank_level("alias_of_species").unwrap(),
            RankLevel::SPECIES
        );
        assert_eq!(registry.rank_name(RankLevel::SPECIES), "species");
    }

    #[test]
    fn test_rank_level_display() {
        assert_eq!(RankLevel::KINGDOM.to_string(), "70");
        assert_eq!(RankLevel::new(34.5).to_string(), "34.5");
        assert_eq!(RankLevel::UNKNOWN.to_string(), "-1");
    }

    #[test]
    fn test_rank_level_parse() {
        assert_eq!("70".parse::<RankLevel>().unwrap(), RankLevel::KINGDOM);
        assert_eq!("33.5".parse::<RankLevel>().unwrap(), RankLevel::new(33.5));
        assert_eq!("10.0".parse::<RankLevel>().unwrap(), RankLevel::SPECIES);
        assert!("genus".parse::<RankLevel>().is_err());
    }

    #[test]
    fn test_rank_level_ordering() {
        assert!(RankLevel::ROOT > RankLevel::KINGDOM);
        assert!(RankLevel::SPECIES.is_below_kingdom());
        assert!(!RankLevel::KINGDOM.is_below_kingdom());
        assert!(RankLevel::UNKNOWN < RankLevel::new(2.0));
    }
}

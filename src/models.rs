//! Data models for planetary production planning

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Skill whose level raises an operator's site capacity when skill modifiers are enabled.
pub const CAPACITY_SKILL: &str = "interplanetary_consolidation";

/// Production tier, from raw extracted resources (P0) to finished goods (P4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    P0,
    P1,
    P2,
    P3,
    P4,
}

impl Tier {
    pub const ALL: [Tier; 5] = [Tier::P0, Tier::P1, Tier::P2, Tier::P3, Tier::P4];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Tier> {
        Tier::ALL.get(rank as usize).copied()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.rank())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SiteType {
    Barren,
    Gas,
    Ice,
    Lava,
    Oceanic,
    Plasma,
    Storm,
    Temperate,
}

impl SiteType {
    pub const ALL: [SiteType; 8] = [
        SiteType::Barren,
        SiteType::Gas,
        SiteType::Ice,
        SiteType::Lava,
        SiteType::Oceanic,
        SiteType::Plasma,
        SiteType::Storm,
        SiteType::Temperate,
    ];
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for SiteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SiteType::ALL
            .into_iter()
            .find(|t| t.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown site type '{}'", s))
    }
}

/// A catalog entry: a raw resource or a manufactured good
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub tier: Tier,
    pub inputs: Vec<String>, // Empty for P0
}

/// A concrete production location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(rename = "type", alias = "planet_type")]
    pub site_type: SiteType,
    #[serde(default)]
    pub resources: Vec<String>, // P0 resources declared extractable here
}

impl Site {
    pub fn exposes(&self, resource: &str) -> bool {
        self.resources.iter().any(|r| r == resource)
    }
}

/// An actor that runs up to `capacity` sites at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub name: String,
    #[serde(alias = "planets")]
    pub capacity: usize,
    #[serde(default)]
    pub skills: BTreeMap<String, u32>,
}

impl Operator {
    pub fn effective_capacity(&self, apply_skill_modifiers: bool) -> usize {
        let bonus = if apply_skill_modifiers {
            self.skills.get(CAPACITY_SKILL).copied().unwrap_or(0) as usize
        } else {
            0
        };
        self.capacity + bonus
    }
}

/// Structural family of a single-site production shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Empty,
    Extraction,
    BasicAssembly,
    DirectAssembly,
    Advanced,
}

/// A legal single-site production shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryConfiguration {
    pub start_tier: Tier,
    pub end_tier: Tier,
    pub imported_inputs: Vec<String>,
    pub mined_inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl FactoryConfiguration {
    pub fn empty() -> Self {
        Self {
            start_tier: Tier::P0,
            end_tier: Tier::P0,
            imported_inputs: Vec::new(),
            mined_inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn family(&self) -> Family {
        match (self.start_tier, self.end_tier) {
            _ if self.is_empty() => Family::Empty,
            (Tier::P0, Tier::P1) => Family::Extraction,
            (Tier::P1, Tier::P2) => Family::BasicAssembly,
            (Tier::P0, Tier::P2) => Family::DirectAssembly,
            _ => Family::Advanced,
        }
    }

    pub fn produces(&self, item: &str) -> bool {
        self.outputs.iter().any(|o| o == item)
    }
}

/// A site-sized unit of required production
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub item: String, // Terminal output delivered to the plan
    pub tier: Tier,
    pub alternatives: Vec<FactoryConfiguration>,
}

/// One stage bound to a site and operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAssignment {
    pub operator: String,
    pub site: String,
    pub site_type: SiteType,
    pub configuration: FactoryConfiguration,
    pub output: String,
}

/// Result of a successful solve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub target: String,
    pub assignments: Vec<PlanAssignment>,
}

impl Plan {
    pub fn empty(target: &str) -> Self {
        Self {
            target: target.to_string(),
            assignments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn steps_for(&self, operator: &str) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.operator == operator)
            .count()
    }
}

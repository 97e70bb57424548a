//! Error types for catalog lookups and planning

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Tier;

/// The catalog data is missing or inconsistent ("your data is wrong")
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("malformed catalog entry {item}: {reason}")]
    Malformed { item: String, reason: String },

    #[error("{item} is {actual}, expected {expected}")]
    WrongTier {
        item: String,
        expected: Tier,
        actual: Tier,
    },
}

impl CatalogError {
    pub(crate) fn malformed(item: &str, reason: impl Into<String>) -> Self {
        CatalogError::Malformed {
            item: item.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a stage could not be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfeasibleReason {
    /// No unused site can host any configuration of the stage.
    NoMatchingSite,
    /// Matching sites exist but every operator is at capacity.
    CapacityExhausted,
    /// The caller's search budget ran out first.
    BudgetExhausted,
}

impl fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibleReason::NoMatchingSite => write!(f, "no matching site"),
            InfeasibleReason::CapacityExhausted => write!(f, "operator capacity exhausted"),
            InfeasibleReason::BudgetExhausted => write!(f, "search budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid inventory: {0}")]
    InvalidInventory(String),

    #[error("infeasible: cannot place stage {stage} ({reason})")]
    Infeasible {
        stage: String,
        reason: InfeasibleReason,
    },
}

impl PlanError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, PlanError::Infeasible { .. })
    }

    /// The stage that could not be placed, when the failure is infeasibility.
    pub fn stage(&self) -> Option<&str> {
        match self {
            PlanError::Infeasible { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

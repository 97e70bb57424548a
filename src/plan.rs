//! Plan materialization
//!
//! Turns a solved [`Plan`] into the document and response shapes handed to
//! callers, plus a human-readable summary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::chain;
use crate::error::{CatalogError, InfeasibleReason, PlanError};
use crate::models::{Plan, PlanAssignment, SiteType};

/// One externally visible plan step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub operator: String,
    pub site: String,
    #[serde(rename = "siteType")]
    pub site_type: SiteType,
    pub imports: Vec<String>,
    pub mined: Vec<String>,
    pub output: String,
}

impl From<&PlanAssignment> for PlanStep {
    fn from(assignment: &PlanAssignment) -> Self {
        PlanStep {
            operator: assignment.operator.clone(),
            site: assignment.site.clone(),
            site_type: assignment.site_type,
            imports: assignment.configuration.imported_inputs.clone(),
            mined: assignment.configuration.mined_inputs.clone(),
            output: assignment.output.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub plan: Vec<PlanStep>,
}

pub fn materialize(plan: &Plan) -> PlanDocument {
    PlanDocument {
        plan: plan.assignments.iter().map(PlanStep::from).collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Ok,
    Infeasible,
    InvalidData,
    InvalidInventory,
}

/// Outcome of a planning request, success or failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<InfeasibleReason>,
}

impl PlanResponse {
    pub fn from_result(result: &Result<Plan, PlanError>) -> Self {
        match result {
            Ok(plan) => PlanResponse {
                status: PlanStatus::Ok,
                plan: Some(materialize(plan).plan),
                message: None,
                stage: None,
                reason: None,
            },
            Err(err) => {
                let (status, stage, reason) = match err {
                    PlanError::Catalog(_) => (PlanStatus::InvalidData, None, None),
                    PlanError::InvalidInventory(_) => (PlanStatus::InvalidInventory, None, None),
                    PlanError::Infeasible { stage, reason } => {
                        (PlanStatus::Infeasible, Some(stage.clone()), Some(*reason))
                    }
                };
                PlanResponse {
                    status,
                    plan: None,
                    message: Some(err.to_string()),
                    stage,
                    reason,
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == PlanStatus::Ok
    }
}

/// Summary of a plan for terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub target: String,
    pub steps: usize,
    pub operator_load: Vec<(String, usize)>, // First appearance order
    pub raw_resources: BTreeSet<String>,
}

/// Summarize a plan; raw resources cover what is mined on site plus the
/// tier-0 leaves behind imports that no step produces.
pub fn summarize(catalog: &Catalog, plan: &Plan) -> Result<PlanSummary, CatalogError> {
    let produced: BTreeSet<&str> = plan
        .assignments
        .iter()
        .flat_map(|a| a.configuration.outputs.iter().map(String::as_str))
        .collect();

    let mut operator_load: Vec<(String, usize)> = Vec::new();
    let mut raw_resources = BTreeSet::new();

    for assignment in &plan.assignments {
        match operator_load.iter_mut().find(|(name, _)| *name == assignment.operator) {
            Some((_, load)) => *load += 1,
            None => operator_load.push((assignment.operator.clone(), 1)),
        }

        raw_resources.extend(assignment.configuration.mined_inputs.iter().cloned());
        for import in &assignment.configuration.imported_inputs {
            if !produced.contains(import.as_str()) {
                let tree = chain::expand(catalog, import)?;
                raw_resources.extend(chain::raw_resources(&tree));
            }
        }
    }

    Ok(PlanSummary {
        target: plan.target.clone(),
        steps: plan.assignments.len(),
        operator_load,
        raw_resources,
    })
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Production Plan ===")?;
        writeln!(f, "Target: {}", self.target)?;
        writeln!(f, "Steps:  {}", self.steps)?;
        writeln!(f)?;

        if self.steps == 0 {
            writeln!(f, "Nothing to produce: target is a raw resource.")?;
            return Ok(());
        }

        writeln!(f, "Operator load:")?;
        for (name, load) in &self.operator_load {
            writeln!(f, "  {}x {}", load, name)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw resources required:")?;
        for resource in &self.raw_resources {
            writeln!(f, "  {}", resource)?;
        }

        Ok(())
    }
}

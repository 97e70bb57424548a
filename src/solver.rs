//! Assignment search
//!
//! Binds every stage of a decomposition to a distinct site and an operator
//! with spare capacity. The search is a plain depth-first backtrack over one
//! mutable working state (used sites, spare capacity, choice stack) that is
//! undone on the way back up. Inputs are never mutated.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::catalog::Catalog;
use crate::chain::{self, DecomposeOptions, Decomposition};
use crate::error::{CatalogError, InfeasibleReason, PlanError};
use crate::models::{Operator, Plan, PlanAssignment, Site, Stage, Tier};

/// How far a site's declared resources are trusted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourcePolicy {
    /// Declared resources are authoritative, even outside the site type's list.
    #[default]
    Trust,
    /// Every declared resource must be a raw resource the site type can extract.
    Enforce,
}

/// Where imported goods come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Imports not produced by another stage are sourced outside the plan.
    #[default]
    External,
    /// Every import must be produced by another stage of the plan.
    ProduceInPlan,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteOrdering {
    /// Fewest declared resources left unused by the configuration.
    #[default]
    TightestFit,
    InventoryOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorOrdering {
    #[default]
    MostSpareCapacity,
    InventoryOrder,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveOptions {
    pub decompose: DecomposeOptions,
    pub resource_policy: ResourcePolicy,
    pub import_policy: ImportPolicy,
    pub site_ordering: SiteOrdering,
    pub operator_ordering: OperatorOrdering,
    /// Add the capacity skill level to each operator's capacity.
    pub apply_skill_modifiers: bool,
    /// Give up after visiting this many search nodes.
    pub node_budget: Option<u64>,
}

pub struct Solver<'c> {
    catalog: &'c Catalog,
    options: SolveOptions,
}

impl<'c> Solver<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self::with_options(catalog, SolveOptions::default())
    }

    pub fn with_options(catalog: &'c Catalog, options: SolveOptions) -> Self {
        Self { catalog, options }
    }

    /// Decompose `target` and solve it against the inventory
    pub fn plan(
        &self,
        target: &str,
        sites: &[Site],
        operators: &[Operator],
    ) -> Result<Plan, PlanError> {
        let decomposition = chain::decompose(self.catalog, target, &self.options.decompose)?;
        self.solve(&decomposition, sites, operators)
    }

    pub fn solve(
        &self,
        decomposition: &Decomposition,
        sites: &[Site],
        operators: &[Operator],
    ) -> Result<Plan, PlanError> {
        self.solve_stages(&decomposition.target, &decomposition.stages, sites, operators)
    }

    /// Bind every stage or report the stage that could not be placed.
    ///
    /// Either a complete plan is returned or an error; never a partial plan.
    pub fn solve_stages(
        &self,
        target: &str,
        stages: &[Stage],
        sites: &[Site],
        operators: &[Operator],
    ) -> Result<Plan, PlanError> {
        if stages.is_empty() {
            return Ok(Plan::empty(target));
        }

        self.validate_inventory(sites, operators)?;

        let mut search = Search::new(self, stages, sites, operators);
        match search.run(0)? {
            Outcome::Found => {
                let plan = search.plan(target);
                info!(
                    target_item = target,
                    steps = plan.assignments.len(),
                    nodes = search.nodes,
                    "plan found"
                );
                Ok(plan)
            }
            Outcome::Dead | Outcome::OutOfBudget => {
                let err = search.failure();
                info!(target_item = target, nodes = search.nodes, "{}", err);
                Err(err)
            }
        }
    }

    fn validate_inventory(&self, sites: &[Site], operators: &[Operator]) -> Result<(), PlanError> {
        let mut site_ids = HashSet::new();
        for site in sites {
            if !site_ids.insert(site.id.as_str()) {
                return Err(PlanError::InvalidInventory(format!(
                    "duplicate site id {}",
                    site.id
                )));
            }

            for resource in &site.resources {
                let permitted = self
                    .catalog
                    .get(resource)
                    .is_some_and(|item| item.tier == Tier::P0)
                    && self.catalog.permits(site.site_type, resource);
                if permitted {
                    continue;
                }
                match self.options.resource_policy {
                    ResourcePolicy::Enforce => {
                        return Err(PlanError::InvalidInventory(format!(
                            "site {} ({}) cannot extract {}",
                            site.id, site.site_type, resource
                        )));
                    }
                    ResourcePolicy::Trust => {
                        debug!(site = %site.id, resource = %resource, "trusting declared resource");
                    }
                }
            }
        }

        let mut names = HashSet::new();
        for operator in operators {
            if !names.insert(operator.name.as_str()) {
                return Err(PlanError::InvalidInventory(format!(
                    "duplicate operator {}",
                    operator.name
                )));
            }
            if operator.capacity == 0 {
                return Err(PlanError::InvalidInventory(format!(
                    "operator {} has zero capacity",
                    operator.name
                )));
            }
        }

        Ok(())
    }
}

enum Outcome {
    Found,
    Dead,
    OutOfBudget,
}

#[derive(Debug, Clone, Copy)]
struct Choice {
    alternative: usize,
    site: usize,
    operator: usize,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    choice: Choice,
    added_stages: usize, // Stages committing would append (ProduceInPlan only)
    unused: usize,
    spare: usize,
}

#[derive(Debug)]
struct Failure {
    index: usize,
    stage: String,
    reason: InfeasibleReason,
}

struct Search<'s> {
    catalog: &'s Catalog,
    options: &'s SolveOptions,
    sites: &'s [Site],
    operators: &'s [Operator],
    site_class: Vec<usize>, // First site index with the same resource set
    stages: Vec<Stage>,
    site_used: Vec<bool>,
    spare: Vec<usize>,
    choices: Vec<Choice>, // One per bound stage, in stage order
    nodes: u64,
    failure: Option<Failure>,
}

impl<'s> Search<'s> {
    fn new(
        solver: &'s Solver<'_>,
        stages: &[Stage],
        sites: &'s [Site],
        operators: &'s [Operator],
    ) -> Self {
        let signatures: Vec<BTreeSet<&str>> = sites
            .iter()
            .map(|s| s.resources.iter().map(String::as_str).collect())
            .collect();
        let site_class = signatures
            .iter()
            .map(|sig| signatures.iter().position(|other| other == sig).unwrap_or(0))
            .collect();

        Self {
            catalog: solver.catalog,
            options: &solver.options,
            sites,
            operators,
            site_class,
            stages: stages.to_vec(),
            site_used: vec![false; sites.len()],
            spare: operators
                .iter()
                .map(|o| o.effective_capacity(solver.options.apply_skill_modifiers))
                .collect(),
            choices: Vec::with_capacity(stages.len()),
            nodes: 0,
            failure: None,
        }
    }

    fn run(&mut self, next: usize) -> Result<Outcome, CatalogError> {
        if next == self.stages.len() {
            return Ok(Outcome::Found);
        }

        self.nodes += 1;
        if self.options.node_budget.is_some_and(|budget| self.nodes > budget) {
            self.record(next, InfeasibleReason::BudgetExhausted);
            return Ok(Outcome::OutOfBudget);
        }

        let candidates = self.candidates(next);
        if candidates.is_empty() {
            let reason = self.diagnose(next);
            trace!(stage = %self.stages[next].item, %reason, "dead end");
            self.record(next, reason);
            return Ok(Outcome::Dead);
        }

        for candidate in candidates {
            let mark = self.commit(next, candidate.choice)?;
            match self.run(next + 1)? {
                Outcome::Dead => self.undo(candidate.choice, mark),
                outcome => return Ok(outcome),
            }
        }

        Ok(Outcome::Dead)
    }

    /// Ranked candidates for a stage, one per interchangeable group.
    ///
    /// Sites with the same resource set and operators with the same spare
    /// capacity are interchangeable, so only the best-ranked of each group is kept.
    fn candidates(&self, index: usize) -> Vec<Candidate> {
        let stage = &self.stages[index];
        let mut candidates = Vec::new();

        for (alternative, config) in stage.alternatives.iter().enumerate() {
            let added_stages = match self.options.import_policy {
                ImportPolicy::ProduceInPlan => config
                    .imported_inputs
                    .iter()
                    .filter(|i| !self.is_covered(i.as_str()))
                    .count(),
                ImportPolicy::External => 0,
            };

            for (site_index, site) in self.sites.iter().enumerate() {
                if self.site_used[site_index] || !config.mined_inputs.iter().all(|m| site.exposes(m)) {
                    continue;
                }
                let unused = site
                    .resources
                    .iter()
                    .filter(|r| !config.mined_inputs.contains(r))
                    .collect::<BTreeSet<_>>()
                    .len();

                for (operator, spare) in self.spare.iter().enumerate() {
                    if *spare == 0 {
                        continue;
                    }
                    candidates.push(Candidate {
                        choice: Choice {
                            alternative,
                            site: site_index,
                            operator,
                        },
                        added_stages,
                        unused,
                        spare: *spare,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| self.rank(a, b));

        let mut seen = HashSet::new();
        candidates.retain(|c| {
            seen.insert((
                c.choice.alternative,
                self.site_class[c.choice.site],
                c.spare,
            ))
        });
        candidates
    }

    fn rank(&self, a: &Candidate, b: &Candidate) -> Ordering {
        let site = match self.options.site_ordering {
            SiteOrdering::TightestFit => a.unused.cmp(&b.unused),
            SiteOrdering::InventoryOrder => Ordering::Equal,
        };
        let operator = match self.options.operator_ordering {
            OperatorOrdering::MostSpareCapacity => b.spare.cmp(&a.spare),
            OperatorOrdering::InventoryOrder => Ordering::Equal,
        };

        a.added_stages
            .cmp(&b.added_stages)
            .then(site)
            .then(operator)
            .then(a.choice.site.cmp(&b.choice.site))
            .then(a.choice.alternative.cmp(&b.choice.alternative))
            .then(a.choice.operator.cmp(&b.choice.operator))
    }

    /// Why a stage has no candidates
    fn diagnose(&self, index: usize) -> InfeasibleReason {
        let structural_match = self.stages[index].alternatives.iter().any(|config| {
            self.sites.iter().enumerate().any(|(i, site)| {
                !self.site_used[i] && config.mined_inputs.iter().all(|m| site.exposes(m))
            })
        });

        if structural_match {
            InfeasibleReason::CapacityExhausted
        } else {
            InfeasibleReason::NoMatchingSite
        }
    }

    /// Keep the deepest failure; a spent budget always wins.
    fn record(&mut self, index: usize, reason: InfeasibleReason) {
        let replace = self.failure.as_ref().is_none_or(|f| {
            reason == InfeasibleReason::BudgetExhausted || index >= f.index
        });
        if replace {
            self.failure = Some(Failure {
                index,
                stage: self.stages[index].item.clone(),
                reason,
            });
        }
    }

    fn commit(&mut self, index: usize, choice: Choice) -> Result<usize, CatalogError> {
        self.site_used[choice.site] = true;
        self.spare[choice.operator] -= 1;
        self.choices.push(choice);

        let mark = self.stages.len();
        if self.options.import_policy == ImportPolicy::ProduceInPlan {
            let imports = self.stages[index].alternatives[choice.alternative]
                .imported_inputs
                .clone();
            for import in imports {
                if !self.is_covered(&import) {
                    self.stages.push(chain::stage_for(self.catalog, &import)?);
                }
            }
        }

        debug!(
            stage = %self.stages[index].item,
            site = %self.sites[choice.site].id,
            operator = %self.operators[choice.operator].name,
            "bound stage"
        );
        Ok(mark)
    }

    /// Already a stage, or made on some bound site as a by-product.
    fn is_covered(&self, item: &str) -> bool {
        self.stages.iter().any(|s| s.item == item)
            || self
                .stages
                .iter()
                .zip(&self.choices)
                .any(|(stage, choice)| stage.alternatives[choice.alternative].produces(item))
    }

    fn undo(&mut self, choice: Choice, mark: usize) {
        self.stages.truncate(mark);
        self.choices.pop();
        self.spare[choice.operator] += 1;
        self.site_used[choice.site] = false;
        trace!(site = %self.sites[choice.site].id, "backtrack");
    }

    fn failure(&self) -> PlanError {
        match &self.failure {
            Some(f) => PlanError::Infeasible {
                stage: f.stage.clone(),
                reason: f.reason,
            },
            None => PlanError::Infeasible {
                stage: self.stages[0].item.clone(),
                reason: InfeasibleReason::NoMatchingSite,
            },
        }
    }

    fn plan(&self, target: &str) -> Plan {
        let assignments = self
            .stages
            .iter()
            .zip(&self.choices)
            .map(|(stage, choice)| {
                let site = &self.sites[choice.site];
                PlanAssignment {
                    operator: self.operators[choice.operator].name.clone(),
                    site: site.id.clone(),
                    site_type: site.site_type,
                    configuration: stage.alternatives[choice.alternative].clone(),
                    output: stage.item.clone(),
                }
            })
            .collect();

        Plan {
            target: target.to_string(),
            assignments,
        }
    }
}

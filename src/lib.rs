//! Production chain planner for planetary industry
//!
//! Given a catalog of tiered goods, an inventory of sites and operators, and
//! a target good, finds an assignment of production stages to sites and
//! operators that covers the target's whole ingredient tree.

pub mod catalog;
pub mod chain;
pub mod configurations;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod plan;
pub mod solver;

pub use catalog::Catalog;
pub use chain::{AnchorChoice, DecomposeOptions, Decomposition, decompose};
pub use error::{CatalogError, InfeasibleReason, PlanError};
pub use models::{FactoryConfiguration, Operator, Plan, PlanAssignment, Site, SiteType, Stage, Tier};
pub use plan::{PlanDocument, PlanResponse, PlanStep, PlanSummary, materialize, summarize};
pub use solver::{
    ImportPolicy, OperatorOrdering, ResourcePolicy, SiteOrdering, SolveOptions, Solver,
};

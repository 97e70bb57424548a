//! Integration tests for the planning pipeline.
//!
//! Exercises: Catalog → decompose → Solver → materialize / summarize
//!
//! All tests run against the shipped catalog with in-memory inventories.

use std::collections::{BTreeMap, BTreeSet};

use pi_planner::chain;
use pi_planner::plan::PlanStatus;
use pi_planner::{
    Catalog, CatalogError, DecomposeOptions, InfeasibleReason, Operator, Plan, PlanError, PlanResponse, Site,
    SiteType, SolveOptions, Solver, Tier, decompose, materialize, summarize,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn site(id: &str, site_type: SiteType, resources: &[&str]) -> Site {
    Site {
        id: id.to_string(),
        site_type,
        resources: resources.iter().map(|s| s.to_string()).collect(),
    }
}

fn operator(name: &str, capacity: usize) -> Operator {
    Operator {
        name: name.to_string(),
        capacity,
        skills: BTreeMap::new(),
    }
}

/// One site of every type, each declaring everything its type can extract.
fn full_inventory(catalog: &Catalog) -> Vec<Site> {
    SiteType::ALL
        .into_iter()
        .map(|t| {
            let id = format!("{}-1", t);
            site(&id, t, &catalog.resources_on(t))
        })
        .collect()
}

fn producible_items(catalog: &Catalog) -> Vec<String> {
    catalog
        .items()
        .filter(|i| i.tier != Tier::P0)
        .map(|i| i.name.clone())
        .collect()
}

fn plan_for(target: &str, sites: &[Site], operators: &[Operator]) -> Result<Plan, PlanError> {
    Solver::new(Catalog::standard()).plan(target, sites, operators)
}

/// Leaves reached by everything the plan mines or imports.
fn plan_leaves(catalog: &Catalog, plan: &Plan) -> BTreeSet<String> {
    let mut leaves = BTreeSet::new();
    for step in &plan.assignments {
        leaves.extend(step.configuration.mined_inputs.iter().cloned());
        for import in &step.configuration.imported_inputs {
            let tree = chain::expand(catalog, import).unwrap();
            leaves.extend(chain::raw_resources(&tree));
        }
    }
    leaves
}

// ── Whole-catalog properties ───────────────────────────────────────────

#[test]
fn every_producible_item_solves_on_a_full_inventory() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let operators = vec![operator("Fleet", 10)];

    for target in producible_items(catalog) {
        let plan = plan_for(&target, &sites, &operators)
            .unwrap_or_else(|e| panic!("{target} failed: {e}"));
        assert!(!plan.is_empty(), "{target} produced an empty plan");
        assert_eq!(plan.target, target);
        assert!(
            plan.assignments.iter().any(|a| a.configuration.produces(&target)),
            "{target} is never produced"
        );
    }
}

#[test]
fn solving_is_deterministic() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let operators = vec![operator("Ana", 2), operator("Bo", 2), operator("Cy", 2)];

    for target in producible_items(catalog) {
        let first = plan_for(&target, &sites, &operators);
        let second = plan_for(&target, &sites, &operators);
        assert_eq!(first, second, "{target}");
    }
}

#[test]
fn plans_reproduce_the_ingredient_tree_leaves() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let operators = vec![operator("Fleet", 10)];

    for target in producible_items(catalog) {
        let plan = plan_for(&target, &sites, &operators).unwrap();
        let decomposition = decompose(catalog, &target, &DecomposeOptions::default()).unwrap();
        assert_eq!(
            plan_leaves(catalog, &plan),
            decomposition.raw_resources(),
            "{target}"
        );
    }
}

#[test]
fn no_operator_exceeds_capacity() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let operators = vec![operator("Ana", 1), operator("Bo", 1), operator("Cy", 1)];

    for target in producible_items(catalog) {
        let plan = plan_for(&target, &sites, &operators).unwrap();
        for op in &operators {
            assert!(plan.steps_for(&op.name) <= op.capacity, "{target}");
        }
    }
}

#[test]
fn mined_resources_are_declared_by_the_site() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let operators = vec![operator("Fleet", 10)];

    for target in producible_items(catalog) {
        let plan = plan_for(&target, &sites, &operators).unwrap();
        for step in &plan.assignments {
            let site = sites.iter().find(|s| s.id == step.site).unwrap();
            assert_eq!(site.site_type, step.site_type);
            for mined in &step.configuration.mined_inputs {
                assert!(site.exposes(mined), "{target}: {} on {}", mined, site.id);
            }
        }
    }
}

#[test]
fn sites_are_never_reused_within_a_plan() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let operators = vec![operator("Fleet", 10)];

    for target in producible_items(catalog) {
        let plan = plan_for(&target, &sites, &operators).unwrap();
        let used: BTreeSet<&str> = plan.assignments.iter().map(|a| a.site.as_str()).collect();
        assert_eq!(used.len(), plan.assignments.len(), "{target}");
    }
}

// ── Boundaries ─────────────────────────────────────────────────────────

#[test]
fn raw_target_returns_empty_plan() {
    let plan = plan_for("base_metals", &[], &[]).unwrap();
    assert!(plan.is_empty());

    let response = PlanResponse::from_result(&Ok(plan));
    assert!(response.is_ok());
    assert_eq!(response.plan, Some(Vec::new()));
}

#[test]
fn zero_sites_or_operators_is_infeasible() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);

    for target in ["water", "coolant", "condensates", "broadcast_node"] {
        let err = plan_for(target, &[], &[operator("Ana", 5)]).unwrap_err();
        assert!(err.is_infeasible(), "{target}");

        let err = plan_for(target, &sites, &[]).unwrap_err();
        assert!(err.is_infeasible(), "{target}");
    }
}

// ── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn imported_finished_good_takes_three_steps() {
    let sites = vec![
        site("B1", SiteType::Barren, &[]),
        site("G1", SiteType::Gas, &[]),
        site("I1", SiteType::Ice, &[]),
    ];
    let plan = plan_for("broadcast_node", &sites, &[operator("Ana", 3)]).unwrap();

    assert_eq!(plan.assignments.len(), 3);
    for step in &plan.assignments {
        assert!(!step.configuration.imported_inputs.is_empty());
        assert!(step.configuration.mined_inputs.is_empty());
        assert_eq!(step.operator, "Ana");
    }
    assert_eq!(plan.assignments[0].output, "broadcast_node");
}

#[test]
fn locally_sourced_finished_good_mines_once() {
    let sites = vec![
        site("B1", SiteType::Barren, &["base_metals"]),
        site("G1", SiteType::Gas, &[]),
        site("I1", SiteType::Ice, &[]),
    ];
    let plan = plan_for("nano_factory", &sites, &[operator("Ana", 3)]).unwrap();

    let mining: Vec<_> = plan
        .assignments
        .iter()
        .filter(|a| !a.configuration.mined_inputs.is_empty())
        .collect();
    assert_eq!(mining.len(), 1);
    assert_eq!(mining[0].site, "B1");
    assert_eq!(mining[0].configuration.mined_inputs, vec!["base_metals"]);
    assert!(
        !mining[0]
            .configuration
            .imported_inputs
            .contains(&"reactive_metals".to_string())
    );
}

#[test]
fn single_slot_operator_cannot_cover_two_stages() {
    let sites = vec![
        site("B1", SiteType::Barren, &["base_metals"]),
        site("G1", SiteType::Gas, &[]),
        site("I1", SiteType::Ice, &[]),
    ];
    let err = plan_for("nano_factory", &sites, &[operator("Ana", 1)]).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Infeasible {
            reason: InfeasibleReason::CapacityExhausted,
            ..
        }
    ));

    let response = PlanResponse::from_result(&Err(err));
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "infeasible");
    assert!(json["stage"].is_string());
}

#[test]
fn produced_imports_cover_the_whole_chain() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let options = SolveOptions {
        import_policy: pi_planner::ImportPolicy::ProduceInPlan,
        ..SolveOptions::default()
    };
    let solver = Solver::with_options(catalog, options);

    for target in ["water", "coolant", "condensates"] {
        let plan = solver
            .plan(target, &sites, &[operator("Fleet", 10)])
            .unwrap_or_else(|e| panic!("{target} failed: {e}"));

        let produced: BTreeSet<&str> = plan
            .assignments
            .iter()
            .flat_map(|a| a.configuration.outputs.iter().map(String::as_str))
            .collect();
        for step in &plan.assignments {
            for import in &step.configuration.imported_inputs {
                assert!(produced.contains(import.as_str()), "{target}: {import}");
            }
        }
    }
}

#[test]
fn document_and_summary_agree_with_plan() {
    let catalog = Catalog::standard();
    let sites = full_inventory(catalog);
    let plan = plan_for("broadcast_node", &sites, &[operator("Ana", 3)]).unwrap();

    let document = materialize(&plan);
    assert_eq!(document.plan.len(), plan.assignments.len());
    assert_eq!(document.plan[0].output, "broadcast_node");

    let summary = summarize(catalog, &plan).unwrap();
    assert_eq!(summary.steps, 3);
    assert_eq!(summary.operator_load, vec![("Ana".to_string(), 3)]);
    assert_eq!(
        summary.raw_resources,
        decompose(catalog, "broadcast_node", &DecomposeOptions::default())
            .unwrap()
            .raw_resources()
    );
}

// ── Data errors ────────────────────────────────────────────────────────

fn catalog_with_untraceable_input() -> Catalog {
    Catalog::builder()
        .raw("ore", &[SiteType::Lava])
        .item("metal", Tier::P1, &["ore"])
        .item("ghost", Tier::P1, &[])
        .item("alloy", Tier::P2, &["metal", "ghost"])
        .build()
}

#[test]
fn malformed_catalog_is_a_data_error_not_infeasibility() {
    let catalog = catalog_with_untraceable_input();
    let sites = vec![site("L1", SiteType::Lava, &["ore"])];
    let result = Solver::new(&catalog).plan("alloy", &sites, &[operator("Ana", 5)]);

    let err = result.clone().unwrap_err();
    assert!(matches!(
        err,
        PlanError::Catalog(CatalogError::Malformed { ref item, .. }) if item == "ghost"
    ));
    assert!(!err.is_infeasible());

    let response = PlanResponse::from_result(&result);
    assert_eq!(response.status, PlanStatus::InvalidData);
    assert!(response.stage.is_none());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "invalid_data");
}

#[test]
fn unknown_target_is_a_data_error_even_without_inventory() {
    let result = plan_for("spice", &[], &[]);
    assert_eq!(
        result,
        Err(PlanError::Catalog(CatalogError::UnknownItem(
            "spice".to_string()
        )))
    );
    assert_eq!(
        PlanResponse::from_result(&result).status,
        PlanStatus::InvalidData
    );
}

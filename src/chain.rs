//! Chain decomposition
//!
//! Expands a target into its full ingredient tree, then collapses the tree
//! into site-sized production stages.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Catalog;
use crate::configurations::{self, configurations_for};
use crate::error::CatalogError;
use crate::models::{Item, Stage, Tier};

/// A node of the ingredient tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientNode {
    pub item: String,
    pub tier: Tier,
    pub inputs: Vec<IngredientNode>,
}

/// Expand a target down to its raw resources
///
/// Every entry on the way is checked against the tier arity rules, so an
/// input that cannot be traced to tier 0 surfaces as a catalog error.
pub fn expand(catalog: &Catalog, target: &str) -> Result<IngredientNode, CatalogError> {
    expand_recursive(catalog, target, 0)
}

fn expand_recursive(
    catalog: &Catalog,
    name: &str,
    depth: usize,
) -> Result<IngredientNode, CatalogError> {
    const MAX_DEPTH: usize = 8; // Tiers strictly descend, so real chains stop at 4

    if depth > MAX_DEPTH {
        return Err(CatalogError::malformed(
            name,
            "ingredient chain too deep, possible cycle",
        ));
    }

    let item = catalog.item(name)?;
    catalog.check_entry(item)?;

    let mut inputs = Vec::with_capacity(item.inputs.len());
    for input in &item.inputs {
        inputs.push(expand_recursive(catalog, input, depth + 1)?);
    }

    Ok(IngredientNode {
        item: item.name.clone(),
        tier: item.tier,
        inputs,
    })
}

/// The tier-0 leaves of a tree
pub fn raw_resources(node: &IngredientNode) -> BTreeSet<String> {
    let mut leaves = BTreeSet::new();
    collect_leaves(node, &mut leaves);
    leaves
}

fn collect_leaves(node: &IngredientNode, leaves: &mut BTreeSet<String>) {
    if node.inputs.is_empty() {
        leaves.insert(node.item.clone());
    }
    for input in &node.inputs {
        collect_leaves(input, leaves);
    }
}

/// Format an ingredient tree as a readable string
pub fn format_ingredient_tree(node: &IngredientNode, indent: usize) -> String {
    let mut output = String::new();
    let prefix = "  ".repeat(indent);

    if node.tier == Tier::P0 {
        output.push_str(&format!("{}- {} (raw)\n", prefix, node.item));
    } else {
        output.push_str(&format!("{}{} [{}]\n", prefix, node.item, node.tier));
        for input in &node.inputs {
            output.push_str(&format_ingredient_tree(input, indent + 1));
        }
    }

    output
}

/// Which tier-3 chain a finished good is assembled alongside
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorChoice {
    /// The chain with the fewest tier-2 ingredients, first declared on ties.
    #[default]
    ShortestChain,
    /// Always the first declared tier-3 input.
    FirstListed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecomposeOptions {
    pub anchor: AnchorChoice,
}

/// A target's ingredient tree and the stages that produce it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub target: String,
    pub tier: Tier,
    pub tree: IngredientNode,
    pub stages: Vec<Stage>, // Highest tier first
}

impl Decomposition {
    pub fn raw_resources(&self) -> BTreeSet<String> {
        raw_resources(&self.tree)
    }
}

/// Decompose a target into the minimal ordered stage list
///
/// P1 to P3 targets fit on one site. A P4 target needs one site per tier-3
/// chain; the finished good is assembled on the anchor chain's site.
pub fn decompose(
    catalog: &Catalog,
    target: &str,
    options: &DecomposeOptions,
) -> Result<Decomposition, CatalogError> {
    let tree = expand(catalog, target)?;
    let item = catalog.item(target)?;

    let stages = match item.tier {
        Tier::P0 => Vec::new(),
        Tier::P1 | Tier::P2 | Tier::P3 => vec![stage_for(catalog, target)?],
        Tier::P4 => finished_good_stages(catalog, item, options)?,
    };

    debug!(item = target, stages = stages.len(), "decomposed production chain");

    Ok(Decomposition {
        target: target.to_string(),
        tier: item.tier,
        tree,
        stages,
    })
}

fn finished_good_stages(
    catalog: &Catalog,
    item: &Item,
    options: &DecomposeOptions,
) -> Result<Vec<Stage>, CatalogError> {
    let chains = configurations::anchors(catalog, item);
    let anchor = choose_anchor(catalog, &chains, options.anchor)?
        .ok_or_else(|| CatalogError::malformed(&item.name, "no tier-3 inputs"))?;

    let alternatives = configurations_for(catalog, &item.name)?
        .into_iter()
        .filter(|c| c.produces(anchor))
        .collect();

    let mut stages = vec![Stage {
        item: item.name.clone(),
        tier: item.tier,
        alternatives,
    }];
    for chain in chains.iter().filter(|c| **c != anchor) {
        stages.push(stage_for(catalog, chain)?);
    }

    Ok(stages)
}

fn choose_anchor<'a>(
    catalog: &Catalog,
    chains: &[&'a str],
    choice: AnchorChoice,
) -> Result<Option<&'a str>, CatalogError> {
    match choice {
        AnchorChoice::FirstListed => Ok(chains.first().copied()),
        AnchorChoice::ShortestChain => {
            let mut best: Option<(&'a str, usize)> = None;
            for chain in chains {
                let length = catalog.item(chain)?.inputs.len();
                if best.is_none_or(|(_, shortest)| length < shortest) {
                    best = Some((*chain, length));
                }
            }
            Ok(best.map(|(chain, _)| chain))
        }
    }
}

/// The single stage that produces an intermediate good
pub fn stage_for(catalog: &Catalog, item: &str) -> Result<Stage, CatalogError> {
    let entry = catalog.item(item)?;
    if entry.tier == Tier::P0 {
        return Err(CatalogError::WrongTier {
            item: item.to_string(),
            expected: Tier::P1,
            actual: Tier::P0,
        });
    }

    Ok(Stage {
        item: item.to_string(),
        tier: entry.tier,
        alternatives: configurations_for(catalog, item)?,
    })
}

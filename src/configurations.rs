//! Legal single-site production shapes
//!
//! Four families cover every site: extraction (P0 -> P1), basic assembly
//! (P1 -> P2), direct assembly (P0 -> P2 on one site) and advanced
//! (P2 -> P3, optionally finishing a P4 on the same site).

use crate::catalog::Catalog;
use crate::chain;
use crate::error::CatalogError;
use crate::models::{FactoryConfiguration, Item, Tier};

fn expect_tier<'c>(catalog: &'c Catalog, name: &str, tier: Tier) -> Result<&'c Item, CatalogError> {
    let item = catalog.item(name)?;
    if item.tier != tier {
        return Err(CatalogError::WrongTier {
            item: name.to_string(),
            expected: tier,
            actual: item.tier,
        });
    }
    catalog.check_entry(item)?;
    Ok(item)
}

/// Mine one resource per output and refine each into its P1 good
pub fn extraction(catalog: &Catalog, outputs: &[&str]) -> Result<FactoryConfiguration, CatalogError> {
    if outputs.is_empty() {
        return Ok(FactoryConfiguration::empty());
    }

    let mut mined_inputs = Vec::with_capacity(outputs.len());
    for output in outputs {
        let item = expect_tier(catalog, output, Tier::P1)?;
        mined_inputs.push(item.inputs[0].clone());
    }

    Ok(FactoryConfiguration {
        start_tier: Tier::P0,
        end_tier: Tier::P1,
        imported_inputs: Vec::new(),
        mined_inputs,
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
    })
}

/// Assemble P2 goods from imported P1 goods
pub fn basic_assembly(catalog: &Catalog, outputs: &[&str]) -> Result<FactoryConfiguration, CatalogError> {
    if outputs.is_empty() {
        return Ok(FactoryConfiguration::empty());
    }

    let mut imported_inputs: Vec<String> = Vec::new();
    for output in outputs {
        let item = expect_tier(catalog, output, Tier::P2)?;
        for input in &item.inputs {
            if !imported_inputs.contains(input) {
                imported_inputs.push(input.clone());
            }
        }
    }

    Ok(FactoryConfiguration {
        start_tier: Tier::P1,
        end_tier: Tier::P2,
        imported_inputs,
        mined_inputs: Vec::new(),
        outputs: outputs.iter().map(|s| s.to_string()).collect(),
    })
}

/// Mine both leaves of a P2 good and run the whole chain on one site.
///
/// Returns `None` when no site type can extract both resources.
pub fn direct_assembly(
    catalog: &Catalog,
    output: &str,
) -> Result<Option<FactoryConfiguration>, CatalogError> {
    let item = expect_tier(catalog, output, Tier::P2)?;
    let ingredients: Vec<&str> = item.inputs.iter().map(String::as_str).collect();
    let refine = extraction(catalog, &ingredients)?;

    let leaves: Vec<&str> = refine.mined_inputs.iter().map(String::as_str).collect();
    if catalog.shared_site_types(&leaves).is_empty() {
        return Ok(None);
    }

    let mut outputs = refine.outputs;
    outputs.push(output.to_string());

    Ok(Some(FactoryConfiguration {
        start_tier: Tier::P0,
        end_tier: Tier::P2,
        imported_inputs: Vec::new(),
        mined_inputs: refine.mined_inputs,
        outputs,
    }))
}

/// Refine one P3 chain (the anchor) from imported P2 goods, optionally
/// finishing a P4 on the same site.
///
/// When finishing a P4, its other P3 inputs are imported. A P1 input (only
/// legal for locally sourced items) is made on site from a mined resource.
pub fn advanced(
    catalog: &Catalog,
    anchor: &str,
    finished: Option<&str>,
) -> Result<FactoryConfiguration, CatalogError> {
    let anchor_item = expect_tier(catalog, anchor, Tier::P3)?;

    let mut imported_inputs = anchor_item.inputs.clone();
    let mut mined_inputs = Vec::new();
    let mut outputs = vec![anchor.to_string()];
    let mut end_tier = Tier::P3;

    if let Some(name) = finished {
        let item = expect_tier(catalog, name, Tier::P4)?;
        if !item.inputs.iter().any(|i| i == anchor) {
            return Err(CatalogError::malformed(
                name,
                format!("{} is not one of its inputs", anchor),
            ));
        }

        for input in item.inputs.iter().filter(|i| *i != anchor) {
            let ingredient = catalog.item(input)?;
            match ingredient.tier {
                Tier::P3 => imported_inputs.push(input.clone()),
                Tier::P1 if catalog.requires_local_sourcing(name) => {
                    let refine = extraction(catalog, &[input.as_str()])?;
                    mined_inputs.extend(refine.mined_inputs);
                    outputs.extend(refine.outputs);
                }
                tier => {
                    return Err(CatalogError::malformed(
                        name,
                        format!("input {} is {}, which no advanced site can use", input, tier),
                    ));
                }
            }
        }

        outputs.push(name.to_string());
        end_tier = Tier::P4;
    }

    Ok(FactoryConfiguration {
        start_tier: Tier::P2,
        end_tier,
        imported_inputs,
        mined_inputs,
        outputs,
    })
}

/// Every legal single-site shape whose final output is `item`.
///
/// The ingredient tree is traced to tier 0 first, so a malformed entry
/// anywhere below `item` is reported instead of yielding configurations.
pub fn configurations_for(
    catalog: &Catalog,
    item: &str,
) -> Result<Vec<FactoryConfiguration>, CatalogError> {
    chain::expand(catalog, item)?;
    let entry = catalog.item(item)?;

    match entry.tier {
        Tier::P0 => Ok(Vec::new()),
        Tier::P1 => Ok(vec![extraction(catalog, &[item])?]),
        Tier::P2 => {
            let mut configurations = Vec::with_capacity(2);
            if let Some(direct) = direct_assembly(catalog, item)? {
                configurations.push(direct);
            }
            configurations.push(basic_assembly(catalog, &[item])?);
            Ok(configurations)
        }
        Tier::P3 => Ok(vec![advanced(catalog, item, None)?]),
        Tier::P4 => anchors(catalog, entry)
            .into_iter()
            .map(|anchor| advanced(catalog, anchor, Some(item)))
            .collect(),
    }
}

/// The P3 inputs of a finished good, in declaration order
pub fn anchors<'i>(catalog: &Catalog, item: &'i Item) -> Vec<&'i str> {
    item.inputs
        .iter()
        .filter(|i| catalog.get(i).is_some_and(|x| x.tier == Tier::P3))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Family, SiteType};

    fn standard() -> &'static Catalog {
        Catalog::standard()
    }

    #[test]
    fn empty_output_lists_yield_the_empty_configuration() {
        let config = extraction(standard(), &[]).unwrap();
        assert!(config.is_empty());
        assert_eq!(config.family(), Family::Empty);

        let config = basic_assembly(standard(), &[]).unwrap();
        assert_eq!(config, FactoryConfiguration::empty());
    }

    #[test]
    fn extraction_mines_one_resource_per_output() {
        let config = extraction(standard(), &["water", "oxygen"]).unwrap();
        assert_eq!(config.mined_inputs, vec!["aqueous_liquids", "noble_gas"]);
        assert_eq!(config.outputs, vec!["water", "oxygen"]);
        assert!(config.imported_inputs.is_empty());
        assert_eq!(config.family(), Family::Extraction);
    }

    #[test]
    fn extraction_rejects_other_tiers() {
        let err = extraction(standard(), &["coolant"]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::WrongTier {
                item: "coolant".to_string(),
                expected: Tier::P1,
                actual: Tier::P2,
            }
        );
    }

    #[test]
    fn basic_assembly_imports_shared_ingredients_once() {
        let config = basic_assembly(standard(), &["coolant", "synthetic_oil"]).unwrap();
        assert_eq!(config.imported_inputs, vec!["water", "electrolytes", "oxygen"]);
        assert!(config.mined_inputs.is_empty());
    }

    #[test]
    fn p2_offers_direct_assembly_when_one_site_type_has_both_leaves() {
        let configs = configurations_for(standard(), "coolant").unwrap();
        assert_eq!(configs.len(), 2);

        let direct = &configs[0];
        assert_eq!(direct.family(), Family::DirectAssembly);
        assert_eq!(direct.mined_inputs, vec!["aqueous_liquids", "ionic_solutions"]);
        assert_eq!(direct.outputs, vec!["water", "electrolytes", "coolant"]);
        assert!(direct.imported_inputs.is_empty());

        assert_eq!(configs[1].family(), Family::BasicAssembly);
        assert_eq!(configs[1].imported_inputs, vec!["water", "electrolytes"]);
    }

    #[test]
    fn p2_without_shared_site_type_is_import_only() {
        // felsic magma is Lava-only, autotrophs Temperate-only
        let configs = configurations_for(standard(), "microfiber_shielding").unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].family(), Family::BasicAssembly);
    }

    #[test]
    fn p4_without_local_sourcing_imports_everything() {
        let configs = configurations_for(standard(), "broadcast_node").unwrap();
        assert_eq!(configs.len(), 3);
        for config in &configs {
            assert!(config.mined_inputs.is_empty());
            assert!(config.produces("broadcast_node"));
            assert_eq!(config.start_tier, Tier::P2);
            assert_eq!(config.end_tier, Tier::P4);
        }

        assert_eq!(
            configs[0].imported_inputs,
            vec!["biocells", "silicate_glass", "data_chips", "high_tech_transmitters"]
        );
        assert_eq!(configs[0].outputs, vec!["neocoms", "broadcast_node"]);
    }

    #[test]
    fn p4_with_local_sourcing_mines_the_tier_one_input() {
        let configs = configurations_for(standard(), "nano_factory").unwrap();
        assert_eq!(configs.len(), 2);
        for config in &configs {
            assert_eq!(config.mined_inputs, vec!["base_metals"]);
            assert!(config.produces("reactive_metals"));
            assert!(!config.imported_inputs.contains(&"reactive_metals".to_string()));
        }
        assert_eq!(
            configs[0].imported_inputs,
            vec!["fertilizer", "polytextiles", "ukomi_superconductors"]
        );
    }

    #[test]
    fn p3_and_p1_have_a_single_shape() {
        let p3 = configurations_for(standard(), "condensates").unwrap();
        assert_eq!(p3.len(), 1);
        assert_eq!(p3[0].imported_inputs, vec!["oxides", "coolant"]);
        assert_eq!(p3[0].end_tier, Tier::P3);

        let p1 = configurations_for(standard(), "silicon").unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].mined_inputs, vec!["felsic_magma"]);
    }

    #[test]
    fn raw_resources_need_no_configuration() {
        assert!(configurations_for(standard(), "base_metals").unwrap().is_empty());
    }

    #[test]
    fn untraceable_input_is_a_data_error() {
        let catalog = Catalog::builder()
            .raw("ore", &[SiteType::Lava])
            .item("metal", Tier::P1, &["ore"])
            .item("ghost", Tier::P1, &[])
            .item("alloy", Tier::P2, &["metal", "ghost"])
            .build();

        let err = configurations_for(&catalog, "alloy").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { ref item, .. } if item == "ghost"));
    }

    #[test]
    fn unknown_target() {
        assert_eq!(
            configurations_for(standard(), "spice").unwrap_err(),
            CatalogError::UnknownItem("spice".to_string())
        );
    }
}

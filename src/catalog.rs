//! Static reference data: items, tiers, and where raw resources can be extracted
//!
//! The shipped catalog is built once per process and shared by reference.
//! Custom catalogs can be assembled with [`CatalogBuilder`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::error::CatalogError;
use crate::models::{Item, SiteType, Tier};

type Recipe = (&'static str, &'static [&'static str]);

const EXTRACTION: &[(SiteType, [&str; 5])] = &[
    (
        SiteType::Barren,
        ["aqueous_liquids", "base_metals", "carbon_compounds", "micro_organisms", "noble_metals"],
    ),
    (
        SiteType::Gas,
        ["aqueous_liquids", "base_metals", "ionic_solutions", "noble_gas", "reactive_gas"],
    ),
    (
        SiteType::Ice,
        ["aqueous_liquids", "heavy_metals", "micro_organisms", "noble_gas", "planktic_colonies"],
    ),
    (
        SiteType::Lava,
        ["base_metals", "felsic_magma", "heavy_metals", "non_cs_crystals", "suspended_plasma"],
    ),
    (
        SiteType::Oceanic,
        ["aqueous_liquids", "carbon_compounds", "complex_organisms", "micro_organisms", "planktic_colonies"],
    ),
    (
        SiteType::Plasma,
        ["base_metals", "heavy_metals", "noble_metals", "non_cs_crystals", "suspended_plasma"],
    ),
    (
        SiteType::Storm,
        ["aqueous_liquids", "base_metals", "ionic_solutions", "noble_gas", "suspended_plasma"],
    ),
    (
        SiteType::Temperate,
        ["aqueous_liquids", "autotrophs", "carbon_compounds", "complex_organisms", "micro_organisms"],
    ),
];

const RAW_RESOURCES: &[&str] = &[
    "aqueous_liquids",
    "autotrophs",
    "base_metals",
    "carbon_compounds",
    "complex_organisms",
    "felsic_magma",
    "heavy_metals",
    "ionic_solutions",
    "micro_organisms",
    "noble_gas",
    "noble_metals",
    "non_cs_crystals",
    "planktic_colonies",
    "reactive_gas",
    "suspended_plasma",
];

const P1_ITEMS: &[Recipe] = &[
    ("bacteria", &["micro_organisms"]),
    ("biofuels", &["carbon_compounds"]),
    ("biomass", &["planktic_colonies"]),
    ("chiral_structures", &["non_cs_crystals"]),
    ("electrolytes", &["ionic_solutions"]),
    ("industrial_fibers", &["autotrophs"]),
    ("oxidizing_compound", &["reactive_gas"]),
    ("oxygen", &["noble_gas"]),
    ("plasmoids", &["suspended_plasma"]),
    ("precious_metals", &["noble_metals"]),
    ("proteins", &["complex_organisms"]),
    ("reactive_metals", &["base_metals"]),
    ("silicon", &["felsic_magma"]),
    ("toxic_metals", &["heavy_metals"]),
    ("water", &["aqueous_liquids"]),
];

const P2_ITEMS: &[Recipe] = &[
    ("biocells", &["precious_metals", "biofuels"]),
    ("construction_blocks", &["toxic_metals", "reactive_metals"]),
    ("consumer_electronics", &["chiral_structures", "toxic_metals"]),
    ("coolant", &["water", "electrolytes"]),
    ("enriched_uranium", &["toxic_metals", "precious_metals"]),
    ("fertilizer", &["proteins", "bacteria"]),
    ("genetically_enhanced_livestock", &["proteins", "biomass"]),
    ("livestock", &["biofuels", "proteins"]),
    ("mechanical_parts", &["precious_metals", "reactive_metals"]),
    ("microfiber_shielding", &["silicon", "industrial_fibers"]),
    ("miniature_electronics", &["silicon", "chiral_structures"]),
    ("nanites", &["reactive_metals", "bacteria"]),
    ("oxides", &["oxygen", "oxidizing_compound"]),
    ("polyaramids", &["industrial_fibers", "oxidizing_compound"]),
    ("polytextiles", &["industrial_fibers", "biofuels"]),
    ("rocket_fuel", &["electrolytes", "plasmoids"]),
    ("silicate_glass", &["silicon", "oxidizing_compound"]),
    ("superconductors", &["water", "plasmoids"]),
    ("supertensile_plastics", &["oxygen", "biomass"]),
    ("synthetic_oil", &["oxygen", "electrolytes"]),
    ("test_cultures", &["water", "bacteria"]),
    ("transmitter", &["plasmoids", "chiral_structures"]),
    ("viral_agent", &["biomass", "bacteria"]),
    ("water_cooled_cpu", &["reactive_metals", "water"]),
];

const P3_ITEMS: &[Recipe] = &[
    ("biotech_research_reports", &["nanites", "livestock", "construction_blocks"]),
    ("camera_drones", &["silicate_glass", "rocket_fuel"]),
    ("condensates", &["oxides", "coolant"]),
    ("cryoprotectant_solution", &["test_cultures", "synthetic_oil", "fertilizer"]),
    ("data_chips", &["supertensile_plastics", "microfiber_shielding"]),
    ("gel_matrix_biopaste", &["oxides", "biocells", "superconductors"]),
    ("guidance_systems", &["water_cooled_cpu", "transmitter"]),
    ("hazmat_detection_systems", &["polytextiles", "viral_agent", "transmitter"]),
    ("hermetic_membranes", &["polyaramids", "genetically_enhanced_livestock"]),
    ("high_tech_transmitters", &["polyaramids", "transmitter"]),
    ("industrial_explosives", &["fertilizer", "polytextiles"]),
    ("neocoms", &["biocells", "silicate_glass"]),
    ("nuclear_reactors", &["microfiber_shielding", "enriched_uranium"]),
    ("planetary_vehicles", &["supertensile_plastics", "mechanical_parts", "miniature_electronics"]),
    ("robotics", &["mechanical_parts", "consumer_electronics"]),
    ("smartfab_units", &["construction_blocks", "miniature_electronics"]),
    ("supercomputers", &["water_cooled_cpu", "coolant", "consumer_electronics"]),
    ("synthetic_synapses", &["supertensile_plastics", "test_cultures"]),
    ("transcranial_microcontrollers", &["biocells", "nanites"]),
    ("ukomi_superconductors", &["synthetic_oil", "superconductors"]),
    ("vaccines", &["livestock", "viral_agent"]),
];

const P4_ITEMS: &[Recipe] = &[
    ("broadcast_node", &["neocoms", "data_chips", "high_tech_transmitters"]),
    (
        "integrity_response_drones",
        &["gel_matrix_biopaste", "hazmat_detection_systems", "planetary_vehicles"],
    ),
    ("nano_factory", &["industrial_explosives", "ukomi_superconductors", "reactive_metals"]),
    ("organic_mortar_applicators", &["condensates", "robotics", "bacteria"]),
    (
        "recursive_computing_module",
        &["synthetic_synapses", "guidance_systems", "transcranial_microcontrollers"],
    ),
    (
        "self_harmonizing_power_core",
        &["camera_drones", "nuclear_reactors", "hermetic_membranes"],
    ),
    ("sterile_conduits", &["smartfab_units", "vaccines", "water"]),
    (
        "wetware_mainframe",
        &["supercomputers", "biotech_research_reports", "cryoprotectant_solution"],
    ),
];

/// Finished goods whose tier-1 input has to be made from a resource mined on the assembling site.
const LOCAL_SOURCING: &[&str] = &["nano_factory", "organic_mortar_applicators", "sterile_conduits"];

static STANDARD: LazyLock<Catalog> = LazyLock::new(build_standard);

fn build_standard() -> Catalog {
    let mut builder = Catalog::builder();

    for resource in RAW_RESOURCES {
        let site_types: Vec<SiteType> = EXTRACTION
            .iter()
            .filter(|(_, resources)| resources.contains(resource))
            .map(|(site_type, _)| *site_type)
            .collect();
        builder = builder.raw(resource, &site_types);
    }

    for (tier, recipes) in [
        (Tier::P1, P1_ITEMS),
        (Tier::P2, P2_ITEMS),
        (Tier::P3, P3_ITEMS),
        (Tier::P4, P4_ITEMS),
    ] {
        for (name, inputs) in recipes {
            builder = builder.item(name, tier, inputs);
        }
    }

    for name in LOCAL_SOURCING {
        builder = builder.local_sourcing(name);
    }

    builder.build()
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: BTreeMap<String, Item>,
    extraction: BTreeMap<String, Vec<SiteType>>,
    local_sourcing: BTreeSet<String>,
}

impl Catalog {
    /// The shipped catalog, constructed on first use.
    pub fn standard() -> &'static Catalog {
        &STANDARD
    }

    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn item(&self, name: &str) -> Result<&Item, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownItem(name.to_string()))
    }

    /// All items, ordered by name
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn items_by_tier(&self, tier: Tier) -> Vec<&Item> {
        self.items.values().filter(|i| i.tier == tier).collect()
    }

    /// Site types on which a raw resource can be extracted (empty when unknown)
    pub fn site_types_for(&self, resource: &str) -> &[SiteType] {
        self.extraction
            .get(resource)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn resources_on(&self, site_type: SiteType) -> Vec<&str> {
        self.extraction
            .iter()
            .filter(|(_, types)| types.contains(&site_type))
            .map(|(resource, _)| resource.as_str())
            .collect()
    }

    pub fn permits(&self, site_type: SiteType, resource: &str) -> bool {
        self.site_types_for(resource).contains(&site_type)
    }

    /// Site types that can extract every resource in the list
    pub fn shared_site_types(&self, resources: &[&str]) -> Vec<SiteType> {
        SiteType::ALL
            .into_iter()
            .filter(|t| resources.iter().all(|r| self.permits(*t, r)))
            .collect()
    }

    pub fn requires_local_sourcing(&self, item: &str) -> bool {
        self.local_sourcing.contains(item)
    }

    /// Check one entry against the tier arity rules.
    pub fn check_entry(&self, item: &Item) -> Result<(), CatalogError> {
        let mut inputs = Vec::with_capacity(item.inputs.len());
        for name in &item.inputs {
            inputs.push(self.item(name)?);
        }

        let tiers_below = |expected: Tier, count: std::ops::RangeInclusive<usize>| {
            if !count.contains(&inputs.len()) {
                return Err(CatalogError::malformed(
                    &item.name,
                    format!(
                        "{} items take {}..={} inputs, found {}",
                        item.tier,
                        count.start(),
                        count.end(),
                        inputs.len()
                    ),
                ));
            }
            match inputs.iter().find(|i| i.tier != expected) {
                Some(bad) => Err(CatalogError::malformed(
                    &item.name,
                    format!("input {} is {}, expected {}", bad.name, bad.tier, expected),
                )),
                None => Ok(()),
            }
        };

        match item.tier {
            Tier::P0 => {
                if !inputs.is_empty() {
                    return Err(CatalogError::malformed(&item.name, "raw resources take no inputs"));
                }
                if self.site_types_for(&item.name).is_empty() {
                    return Err(CatalogError::malformed(&item.name, "no site type extracts it"));
                }
                Ok(())
            }
            Tier::P1 => tiers_below(Tier::P0, 1..=1),
            Tier::P2 => tiers_below(Tier::P1, 2..=2),
            Tier::P3 => tiers_below(Tier::P2, 2..=3),
            Tier::P4 if self.requires_local_sourcing(&item.name) => {
                let local = inputs.iter().filter(|i| i.tier == Tier::P1).count();
                let advanced = inputs.iter().filter(|i| i.tier == Tier::P3).count();
                if inputs.len() != 3 || local != 1 || advanced != 2 {
                    return Err(CatalogError::malformed(
                        &item.name,
                        "locally sourced P4 items take one P1 and two P3 inputs",
                    ));
                }
                Ok(())
            }
            Tier::P4 => tiers_below(Tier::P3, 3..=3),
        }
    }

    /// Check every entry and the local-sourcing list.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for item in self.items.values() {
            self.check_entry(item)?;
        }
        for name in &self.local_sourcing {
            let item = self.item(name)?;
            if item.tier != Tier::P4 {
                return Err(CatalogError::malformed(
                    name,
                    format!("only P4 items can require local sourcing, found {}", item.tier),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    /// Add a raw resource and the site types that can extract it
    pub fn raw(mut self, name: &str, site_types: &[SiteType]) -> Self {
        self.catalog
            .extraction
            .insert(name.to_string(), site_types.to_vec());
        self.item(name, Tier::P0, &[])
    }

    pub fn item(mut self, name: &str, tier: Tier, inputs: &[&str]) -> Self {
        self.catalog.items.insert(
            name.to_string(),
            Item {
                name: name.to_string(),
                tier,
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn local_sourcing(mut self, name: &str) -> Self {
        self.catalog.local_sourcing.insert(name.to_string());
        self
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}

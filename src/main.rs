//! Planetary Industry Planner
//!
//! Plans which sites and operators produce each stage of a target good.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use pi_planner::chain::{self, format_ingredient_tree};
use pi_planner::configurations::configurations_for;
use pi_planner::models::CAPACITY_SKILL;
use pi_planner::{
    AnchorChoice, Catalog, DecomposeOptions, ImportPolicy, OperatorOrdering, Operator, PlanError,
    PlanResponse, ResourcePolicy, Site, SiteOrdering, SiteType, SolveOptions, Solver, Tier, db,
    import, materialize, summarize,
};

#[derive(Parser)]
#[command(name = "pi-planner")]
#[command(about = "Production chain planner for planetary industry")]
struct Cli {
    /// Path to the SQLite inventory database
    #[arg(short, long, default_value = "pi_inventory.db")]
    database: PathBuf,

    /// Log search progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import sites and operators from *.json and *.txt files
    Import {
        /// Directory to scan
        dir: PathBuf,

        /// Clear existing inventory before import
        #[arg(long)]
        clear: bool,
    },

    /// Load a sample inventory with one site of every type
    LoadSample,

    /// List all sites in the inventory
    ListSites,

    /// List all operators in the inventory
    ListOperators,

    /// List catalog items
    ListItems {
        /// Only items of this tier (0-4)
        #[arg(short, long)]
        tier: Option<u8>,
    },

    /// Show a stored site
    Site {
        /// Site id
        id: String,
    },

    /// Show a stored operator
    Operator {
        /// Operator name
        name: String,
    },

    /// Show details for a catalog item
    Item {
        /// Item name (e.g., "coolant", "broadcast_node")
        name: String,
    },

    /// Plan production of a target item against the stored inventory
    Solve {
        /// Target item to produce
        target: String,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,

        /// Also write the plan JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        search: SearchFlags,

        /// Show the ingredient tree
        #[arg(long)]
        tree: bool,
    },
}

/// Flags that shape the assignment search
#[derive(Args, Debug)]
struct SearchFlags {
    /// Reject sites declaring resources their type cannot extract
    #[arg(long)]
    strict_resources: bool,

    /// Plan a stage for every imported input
    #[arg(long)]
    produce_imports: bool,

    /// Finish tier-4 goods alongside their first listed tier-3 input
    #[arg(long)]
    first_listed_anchor: bool,

    /// Try sites in inventory order instead of tightest fit
    #[arg(long)]
    site_inventory_order: bool,

    /// Try operators in inventory order instead of most spare capacity
    #[arg(long)]
    operator_inventory_order: bool,

    /// Add capacity skill levels to operator capacity
    #[arg(long)]
    use_skills: bool,

    /// Give up after this many search nodes
    #[arg(long)]
    node_budget: Option<u64>,
}

impl SearchFlags {
    fn options(&self) -> SolveOptions {
        SolveOptions {
            decompose: DecomposeOptions {
                anchor: if self.first_listed_anchor {
                    AnchorChoice::FirstListed
                } else {
                    AnchorChoice::ShortestChain
                },
            },
            resource_policy: if self.strict_resources {
                ResourcePolicy::Enforce
            } else {
                ResourcePolicy::Trust
            },
            import_policy: if self.produce_imports {
                ImportPolicy::ProduceInPlan
            } else {
                ImportPolicy::External
            },
            site_ordering: if self.site_inventory_order {
                SiteOrdering::InventoryOrder
            } else {
                SiteOrdering::TightestFit
            },
            operator_ordering: if self.operator_inventory_order {
                OperatorOrdering::InventoryOrder
            } else {
                OperatorOrdering::MostSpareCapacity
            },
            apply_skill_modifiers: self.use_skills,
            node_budget: self.node_budget,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    let catalog = Catalog::standard();

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { dir, clear } => {
            if clear {
                println!("Clearing existing inventory...");
                db::clear_inventory(&conn)?;
            }

            let stats = import::import_directory(&conn, &dir)?;
            println!("{}", stats);
        }

        Commands::LoadSample => {
            load_sample_data(&conn, catalog)?;
            println!("Sample inventory loaded successfully!");
        }

        Commands::ListSites => {
            let sites = db::list_sites(&conn)?;
            if sites.is_empty() {
                println!("No sites in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<20} {:<10} Resources", "Site", "Type");
                println!("{}", "-".repeat(60));
                for s in sites {
                    println!("{:<20} {:<10} {}", s.id, s.site_type, s.resources.join(", "));
                }
            }
        }

        Commands::ListOperators => {
            let operators = db::list_operators(&conn)?;
            if operators.is_empty() {
                println!("No operators in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<20} {:>8} Skills", "Operator", "Capacity");
                println!("{}", "-".repeat(50));
                for o in operators {
                    let skills: Vec<String> =
                        o.skills.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                    println!("{:<20} {:>8} {}", o.name, o.capacity, skills.join(" "));
                }
            }
        }

        Commands::Site { id } => match db::get_site(&conn, &id)? {
            Some(site) => {
                println!("Site: {}", site.id);
                println!("  Type: {}", site.site_type);
                println!("  Resources: {}", site.resources.join(", "));
                let foreign: Vec<&str> = site
                    .resources
                    .iter()
                    .filter(|r| !catalog.permits(site.site_type, r.as_str()))
                    .map(String::as_str)
                    .collect();
                if !foreign.is_empty() {
                    println!("  Not extractable on {}: {}", site.site_type, foreign.join(", "));
                }
            }
            None => println!("Site '{}' not found", id),
        },

        Commands::Operator { name } => match db::get_operator(&conn, &name)? {
            Some(operator) => {
                println!("Operator: {}", operator.name);
                println!("  Capacity: {}", operator.capacity);
                println!("  With skills: {}", operator.effective_capacity(true));
                for (skill, level) in &operator.skills {
                    println!("  {} = {}", skill, level);
                }
            }
            None => println!("Operator '{}' not found", name),
        },

        Commands::ListItems { tier } => {
            let tiers = match tier {
                Some(rank) => match Tier::from_rank(rank) {
                    Some(t) => vec![t],
                    None => bail!("tier must be between 0 and 4, got {}", rank),
                },
                None => Tier::ALL.to_vec(),
            };

            for t in tiers {
                println!("{} items:", t);
                for item in catalog.items_by_tier(t) {
                    println!("  {}", item.name);
                }
            }
        }

        Commands::Item { name } => {
            let item = catalog.item(&name)?;
            println!("Item: {}", item.name);
            println!("  Tier: {}", item.tier);

            if item.tier == Tier::P0 {
                let types: Vec<String> = catalog
                    .site_types_for(&item.name)
                    .iter()
                    .map(SiteType::to_string)
                    .collect();
                println!("  Extractable on: {}", types.join(", "));
            } else {
                println!("  Inputs: {}", item.inputs.join(", "));
                if catalog.requires_local_sourcing(&item.name) {
                    println!("  Tier-1 input is made on site");
                }

                println!("\nIngredient tree:\n");
                print!("{}", format_ingredient_tree(&chain::expand(catalog, &name)?, 1));

                println!("\nConfigurations:");
                for config in configurations_for(catalog, &name)? {
                    println!("  {:?} ({} -> {})", config.family(), config.start_tier, config.end_tier);
                    if !config.imported_inputs.is_empty() {
                        println!("    imports: {}", config.imported_inputs.join(", "));
                    }
                    if !config.mined_inputs.is_empty() {
                        println!("    mined:   {}", config.mined_inputs.join(", "));
                    }
                    println!("    outputs: {}", config.outputs.join(", "));
                }
            }
        }

        Commands::Solve {
            target,
            json,
            output,
            search,
            tree,
        } => {
            let options = search.options();

            let sites = db::list_sites(&conn)?;
            let operators = db::list_operators(&conn)?;

            if tree && !json {
                let decomposition = chain::decompose(catalog, &target, &options.decompose)?;
                println!("Ingredient tree:\n");
                println!("{}", format_ingredient_tree(&decomposition.tree, 0));
            }

            let solver = Solver::with_options(catalog, options);
            let result = solver.plan(&target, &sites, &operators);

            if json {
                let response = PlanResponse::from_result(&result);
                let text = serde_json::to_string_pretty(&response)?;
                match output {
                    Some(path) => {
                        fs::write(&path, &text)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Wrote response to {}", path.display());
                    }
                    None => println!("{}", text),
                }
                return Ok(if response.is_ok() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                });
            }

            match result {
                Ok(plan) => {
                    if !plan.is_empty() {
                        println!(
                            "{:<12} {:<20} {:<10} {:<28} Inputs",
                            "Operator", "Site", "Type", "Output"
                        );
                        println!("{}", "-".repeat(90));
                        for step in &plan.assignments {
                            let config = &step.configuration;
                            let mut inputs = Vec::new();
                            if !config.mined_inputs.is_empty() {
                                inputs.push(format!("mine {}", config.mined_inputs.join(", ")));
                            }
                            if !config.imported_inputs.is_empty() {
                                inputs.push(format!("import {}", config.imported_inputs.join(", ")));
                            }
                            println!(
                                "{:<12} {:<20} {:<10} {:<28} {}",
                                step.operator,
                                step.site,
                                step.site_type,
                                step.output,
                                inputs.join("; ")
                            );
                        }
                        println!();
                    }

                    println!("{}", summarize(catalog, &plan)?);

                    if let Some(path) = output {
                        let text = serde_json::to_string_pretty(&materialize(&plan))?;
                        fs::write(&path, text)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("Wrote plan to {}", path.display());
                    }
                }
                Err(err @ PlanError::Infeasible { .. }) => {
                    println!("No feasible plan for {}: {}", target, err);
                    println!("Add sites or operators, or raise operator capacity.");
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load a sample inventory for trying the planner without survey data
fn load_sample_data(conn: &Connection, catalog: &Catalog) -> Result<()> {
    db::clear_inventory(conn)?;

    // One site per type, each declaring everything its type can extract
    for site_type in SiteType::ALL {
        let site = Site {
            id: format!("Sample-{}", site_type),
            site_type,
            resources: catalog
                .resources_on(site_type)
                .into_iter()
                .map(str::to_string)
                .collect(),
        };
        db::upsert_site(conn, &site)?;
    }

    let operators = [
        ("Ana", 3, 2),
        ("Bo", 3, 0),
        ("Cy", 2, 1),
    ];
    for (name, capacity, consolidation) in operators {
        let mut skills = BTreeMap::new();
        if consolidation > 0 {
            skills.insert(CAPACITY_SKILL.to_string(), consolidation);
        }
        db::upsert_operator(
            conn,
            &Operator {
                name: name.to_string(),
                capacity,
                skills,
            },
        )?;
    }

    println!(
        "Loaded {} sample sites and {} operators",
        SiteType::ALL.len(),
        operators.len()
    );
    Ok(())
}

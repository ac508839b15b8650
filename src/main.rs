//! Factory Planner
//!
//! Production chain, layout and belt routing planner for factory-building games.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;
use rusqlite::Connection;

use factory_planner::calculator;
use factory_planner::catalog::RecipeCatalog;
use factory_planner::config::PlannerConfig;
use factory_planner::db;
use factory_planner::geometry::Point;
use factory_planner::import;
use factory_planner::planner::{self, PlanRequest};
use factory_planner::sample;

#[derive(Parser)]
#[command(name = "factory-planner")]
#[command(about = "Production chain, layout and belt routing planner")]
struct Cli {
    /// Path to the SQLite recipe database
    #[arg(short, long, default_value = "recipes.db")]
    database: PathBuf,

    /// Log debug output from the planner
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import recipe definitions from *.recipes files
    Import {
        /// Directory to scan recursively
        source_dir: PathBuf,

        /// Clear existing recipes before import
        #[arg(long)]
        clear: bool,
    },

    /// Load sample recipes for testing (without a dataset)
    LoadSample,

    /// List all producible items
    ListItems,

    /// Show every recipe producing an item
    Recipes {
        /// Item name (e.g., "Iron Plate")
        item: String,
    },

    /// Calculate the production chain for a target item
    Calc {
        #[command(flatten)]
        target: Target,

        /// Print the full demand tree
        #[arg(long)]
        tree: bool,
    },

    /// Plan machine layout and belts for a target item
    Plan {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(Args)]
struct Target {
    /// Target item to produce (e.g., "Rotor", "Modular Frame")
    item: String,

    /// Target production rate in items per minute
    #[arg(short, long, default_value = "10.0")]
    rate: f64,

    /// Prefer alternate recipes where available
    #[arg(short, long)]
    alternate: bool,
}

#[derive(Args)]
struct Tuning {
    /// Route every link directly instead of through item buses
    #[arg(long)]
    no_bus: bool,

    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    origin_x: f64,

    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    origin_y: f64,

    /// Routing grid cell size
    #[arg(long)]
    grid_cell: Option<f64>,

    /// Clearance kept around every entity
    #[arg(long)]
    margin: Option<f64>,

    /// Distance between bus corridors
    #[arg(long)]
    bus_spacing: Option<f64>,

    /// Modules per layout row before wrapping
    #[arg(long)]
    row_modules: Option<f64>,

    /// Node expansions before the router gives up on a leg
    #[arg(long)]
    max_search_steps: Option<usize>,
}

impl Tuning {
    fn apply(&self, config: &mut PlannerConfig) {
        config.use_bus = !self.no_bus;
        if let Some(cell) = self.grid_cell {
            config.grid_cell = cell;
        }
        if let Some(margin) = self.margin {
            config.clearance_margin = margin;
        }
        if let Some(spacing) = self.bus_spacing {
            config.bus_spacing = spacing;
        }
        if let Some(modules) = self.row_modules {
            config.max_row_modules = modules;
        }
        if let Some(steps) = self.max_search_steps {
            config.max_search_steps = steps;
        }
    }
}

fn load_catalog(conn: &Connection) -> Result<RecipeCatalog> {
    let catalog = RecipeCatalog::new(db::load_recipes(conn).context("Failed to load recipes")?);
    if catalog.is_empty() {
        bail!("No recipes in database. Run 'import' or 'load-sample' first.");
    }
    info!("loaded {} recipes", catalog.len());
    Ok(catalog)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "warn,factory_planner=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { source_dir, clear } => {
            if clear {
                println!("Clearing existing recipes...");
                db::clear_recipes(&conn)?;
            }

            let stats = import::import_to_database(&conn, &source_dir)?;
            println!("{}", stats);
        }

        Commands::LoadSample => {
            let count = sample::load_sample_data(&conn)?;
            println!("Loaded {} sample recipes", count);
        }

        Commands::ListItems => {
            let items = db::list_producible_items(&conn)?;
            if items.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("Producible items:");
                for item in items {
                    println!("  {}", item);
                }
            }
        }

        Commands::Recipes { item } => {
            let recipes = db::recipes_for_item(&conn, &item)?;
            if recipes.is_empty() {
                println!("No recipe produces '{}' (raw material)", item);
            }
            for recipe in recipes {
                println!(
                    "{}{}: {} @ {}/min in {}",
                    recipe.id,
                    if recipe.alternate { " (alternate)" } else { "" },
                    recipe.output.item,
                    recipe.output.rate,
                    recipe.machine
                );
                for input in &recipe.inputs {
                    println!("    <- {} @ {}/min", input.item, input.rate);
                }
            }
        }

        Commands::Calc { target, tree } => {
            let catalog = load_catalog(&conn)?;
            let demand = calculator::build_demand_tree(
                &catalog,
                &target.item,
                target.rate,
                target.alternate,
            )?;

            if tree {
                println!("Production chain:\n");
                println!("{}", calculator::format_demand_tree(&demand));
            }

            let summary = calculator::summarize_chain(&demand);
            println!("{}", summary);
        }

        Commands::Plan { target, tuning } => {
            let catalog = load_catalog(&conn)?;
            let mut config = PlannerConfig::default();
            tuning.apply(&mut config);

            let request = PlanRequest {
                item: target.item,
                rate: target.rate,
                prefer_alternate: target.alternate,
                origin: Point::new(tuning.origin_x, tuning.origin_y),
            };
            let result = planner::plan(&catalog, &request, &config)?;

            println!("{}", calculator::summarize_chain(&result.tree));
            println!("{}", planner::format_plan(&result));
        }
    }

    Ok(())
}

//! Nutritab CLI - USDA FoodData Central nutrient tables
//!
//! # Main Commands
//!
//! ```bash
//! nutritab prepare                  # Build the table from data/*.csv
//! nutritab export                   # Write food_data.json
//! nutritab lookup                   # Interactive search
//! nutritab serve                    # Start HTTP server (port 3000)
//! ```
//!
//! # Other Commands
//!
//! ```bash
//! nutritab lookup apple             # One-shot search
//! nutritab show 171688              # Grouped details of one food
//! nutritab validate food_data.json  # Validate an exported file
//! nutritab categories               # Food counts per data_type
//! nutritab example-config           # Print the default build configuration
//! ```

use clap::{Parser, Subcommand};
use nutritab::config::{BuildConfig, DataPaths};
use nutritab::lookup::{grouped_details, preview, search, Session};
use nutritab::parser::{category_counts, load_foods};
use nutritab::{export, snapshot, transform, validation};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "nutritab")]
#[command(about = "Build per-food nutrient tables from USDA FoodData Central CSV exports", long_about = None)]
struct Cli {
    /// Directory holding food.csv, food_nutrient.csv and nutrient.csv
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Prepared table (default: prepared_food_data.json)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Exported JSON file (default: food_data.json)
    #[arg(long, global = true)]
    json_output: Option<PathBuf>,

    /// Build configuration JSON (see `example-config`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join, filter and pivot the raw tables, then save the prepared table
    Prepare {
        /// Food category to keep (repeatable; overrides the configuration)
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// Export the prepared table as a JSON array of rows
    Export,

    /// Search foods by name (interactive without a query)
    Lookup {
        /// Search term
        query: Option<String>,
    },

    /// Show one food grouped by nutrient category
    Show {
        /// FDC id
        id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate an exported JSON file
    Validate {
        /// Input JSON file (array of rows)
        input: PathBuf,
    },

    /// Count foods per category in food.csv
    Categories,

    /// Show the default build configuration
    ExampleConfig,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let paths = DataPaths::from_env().with_overrides(cli.data_dir, cli.snapshot, cli.json_output);

    let result = match load_config(cli.config.as_deref()) {
        Err(e) => Err(e),
        Ok(config) => match cli.command {
            Commands::Prepare { categories } => cmd_prepare(&paths, config, categories).await,
            Commands::Export => cmd_export(&paths),
            Commands::Lookup { query } => cmd_lookup(&paths, query.as_deref()),
            Commands::Show { id, json } => cmd_show(&paths, &config, id, json),
            Commands::Validate { input } => cmd_validate(&input),
            Commands::Categories => cmd_categories(&paths),
            Commands::ExampleConfig => cmd_example_config(),
            Commands::Serve { port } => cmd_serve(port, paths, config).await,
        },
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<BuildConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            eprintln!("⚙️  Using configuration: {}", p.display());
            Ok(BuildConfig::from_file(p)?)
        }
        None => Ok(BuildConfig::default()),
    }
}

async fn cmd_prepare(
    paths: &DataPaths,
    config: BuildConfig,
    categories: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = if categories.is_empty() {
        config
    } else {
        config.with_categories(categories)
    };

    let paths = paths.clone();
    let result =
        tokio::task::spawn_blocking(move || transform::prepare(&paths, &config)).await??;
    let summary = result.summary();

    eprintln!("\n📊 Summary");
    eprintln!("   Foods:     {}", summary.foods);
    eprintln!("   Nutrients: {}", summary.nutrients);
    eprintln!("   Snapshot:  {} ({})", result.snapshot_path.display(), summary.snapshot_id);
    if summary.used_fallback {
        eprintln!("   ⚠️  Allow-list matched nothing; all available nutrients were kept");
    }
    if !summary.warnings.is_empty() {
        eprintln!("   ⚠️  {} warning(s)", summary.warnings.len());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_export(paths: &DataPaths) -> Result<(), Box<dyn std::error::Error>> {
    let summary = export::export(&paths.snapshot, &paths.json_output)?;
    eprintln!(
        "💾 {} rows x {} columns written to: {}",
        summary.rows,
        summary.columns,
        summary.path.display()
    );
    Ok(())
}

fn cmd_lookup(paths: &DataPaths, query: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let table = snapshot::load_table(&paths.snapshot)?;
    eprintln!("Successfully loaded {} food items.", table.len());

    let Some(query) = query else {
        let stdin = io::stdin();
        let stdout = io::stdout();
        Session::new(&table, stdin.lock(), stdout.lock()).run()?;
        return Ok(());
    };

    let matches = search(&table, query);
    if matches.is_empty() {
        println!("No food found matching '{}'. Try a different search term.", query);
        return Ok(());
    }

    println!("Found {} matching food(s):", matches.len());
    for line in preview(&matches) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_show(
    paths: &DataPaths,
    config: &BuildConfig,
    id: i64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = snapshot::load_table(&paths.snapshot)?;
    let row = table
        .get(id)
        .ok_or_else(|| format!("Food not found: {}", id))?;
    let details = grouped_details(&table, row, &config.groups);

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    println!("🍎 {} (FDC ID: {})", details.food_name, details.food_id);
    for group in &details.groups {
        if group.nutrients.is_empty() {
            continue;
        }
        println!("\n{}", group.name);
        for n in &group.nutrients {
            println!(
                "   {}: {} (per 100g) | {} (per gram) | {} (per ounce)",
                n.label, n.per_100g, n.per_gram, n.per_ounce
            );
        }
    }
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Validating: {}", input.display());

    let content = fs::read_to_string(input)?;
    let document: Value = serde_json::from_str(&content)?;

    let report = validation::validate_export(&document).map_err(|errors| errors.join("; "))?;

    for (i, errors) in report.errors.iter().take(5) {
        eprintln!("\n❌ Row {} invalid:", i);
        for err in errors.iter().take(3) {
            eprintln!("   - {}", err);
        }
    }

    eprintln!("\n📊 Results: {} valid, {} invalid", report.valid, report.invalid);

    if !report.is_valid() {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_categories(paths: &DataPaths) -> Result<(), Box<dyn std::error::Error>> {
    let foods = load_foods(paths)?;
    eprintln!("📋 {} foods in {}", foods.len(), paths.food_csv().display());

    for (category, count) in category_counts(&foods) {
        println!("{:>8}  {}", count, category);
    }
    Ok(())
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", BuildConfig::default().to_json()?);
    Ok(())
}

async fn cmd_serve(
    port: u16,
    paths: DataPaths,
    config: BuildConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    nutritab::server::start_server(port, paths, config).await
}

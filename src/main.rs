//! # Catalog CLI (`catalog`)
//!
//! ## Usage
//!
//! ```bash
//! catalog --config ./config/catalog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catalog init` | Create the SQLite database and run schema migrations |
//! | `catalog import` | Import an office inventory + pricing export |
//! | `catalog search` | Search every stored catalog |
//! | `catalog get <office> <record>` | Print one stored record |
//! | `catalog stats` | Per-office record and link counts |
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `info` level);
//! results go to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use catalog_core::models::CatalogQuery;
use catalog_engine::search::SearchOutput;
use catalog_engine::{config, get, ingest, migrate, search, stats};

/// Catalog Engine CLI: import office inventories, reconcile them against
/// the master catalog, and search across all catalogs.
#[derive(Parser)]
#[command(
    name = "catalog",
    about = "Inventory catalog import, master-catalog reconciliation, and fuzzy search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Import an inventory export and its pricing export.
    ///
    /// The office is taken from the first inventory row's location name.
    /// With `--master` the catalog is promoted into the master catalog;
    /// otherwise its records are linked against the existing master.
    Import {
        /// Inventory CSV.
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// Pricing CSV.
        #[arg(long)]
        pricing: Option<PathBuf>,

        /// Promote into the master catalog instead of linking.
        #[arg(long)]
        master: bool,

        /// Print the run metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search every stored catalog.
    ///
    /// Filters within one flag are OR-ed; different flags are AND-ed.
    Search {
        /// Free text, fuzzy-matched against item names and descriptions.
        #[arg(long, default_value = "")]
        text: String,

        /// Keyword that must appear in the item text (repeatable).
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Restrict to an office id (repeatable).
        #[arg(long = "office")]
        offices: Vec<String>,

        /// Restrict to a classification id (repeatable).
        #[arg(long = "class")]
        classes: Vec<String>,

        /// Restrict to a sub-classification id (repeatable).
        #[arg(long = "subclass")]
        subclasses: Vec<String>,

        /// Drop items that already have a classification mapping.
        #[arg(long)]
        exclude_mapped: bool,

        /// Drop items already linked to the master catalog.
        #[arg(long)]
        exclude_linked: bool,

        /// Print the raw result as JSON.
        #[arg(long)]
        json: bool,

        /// Print the compiled search expression on stderr.
        #[arg(long)]
        explain: bool,

        /// Read free-text queries from stdin, one per line.
        #[arg(long, short)]
        interactive: bool,
    },

    /// Print a stored record as JSON.
    Get {
        /// Office id.
        office: String,
        /// Record id.
        record: String,
    },

    /// Show per-office catalog statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import {
            inventory,
            pricing,
            master,
            json,
        } => {
            ingest::run_import(&cfg, inventory, pricing, master, json).await?;
        }
        Commands::Search {
            text,
            keywords,
            offices,
            classes,
            subclasses,
            exclude_mapped,
            exclude_linked,
            json,
            explain,
            interactive,
        } => {
            let query = CatalogQuery {
                office_ids: offices,
                classification_ids: classes,
                sub_classification_ids: subclasses,
                search_text: text,
                key_words: keywords,
                exclude_mapped,
                exclude_linked,
                ..Default::default()
            };
            let output = SearchOutput { json, explain };
            if interactive {
                search::run_interactive(&cfg, query, output).await?;
            } else {
                search::run_search(&cfg, query, output).await?;
            }
        }
        Commands::Get { office, record } => {
            get::run_get(&cfg, &office, &record).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}

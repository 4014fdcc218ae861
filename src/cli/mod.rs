pub mod listings;
pub mod report;
pub mod run;
pub mod stats;
pub mod sweep;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config;

#[derive(Parser)]
#[command(
    name = "mietradar",
    version,
    about = "Aggregate German rental listings from multiple portals into one local store"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the SQLite database (defaults to the platform data dir)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run an aggregation pass against one or all sources
    Run {
        /// Source to aggregate (kleinanzeigen, wg-gesucht, all)
        #[arg(long, default_value = "all")]
        source: String,
        /// Search term, e.g. "2 zimmer wohnung"
        #[arg(long)]
        query: String,
        /// Location filter, e.g. "Berlin"
        #[arg(long)]
        location: Option<String>,
        /// Upper price bound in EUR
        #[arg(long)]
        max_price: Option<f64>,
        /// Read raw records from a JSON file instead of the live API
        #[arg(long)]
        from_file: Option<PathBuf>,
        /// Skip the detail-enrichment pass for newly created listings
        #[arg(long)]
        no_enrich: bool,
        /// Skip the staleness sweep after the run
        #[arg(long)]
        no_sweep: bool,
        /// Inactivity window for the sweep, in days
        #[arg(long, default_value_t = config::DEFAULT_WINDOW_DAYS)]
        window_days: i64,
        /// Generate a random id for records with no derivable id instead of skipping them
        #[arg(long)]
        synthesize_ids: bool,
    },
    /// List and inspect stored listings
    Listings {
        #[command(subcommand)]
        command: ListingsCommand,
    },
    /// Deactivate listings not re-observed within the inactivity window
    Sweep {
        /// Source to sweep (kleinanzeigen, wg-gesucht, all)
        #[arg(long, default_value = "all")]
        source: String,
        /// Inactivity window in days
        #[arg(long, default_value_t = config::DEFAULT_WINDOW_DAYS)]
        window_days: i64,
    },
    /// Show recent aggregation runs or the error log
    Stats {
        /// Filter runs by source
        #[arg(long)]
        source: Option<String>,
        /// Number of rows to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Show the error log instead of run statistics
        #[arg(long)]
        errors: bool,
    },
    /// Generate a report of stored listings and recent runs
    Report {
        /// Output format
        #[arg(long, default_value = "terminal", value_parser = ["terminal", "json", "html"])]
        format: String,
        /// Output file path (stdout if not specified)
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ListingsCommand {
    /// List stored listings
    List {
        /// Filter by source (kleinanzeigen, wg-gesucht)
        #[arg(long)]
        source: Option<String>,
        /// Only active listings
        #[arg(long, conflicts_with = "inactive")]
        active: bool,
        /// Only inactive listings
        #[arg(long)]
        inactive: bool,
        /// Lower price bound in EUR
        #[arg(long)]
        min_price: Option<f64>,
        /// Upper price bound in EUR
        #[arg(long)]
        max_price: Option<f64>,
        /// Number of rows to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
        /// Number of rows to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Show all stored fields of one listing
    Info {
        /// Listing id
        id: String,
    },
}

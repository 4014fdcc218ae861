mod cli;
mod config;
mod error;
mod extract;
mod model;
mod normalize;
mod report;
mod run;
mod sources;
mod store;
mod validate;

use clap::Parser;
use cli::{Cli, Command, ListingsCommand};

use crate::model::Source;
use crate::normalize::IdPolicy;
use crate::run::RunConfig;
use crate::sources::{FetchParams, build_extractor_registry};
use crate::store::ListingStore;
use crate::store::models::ListingFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // Open the listing store
    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => config::db_path()?,
    };
    let store = ListingStore::open(&db_path)?;

    // Build the per-source extractor registry
    let extractors = build_extractor_registry();

    match cli.command {
        Command::Run {
            source,
            query,
            location,
            max_price,
            from_file,
            no_enrich,
            no_sweep,
            window_days,
            synthesize_ids,
        } => {
            let params = FetchParams {
                query,
                location,
                max_price,
            };
            let cfg = RunConfig {
                id_policy: if synthesize_ids {
                    IdPolicy::Synthesize
                } else {
                    IdPolicy::Reject
                },
                enrich: !no_enrich,
                sweep: !no_sweep,
                window_days,
            };
            cli::run::run(
                &store,
                &extractors,
                &source,
                &params,
                &cfg,
                from_file.as_deref(),
            )
            .await?;
        }
        Command::Listings { command } => match command {
            ListingsCommand::List {
                source,
                active,
                inactive,
                min_price,
                max_price,
                limit,
                offset,
            } => {
                let filter = ListingFilter {
                    source: source.as_deref().map(Source::parse).transpose()?,
                    active: if active {
                        Some(true)
                    } else if inactive {
                        Some(false)
                    } else {
                        None
                    },
                    min_price,
                    max_price,
                    limit: Some(limit),
                    offset: if offset > 0 { Some(offset) } else { None },
                };
                cli::listings::list(&store, &filter)?;
            }
            ListingsCommand::Info { id } => cli::listings::info(&store, &id)?,
        },
        Command::Sweep {
            source,
            window_days,
        } => {
            cli::sweep::sweep(&store, &source, window_days)?;
        }
        Command::Stats {
            source,
            limit,
            errors,
        } => {
            cli::stats::stats(&store, source.as_deref(), limit, errors)?;
        }
        Command::Report { format, output } => {
            cli::report::generate_report(&store, &format, output.as_deref())?;
        }
    }

    Ok(())
}

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use comfy_table::{Cell, Table};

use crate::model::Source;
use crate::run::{RunConfig, run_source};
use crate::sources::file::FileClient;
use crate::sources::{Extractor, FetchParams, SourceClient, build_live_client};
use crate::store::ListingStore;

pub async fn run(
    store: &ListingStore,
    extractors: &HashMap<Source, Arc<dyn Extractor>>,
    selector: &str,
    params: &FetchParams,
    cfg: &RunConfig,
    from_file: Option<&Path>,
) -> anyhow::Result<()> {
    let sources = Source::parse_selector(selector)?;
    if from_file.is_some() && sources.len() != 1 {
        anyhow::bail!("--from-file requires a single --source");
    }

    let mut completed = Vec::new();
    let mut failed = 0usize;

    for &source in &sources {
        let client: Box<dyn SourceClient> = match from_file {
            Some(path) => Box::new(FileClient::load(source, path)?),
            None => build_live_client(source)?,
        };

        println!("Aggregating {}...", source.display_name());
        match run_source(store, extractors, client.as_ref(), params, cfg).await {
            Ok(stats) => {
                println!(
                    "  {} found, {} new, {} updated, {} errors",
                    stats.total_found, stats.new_items, stats.updated_items, stats.errors
                );
                completed.push(stats);
            }
            Err(e) => {
                println!("  Failed: {e}");
                failed += 1;
            }
        }
    }

    if !completed.is_empty() {
        println!("\n--- Run Summary ---");
        let mut table = Table::new();
        table.set_header(vec![
            "Source", "Found", "New", "Updated", "Errors", "Duration",
        ]);
        for stats in &completed {
            table.add_row(vec![
                Cell::new(stats.source.as_str()),
                Cell::new(stats.total_found),
                Cell::new(stats.new_items),
                Cell::new(stats.updated_items),
                Cell::new(stats.errors),
                Cell::new(format!("{:.1}s", stats.duration_ms as f64 / 1000.0)),
            ]);
        }
        println!("{table}");
    }

    if failed > 0 && failed == sources.len() {
        anyhow::bail!("All {failed} source run(s) failed");
    }
    Ok(())
}

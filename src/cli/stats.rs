use comfy_table::{Cell, Table};

use crate::model::Source;
use crate::store::ListingStore;

pub fn stats(
    store: &ListingStore,
    source: Option<&str>,
    limit: usize,
    errors: bool,
) -> anyhow::Result<()> {
    if errors {
        return error_log(store, limit);
    }

    let source = source.map(Source::parse).transpose()?;
    let runs = store.recent_runs(source, limit)?;

    if runs.is_empty() {
        println!("No aggregation runs recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Run", "Source", "Query", "Found", "New", "Updated", "Errors", "Started", "Duration",
    ]);

    for run in &runs {
        table.add_row(vec![
            Cell::new(&run.id[..8]),
            Cell::new(run.source.as_str()),
            Cell::new(&run.query),
            Cell::new(run.total_found),
            Cell::new(run.new_items),
            Cell::new(run.updated_items),
            Cell::new(run.errors),
            Cell::new(&run.started_at),
            Cell::new(format!("{:.1}s", run.duration_ms as f64 / 1000.0)),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn error_log(store: &ListingStore, limit: usize) -> anyhow::Result<()> {
    let entries = store.recent_errors(limit)?;

    if entries.is_empty() {
        println!("No errors logged.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["When", "Source", "Context", "Message"]);

    for e in &entries {
        table.add_row(vec![
            Cell::new(&e.occurred_at),
            Cell::new(e.source.map(|s| s.as_str()).unwrap_or("-")),
            Cell::new(&e.context),
            Cell::new(&e.message),
        ]);
    }

    println!("{table}");
    Ok(())
}

use comfy_table::{Cell, Table};

use super::Report;

pub fn render(report: &Report) -> anyhow::Result<String> {
    let mut output = String::new();

    output.push_str(&format!(
        "=== Mietradar Report ({}) ===\n\n",
        report.generated_at
    ));

    // Summary
    output.push_str("--- Summary ---\n");
    output.push_str(&format!(
        "Listings tracked:     {}\n",
        report.summary.total_listings
    ));
    output.push_str(&format!(
        "Active:               {}\n",
        report.summary.active_listings
    ));
    output.push_str(&format!(
        "Inactive:             {}\n",
        report.summary.inactive_listings
    ));
    for s in &report.summary.per_source {
        output.push_str(&format!(
            "  {:<19} {} active / {} total\n",
            s.source, s.active, s.total
        ));
    }

    // Active listings table
    if !report.listings.is_empty() {
        output.push_str("\n--- Active Listings ---\n");
        let mut table = Table::new();
        table.set_header(vec![
            "Source", "Title", "Price", "Rooms", "Size", "Location", "Last Seen",
        ]);
        for l in &report.listings {
            table.add_row(vec![
                Cell::new(l.listing.source.as_str()),
                Cell::new(&l.listing.title),
                Cell::new(format_price(l.listing.price, &l.listing.currency)),
                Cell::new(format_opt(l.listing.rooms, "")),
                Cell::new(format_opt(l.listing.size_sqm, " m²")),
                Cell::new(&l.listing.location),
                Cell::new(&l.last_seen),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
    }

    // Runs table
    if !report.runs.is_empty() {
        output.push_str("\n--- Recent Runs ---\n");
        let mut table = Table::new();
        table.set_header(vec![
            "Run", "Source", "Query", "Found", "New", "Updated", "Errors", "Started",
        ]);
        for run in &report.runs {
            table.add_row(vec![
                Cell::new(&run.id[..8]),
                Cell::new(run.source.as_str()),
                Cell::new(&run.query),
                Cell::new(run.total_found),
                Cell::new(run.new_items),
                Cell::new(run.updated_items),
                Cell::new(run.errors),
                Cell::new(&run.started_at),
            ]);
        }
        output.push_str(&table.to_string());
        output.push('\n');
    }

    Ok(output)
}

fn format_price(price: Option<f64>, currency: &str) -> String {
    match price {
        Some(p) => format!("{p:.0} {currency}"),
        None => "-".into(),
    }
}

fn format_opt(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{v}{suffix}"),
        None => "-".into(),
    }
}

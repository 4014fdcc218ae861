use super::Report;

pub fn render(report: &Report) -> anyhow::Result<String> {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str("<title>Mietradar Report</title>\n");
    html.push_str("<style>\n");
    html.push_str("  body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #1a1a1a; }\n");
    html.push_str("  h1 { border-bottom: 2px solid #333; padding-bottom: 0.5rem; }\n");
    html.push_str("  table { border-collapse: collapse; width: 100%; margin: 1rem 0; }\n");
    html.push_str("  th, td { border: 1px solid #ddd; padding: 0.5rem; text-align: left; }\n");
    html.push_str("  th { background: #f5f5f5; font-weight: 600; }\n");
    html.push_str("  tr:nth-child(even) { background: #fafafa; }\n");
    html.push_str("  .summary { display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1rem; margin: 1rem 0; }\n");
    html.push_str("  .stat { background: #f5f5f5; padding: 1rem; border-radius: 4px; }\n");
    html.push_str("  .stat .value { font-size: 1.5rem; font-weight: 700; }\n");
    html.push_str("  .stat .label { color: #666; font-size: 0.875rem; }\n");
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str(&format!(
        "<h1>Mietradar Report</h1>\n<p>Generated: {}</p>\n",
        report.generated_at
    ));

    // Summary cards
    html.push_str("<div class=\"summary\">\n");
    write_stat(&mut html, "Listings Tracked", report.summary.total_listings);
    write_stat(&mut html, "Active", report.summary.active_listings);
    write_stat(&mut html, "Inactive", report.summary.inactive_listings);
    write_stat(&mut html, "Aggregation Runs", report.runs.len() as u64);
    html.push_str("</div>\n");

    // Per-source breakdown
    if !report.summary.per_source.is_empty() {
        html.push_str("<h2>Sources</h2>\n");
        html.push_str("<table>\n<thead><tr><th>Source</th><th>Active</th><th>Total</th></tr></thead>\n<tbody>\n");
        for s in &report.summary.per_source {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(s.source),
                s.active,
                s.total,
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    // Active listings table
    if !report.listings.is_empty() {
        html.push_str("<h2>Active Listings</h2>\n");
        html.push_str("<table>\n<thead><tr><th>Source</th><th>Title</th><th>Price</th><th>Rooms</th><th>Size</th><th>Location</th><th>Last Seen</th></tr></thead>\n<tbody>\n");
        for l in &report.listings {
            let title = if l.listing.url.is_empty() {
                escape_html(&l.listing.title)
            } else {
                format!(
                    "<a href=\"{}\">{}</a>",
                    escape_html(&l.listing.url),
                    escape_html(&l.listing.title)
                )
            };
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(l.listing.source.as_str()),
                title,
                l.listing
                    .price
                    .map(|p| format!("{p:.0} {}", escape_html(&l.listing.currency)))
                    .unwrap_or_else(|| "-".into()),
                l.listing.rooms.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                l.listing
                    .size_sqm
                    .map(|s| format!("{s} m²"))
                    .unwrap_or_else(|| "-".into()),
                escape_html(&l.listing.location),
                escape_html(&l.last_seen),
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    // Runs table
    if !report.runs.is_empty() {
        html.push_str("<h2>Recent Runs</h2>\n");
        html.push_str("<table>\n<thead><tr><th>Run</th><th>Source</th><th>Query</th><th>Found</th><th>New</th><th>Updated</th><th>Errors</th><th>Started</th></tr></thead>\n<tbody>\n");
        for run in &report.runs {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&run.id[..8]),
                escape_html(run.source.as_str()),
                escape_html(&run.query),
                run.total_found,
                run.new_items,
                run.updated_items,
                run.errors,
                escape_html(&run.started_at),
            ));
        }
        html.push_str("</tbody></table>\n");
    }

    html.push_str("</body>\n</html>\n");

    Ok(html)
}

fn write_stat(html: &mut String, label: &str, value: u64) {
    html.push_str(&format!(
        "<div class=\"stat\"><div class=\"value\">{value}</div><div class=\"label\">{label}</div></div>\n"
    ));
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

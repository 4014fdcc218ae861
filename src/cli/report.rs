use crate::report::{Report, ReportFormat};
use crate::store::ListingStore;

pub fn generate_report(
    store: &ListingStore,
    format: &str,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let report = Report::build(store)?;

    let fmt = match format {
        "json" => ReportFormat::Json,
        "html" => ReportFormat::Html,
        _ => ReportFormat::Terminal,
    };

    let rendered = report.render(fmt)?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            println!("Report written to {path}");
        }
        None => {
            println!("{rendered}");
        }
    }

    Ok(())
}

pub mod html;
pub mod json;
pub mod terminal;

use serde::Serialize;

use crate::model::Source;
use crate::store::ListingStore;
use crate::store::models::{ListingFilter, RunStats, StoredListing};

pub enum ReportFormat {
    Terminal,
    Json,
    Html,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub summary: ReportSummary,
    pub listings: Vec<StoredListing>,
    pub runs: Vec<RunStats>,
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub total_listings: u64,
    pub active_listings: u64,
    pub inactive_listings: u64,
    pub per_source: Vec<SourceSummary>,
}

#[derive(Debug, Serialize)]
pub struct SourceSummary {
    pub source: &'static str,
    pub total: u64,
    pub active: u64,
}

impl Report {
    /// Snapshot of the store: the currently active inventory plus the most
    /// recent aggregation runs.
    pub fn build(store: &ListingStore) -> anyhow::Result<Self> {
        let active_filter = ListingFilter {
            active: Some(true),
            ..Default::default()
        };

        let total_listings = store.count(&ListingFilter::default())?;
        let active_listings = store.count(&active_filter)?;

        let mut per_source = Vec::new();
        for source in Source::ALL {
            let total = store.count(&ListingFilter {
                source: Some(source),
                ..Default::default()
            })?;
            let active = store.count(&ListingFilter {
                source: Some(source),
                active: Some(true),
                ..Default::default()
            })?;
            per_source.push(SourceSummary {
                source: source.as_str(),
                total,
                active,
            });
        }

        let listings = store.query(&active_filter)?;
        let runs = store.recent_runs(None, 20)?;

        Ok(Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary {
                total_listings,
                active_listings,
                inactive_listings: total_listings - active_listings,
                per_source,
            },
            listings,
            runs,
        })
    }

    pub fn render(&self, format: ReportFormat) -> anyhow::Result<String> {
        match format {
            ReportFormat::Terminal => terminal::render(self),
            ReportFormat::Json => json::render(self),
            ReportFormat::Html => html::render(self),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::model::{CanonicalListing, Source};

/// A canonical listing plus the lifecycle fields owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredListing {
    #[serde(flatten)]
    pub listing: CanonicalListing,
    pub first_seen: String,
    pub last_seen: String,
    pub scraped_at: String,
    pub is_active: bool,
    pub enriched_at: Option<String>,
    pub enrichment_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub action: UpsertAction,
    pub id: String,
}

/// Filters for listing queries. Results are always ordered by `last_seen`
/// descending; that is the only supported order.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub source: Option<Source>,
    pub active: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Outcome record of one aggregation run, persisted append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub id: String,
    pub source: Source,
    pub query: String,
    pub total_found: u32,
    pub new_items: u32,
    pub updated_items: u32,
    pub errors: u32,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: i64,
}

/// One append-only error-log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub id: i64,
    pub source: Option<Source>,
    pub context: String,
    pub message: String,
    pub occurred_at: String,
}

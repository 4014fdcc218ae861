use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Cannot derive a stable listing id: {0}")]
    UnderivableId(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Source fetch failed: {0}")]
    SourceFetch(String),

    #[error("Enrichment failed for {id}: {reason}")]
    EnrichmentFailed { id: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

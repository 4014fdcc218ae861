use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config;
use crate::error::AppError;
use crate::model::Source;
use crate::normalize::{self, IdPolicy};
use crate::sources::{Extractor, FetchParams, RawRecord, SourceClient};
use crate::store::models::{RunStats, UpsertAction};
use crate::store::{ListingStore, timestamp};
use crate::validate;

/// Knobs for one aggregation pass over a single source.
pub struct RunConfig {
    pub id_policy: IdPolicy,
    pub enrich: bool,
    pub sweep: bool,
    pub window_days: i64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            id_policy: IdPolicy::default(),
            enrich: true,
            sweep: true,
            window_days: config::DEFAULT_WINDOW_DAYS,
        }
    }
}

/// One full pass for one source: fetch, normalize, validate, upsert each
/// record, enrich newly created listings, sweep stale ones, and persist a
/// statistics row. Per-record failures are counted and logged but never
/// abort the batch; only a failed fetch or a failed stats write bubbles up.
pub async fn run_source(
    store: &ListingStore,
    extractors: &HashMap<Source, Arc<dyn Extractor>>,
    client: &dyn SourceClient,
    params: &FetchParams,
    cfg: &RunConfig,
) -> Result<RunStats, AppError> {
    let source = client.source();
    let run_id = Uuid::new_v4().to_string();
    let started = Utc::now();
    tracing::info!("Starting {source} run {run_id} for '{}'", params.query);

    let records = match client.fetch_records(params).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("Fetch from {source} failed: {e}");
            log_error(store, Some(source), "fetch_records", &e.to_string());
            let finished = Utc::now();
            store.record_run_stats(&RunStats {
                id: run_id,
                source,
                query: params.query.clone(),
                total_found: 0,
                new_items: 0,
                updated_items: 0,
                errors: 1,
                started_at: timestamp(started),
                finished_at: timestamp(finished),
                duration_ms: (finished - started).num_milliseconds(),
            })?;
            return Err(e);
        }
    };
    tracing::info!("Fetched {} records from {source}", records.len());

    let mut new_items = 0u32;
    let mut updated_items = 0u32;
    let mut errors = 0u32;
    // (listing id, native source id, raw record) of this run's creations
    let mut created: Vec<(String, String, RawRecord)> = Vec::new();

    for raw in &records {
        let listing = match normalize::normalize(extractors, source, raw, cfg.id_policy) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("Skipping {source} record: {e}");
                errors += 1;
                log_error(store, Some(source), "normalize", &e.to_string());
                continue;
            }
        };

        if let Err(e) = validate::validate(&listing).into_result() {
            tracing::warn!("Skipping listing {}: {e}", listing.id);
            errors += 1;
            log_error(store, Some(source), "validate", &e.to_string());
            continue;
        }

        match store.upsert(&listing, Utc::now()) {
            Ok(outcome) => match outcome.action {
                UpsertAction::Created => {
                    new_items += 1;
                    created.push((listing.id, listing.source_id, raw.clone()));
                }
                UpsertAction::Updated => updated_items += 1,
            },
            Err(e) => {
                tracing::error!("Failed to store listing {}: {e}", listing.id);
                errors += 1;
                log_error(store, Some(source), "upsert", &e.to_string());
            }
        }
    }

    if cfg.enrich {
        errors += enrich_created(store, extractors, client, cfg, &created).await;
    }

    if cfg.sweep {
        match store.sweep(source, cfg.window_days, Utc::now()) {
            Ok(deactivated) => {
                if deactivated > 0 {
                    tracing::info!("Deactivated {deactivated} stale {source} listings");
                }
            }
            Err(e) => {
                tracing::error!("Sweep for {source} failed: {e}");
                errors += 1;
                log_error(store, Some(source), "sweep", &e.to_string());
            }
        }
    }

    let finished = Utc::now();
    let stats = RunStats {
        id: run_id,
        source,
        query: params.query.clone(),
        total_found: records.len() as u32,
        new_items,
        updated_items,
        errors,
        started_at: timestamp(started),
        finished_at: timestamp(finished),
        duration_ms: (finished - started).num_milliseconds(),
    };
    tracing::info!(
        "Run {} finished: {} found, {} new, {} updated, {} errors",
        stats.id,
        stats.total_found,
        stats.new_items,
        stats.updated_items,
        stats.errors
    );
    if let Err(e) = store.record_run_stats(&stats) {
        tracing::error!("Failed to record run stats: {e}");
        return Err(e);
    }
    Ok(stats)
}

/// Best-effort detail enrichment for listings created this run. Each detail
/// payload is merged over the base record and re-normalized; a failure marks
/// the listing enrichment-failed and keeps the base record untouched.
async fn enrich_created(
    store: &ListingStore,
    extractors: &HashMap<Source, Arc<dyn Extractor>>,
    client: &dyn SourceClient,
    cfg: &RunConfig,
    created: &[(String, String, RawRecord)],
) -> u32 {
    let source = client.source();
    let mut errors = 0u32;

    for (id, source_id, raw) in created {
        // Hash-derived ids carry no native id to query a detail endpoint with
        if source_id.is_empty() {
            continue;
        }

        let detail = match client.fetch_detail(source_id).await {
            Ok(detail) => detail,
            Err(e) => {
                errors += 1;
                flag_enrichment_failure(store, source, id, &e.to_string());
                continue;
            }
        };

        let mut merged = raw.clone();
        merged.merge(&detail);
        let mut listing = match normalize::normalize(extractors, source, &merged, cfg.id_policy) {
            Ok(listing) => listing,
            Err(e) => {
                errors += 1;
                flag_enrichment_failure(store, source, id, &e.to_string());
                continue;
            }
        };
        // A detail payload must not move the listing to a different id
        listing.id = id.clone();

        if let Err(e) = validate::validate(&listing).into_result() {
            errors += 1;
            flag_enrichment_failure(store, source, id, &e.to_string());
            continue;
        }

        let now = Utc::now();
        let stored = store
            .upsert(&listing, now)
            .and_then(|_| store.mark_enriched(id, now));
        if let Err(e) = stored {
            errors += 1;
            flag_enrichment_failure(store, source, id, &e.to_string());
        } else {
            tracing::debug!("Enriched listing {id}");
        }
    }

    errors
}

fn flag_enrichment_failure(store: &ListingStore, source: Source, id: &str, reason: &str) {
    let err = AppError::EnrichmentFailed {
        id: id.to_string(),
        reason: reason.to_string(),
    };
    tracing::warn!("{err}");
    log_error(store, Some(source), "enrich", &err.to_string());
    if let Err(e) = store.mark_enrichment_failed(id) {
        tracing::error!("Failed to flag enrichment failure for {id}: {e}");
    }
}

fn log_error(store: &ListingStore, source: Option<Source>, context: &str, message: &str) {
    // The audit trail must never take down the run it documents
    if let Err(e) = store.record_error(source, context, message, Utc::now()) {
        tracing::error!("Failed to record error log entry: {e}");
    }
}

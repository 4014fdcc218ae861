use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use rusqlite::types::{ToSql, Type};
use serde_json::{Map, Value};

use super::models::{
    ErrorEntry, ListingFilter, RunStats, StoredListing, UpsertAction, UpsertOutcome,
};
use super::{ListingStore, timestamp};
use crate::error::AppError;
use crate::model::{CanonicalListing, Coordinates, PropertyType, Source};

const LISTING_COLUMNS: &str = "id, source, source_id, title, description, full_description, \
     price, currency, location, detailed_location, latitude, longitude, size_sqm, rooms, \
     property_type, images, url, source_data, first_seen, last_seen, scraped_at, is_active, \
     enriched_at, enrichment_failed";

const RUN_COLUMNS: &str = "id, source, query, total_found, new_items, updated_items, errors, \
     started_at, finished_at, duration_ms";

impl ListingStore {
    // --- Listings ---

    /// Insert-or-update keyed by listing id. Creation stamps `first_seen`;
    /// an update preserves it and the original `source`, overwrites every
    /// other listing field, and refreshes `last_seen`/`scraped_at`. Every
    /// upsert marks the listing active again, whatever a sweep did before.
    pub fn upsert(
        &self,
        listing: &CanonicalListing,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, AppError> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM listings WHERE id = ?1)",
            params![listing.id],
            |row| row.get(0),
        )?;

        let now = timestamp(now);
        let images = serde_json::to_string(&listing.images)?;
        let source_data = serde_json::to_string(&listing.source_data)?;

        conn.execute(
            "INSERT INTO listings (
                id, source, source_id, title, description, full_description,
                price, currency, location, detailed_location, latitude, longitude,
                size_sqm, rooms, property_type, images, url, source_data,
                first_seen, last_seen, scraped_at, is_active
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19, ?19, 1)
             ON CONFLICT(id) DO UPDATE SET
                source_id = excluded.source_id,
                title = excluded.title,
                description = excluded.description,
                full_description = excluded.full_description,
                price = excluded.price,
                currency = excluded.currency,
                location = excluded.location,
                detailed_location = excluded.detailed_location,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                size_sqm = excluded.size_sqm,
                rooms = excluded.rooms,
                property_type = excluded.property_type,
                images = excluded.images,
                url = excluded.url,
                source_data = excluded.source_data,
                last_seen = excluded.last_seen,
                scraped_at = excluded.scraped_at,
                is_active = 1",
            params![
                listing.id,
                listing.source.as_str(),
                listing.source_id,
                listing.title,
                listing.description,
                listing.full_description,
                listing.price,
                listing.currency,
                listing.location,
                listing.detailed_location,
                listing.coordinates.lat,
                listing.coordinates.lng,
                listing.size_sqm,
                listing.rooms,
                listing.property_type.as_str(),
                images,
                listing.url,
                source_data,
                now,
            ],
        )?;

        Ok(UpsertOutcome {
            action: if exists {
                UpsertAction::Updated
            } else {
                UpsertAction::Created
            },
            id: listing.id.clone(),
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<StoredListing>, AppError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], map_listing_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Filtered listing query, newest `last_seen` first.
    pub fn query(&self, filter: &ListingFilter) -> Result<Vec<StoredListing>, AppError> {
        let (clause, params_vec) = filter_clause(filter);
        let mut sql = format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE {clause} ORDER BY last_seen DESC"
        );
        match (filter.limit, filter.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), map_listing_row)?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok(listings)
    }

    pub fn count(&self, filter: &ListingFilter) -> Result<u64, AppError> {
        let (clause, params_vec) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM listings WHERE {clause}");

        let conn = self.conn.lock().unwrap();
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let n: i64 = conn.query_row(&sql, params_refs.as_slice(), |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Deactivate all active listings of `source` not re-observed within the
    /// window, returning how many changed. A single statement, so it cannot
    /// interleave with a concurrent upsert halfway through. Non-destructive:
    /// rows are flagged, never deleted.
    pub fn sweep(
        &self,
        source: Source,
        window_days: i64,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let cutoff = timestamp(now - Duration::days(window_days));
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE listings SET is_active = 0
             WHERE source = ?1 AND is_active = 1 AND last_seen < ?2",
            params![source.as_str(), cutoff],
        )?;
        Ok(changed as u64)
    }

    pub fn mark_enriched(&self, id: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE listings SET enriched_at = ?2, enrichment_failed = 0 WHERE id = ?1",
            params![id, timestamp(now)],
        )?;
        Ok(())
    }

    pub fn mark_enrichment_failed(&self, id: &str) -> Result<(), AppError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE listings SET enrichment_failed = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    // --- Run statistics & error log (append-only audit trail) ---

    pub fn record_run_stats(&self, stats: &RunStats) -> Result<(), AppError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("INSERT INTO run_stats ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                stats.id,
                stats.source.as_str(),
                stats.query,
                stats.total_found,
                stats.new_items,
                stats.updated_items,
                stats.errors,
                stats.started_at,
                stats.finished_at,
                stats.duration_ms,
            ],
        )?;
        Ok(())
    }

    pub fn record_error(
        &self,
        source: Option<Source>,
        context: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO error_log (source, context, message, occurred_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                source.map(|s| s.as_str()),
                context,
                message,
                timestamp(now)
            ],
        )?;
        Ok(())
    }

    pub fn recent_runs(
        &self,
        source: Option<Source>,
        limit: usize,
    ) -> Result<Vec<RunStats>, AppError> {
        let conn = self.conn.lock().unwrap();
        let mut runs = Vec::new();

        if let Some(source) = source {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM run_stats WHERE source = ?1
                 ORDER BY started_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![source.as_str(), limit as i64], map_run_row)?;
            for row in rows {
                runs.push(row?);
            }
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM run_stats ORDER BY started_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], map_run_row)?;
            for row in rows {
                runs.push(row?);
            }
        }

        Ok(runs)
    }

    pub fn recent_errors(&self, limit: usize) -> Result<Vec<ErrorEntry>, AppError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, source, context, message, occurred_at FROM error_log
             ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], map_error_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn filter_clause(filter: &ListingFilter) -> (String, Vec<Box<dyn ToSql>>) {
    let mut conditions: Vec<&str> = vec!["1=1"];
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(source) = filter.source {
        conditions.push("source = ?");
        params.push(Box::new(source.as_str().to_string()));
    }
    if let Some(active) = filter.active {
        conditions.push("is_active = ?");
        params.push(Box::new(active));
    }
    if let Some(min_price) = filter.min_price {
        conditions.push("price >= ?");
        params.push(Box::new(min_price));
    }
    if let Some(max_price) = filter.max_price {
        conditions.push("price <= ?");
        params.push(Box::new(max_price));
    }

    (conditions.join(" AND "), params)
}

fn bad_column(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn map_listing_row(row: &rusqlite::Row) -> rusqlite::Result<StoredListing> {
    let source_str: String = row.get(1)?;
    let source = Source::parse(&source_str).map_err(|e| bad_column(1, e))?;
    let property_type_str: String = row.get(14)?;
    let images_json: String = row.get(15)?;
    let images: Vec<String> =
        serde_json::from_str(&images_json).map_err(|e| bad_column(15, e))?;
    let source_data_json: String = row.get(17)?;
    let source_data: Map<String, Value> =
        serde_json::from_str(&source_data_json).map_err(|e| bad_column(17, e))?;

    Ok(StoredListing {
        listing: CanonicalListing {
            id: row.get(0)?,
            source,
            source_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            full_description: row.get(5)?,
            price: row.get(6)?,
            currency: row.get(7)?,
            location: row.get(8)?,
            detailed_location: row.get(9)?,
            coordinates: Coordinates {
                lat: row.get(10)?,
                lng: row.get(11)?,
            },
            size_sqm: row.get(12)?,
            rooms: row.get(13)?,
            property_type: PropertyType::from_str(&property_type_str).unwrap_or_default(),
            images,
            url: row.get(16)?,
            source_data,
        },
        first_seen: row.get(18)?,
        last_seen: row.get(19)?,
        scraped_at: row.get(20)?,
        is_active: row.get(21)?,
        enriched_at: row.get(22)?,
        enrichment_failed: row.get(23)?,
    })
}

fn map_run_row(row: &rusqlite::Row) -> rusqlite::Result<RunStats> {
    let source_str: String = row.get(1)?;
    let source = Source::parse(&source_str).map_err(|e| bad_column(1, e))?;
    Ok(RunStats {
        id: row.get(0)?,
        source,
        query: row.get(2)?,
        total_found: row.get(3)?,
        new_items: row.get(4)?,
        updated_items: row.get(5)?,
        errors: row.get(6)?,
        started_at: row.get(7)?,
        finished_at: row.get(8)?,
        duration_ms: row.get(9)?,
    })
}

fn map_error_row(row: &rusqlite::Row) -> rusqlite::Result<ErrorEntry> {
    let source_str: Option<String> = row.get(1)?;
    let source = match source_str {
        Some(s) => Some(Source::parse(&s).map_err(|e| bad_column(1, e))?),
        None => None,
    };
    Ok(ErrorEntry {
        id: row.get(0)?,
        source,
        context: row.get(2)?,
        message: row.get(3)?,
        occurred_at: row.get(4)?,
    })
}

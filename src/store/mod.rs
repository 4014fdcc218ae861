pub mod migrations;
pub mod models;
pub mod queries;

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::AppError;

/// Canonical storage timestamp: UTC RFC 3339 with fixed millisecond
/// precision and a `Z` suffix. Fixed width means lexicographic order on
/// the stored strings is chronological order, which the sweep cutoff
/// comparison relies on.
pub fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct ListingStore {
    conn: Mutex<Connection>,
}

impl ListingStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CanonicalListing, Coordinates, PropertyType, Source};
    use crate::store::models::{ListingFilter, RunStats, UpsertAction};
    use chrono::Duration;
    use serde_json::{Map, json};

    fn test_store() -> ListingStore {
        ListingStore::open_in_memory().expect("Failed to create test store")
    }

    fn sample_listing(id: &str, source: Source) -> CanonicalListing {
        CanonicalListing {
            id: id.into(),
            source,
            source_id: "123".into(),
            title: "2-Zimmer-Wohnung in Neukölln".into(),
            description: "Helle Altbauwohnung".into(),
            full_description: String::new(),
            price: Some(850.0),
            currency: "EUR".into(),
            location: "Berlin".into(),
            detailed_location: "Neukölln".into(),
            coordinates: Coordinates {
                lat: Some(52.48),
                lng: Some(13.44),
            },
            size_sqm: Some(54.0),
            rooms: Some(2.0),
            property_type: PropertyType::Apartment,
            images: vec!["https://img.example.com/1.jpg".into()],
            url: "https://example.com/123".into(),
            source_data: Map::new(),
        }
    }

    #[test]
    fn test_migrations_run() {
        let store = test_store();
        let conn = store.conn.lock().unwrap();
        // Verify tables exist
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
            .unwrap();
        assert!(count >= 1);
    }

    #[test]
    fn test_upsert_create_then_update() {
        let store = test_store();
        let t0 = Utc::now();

        let listing = sample_listing("ka-1", Source::Kleinanzeigen);
        let outcome = store.upsert(&listing, t0).unwrap();
        assert_eq!(outcome.action, UpsertAction::Created);

        let stored = store.get("ka-1").unwrap().unwrap();
        assert_eq!(stored.first_seen, timestamp(t0));
        assert_eq!(stored.last_seen, timestamp(t0));
        assert_eq!(stored.scraped_at, timestamp(t0));
        assert!(stored.is_active);

        // Second observation five seconds later with a price drop
        let t1 = t0 + Duration::seconds(5);
        let mut updated = listing.clone();
        updated.price = Some(820.0);
        updated.title = "2-Zimmer-Wohnung, frisch renoviert".into();
        let outcome = store.upsert(&updated, t1).unwrap();
        assert_eq!(outcome.action, UpsertAction::Updated);

        let stored = store.get("ka-1").unwrap().unwrap();
        assert_eq!(stored.first_seen, timestamp(t0));
        assert_eq!(stored.last_seen, timestamp(t1));
        assert_eq!(stored.listing.price, Some(820.0));
        assert_eq!(stored.listing.title, "2-Zimmer-Wohnung, frisch renoviert");
    }

    #[test]
    fn test_json_columns_roundtrip() {
        let store = test_store();
        let mut listing = sample_listing("wg-9", Source::WgGesucht);
        listing.images = vec![
            "https://img.example.com/a.jpg".into(),
            "https://img.example.com/b.jpg".into(),
        ];
        listing.source_data.insert("deposit".into(), json!("1700"));
        listing
            .source_data
            .insert("flatshare_types".into(), json!([2, 3]));

        store.upsert(&listing, Utc::now()).unwrap();
        let stored = store.get("wg-9").unwrap().unwrap();

        assert_eq!(stored.listing.images, listing.images);
        assert_eq!(stored.listing.source_data, listing.source_data);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = test_store();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_sweep_deactivates_stale() {
        let store = test_store();
        let now = Utc::now();

        let fresh = sample_listing("ka-fresh", Source::Kleinanzeigen);
        store.upsert(&fresh, now - Duration::days(1)).unwrap();
        let stale = sample_listing("ka-stale", Source::Kleinanzeigen);
        store.upsert(&stale, now - Duration::days(10)).unwrap();

        let deactivated = store.sweep(Source::Kleinanzeigen, 7, now).unwrap();
        assert_eq!(deactivated, 1);

        assert!(store.get("ka-fresh").unwrap().unwrap().is_active);
        assert!(!store.get("ka-stale").unwrap().unwrap().is_active);

        // Already-inactive rows are not counted again
        let deactivated = store.sweep(Source::Kleinanzeigen, 7, now).unwrap();
        assert_eq!(deactivated, 0);
    }

    #[test]
    fn test_sweep_scoped_to_source() {
        let store = test_store();
        let now = Utc::now();
        let old = now - Duration::days(30);

        store
            .upsert(&sample_listing("ka-old", Source::Kleinanzeigen), old)
            .unwrap();
        store
            .upsert(&sample_listing("wg-old", Source::WgGesucht), old)
            .unwrap();

        let deactivated = store.sweep(Source::Kleinanzeigen, 7, now).unwrap();
        assert_eq!(deactivated, 1);
        assert!(!store.get("ka-old").unwrap().unwrap().is_active);
        assert!(store.get("wg-old").unwrap().unwrap().is_active);
    }

    #[test]
    fn test_upsert_reactivates_swept_listing() {
        let store = test_store();
        let now = Utc::now();
        let listing = sample_listing("ka-back", Source::Kleinanzeigen);

        store.upsert(&listing, now - Duration::days(10)).unwrap();
        store.sweep(Source::Kleinanzeigen, 7, now).unwrap();
        assert!(!store.get("ka-back").unwrap().unwrap().is_active);

        // The listing reappears in a later run
        let outcome = store.upsert(&listing, now).unwrap();
        assert_eq!(outcome.action, UpsertAction::Updated);

        let stored = store.get("ka-back").unwrap().unwrap();
        assert!(stored.is_active);
        assert_eq!(stored.first_seen, timestamp(now - Duration::days(10)));
        assert_eq!(stored.last_seen, timestamp(now));
    }

    #[test]
    fn test_query_filters() {
        let store = test_store();
        let now = Utc::now();

        let mut cheap = sample_listing("ka-cheap", Source::Kleinanzeigen);
        cheap.price = Some(400.0);
        store.upsert(&cheap, now - Duration::seconds(2)).unwrap();

        let mut pricey = sample_listing("ka-pricey", Source::Kleinanzeigen);
        pricey.price = Some(1500.0);
        store.upsert(&pricey, now - Duration::seconds(1)).unwrap();

        let wg = sample_listing("wg-1", Source::WgGesucht);
        store.upsert(&wg, now).unwrap();

        let all = store.query(&ListingFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        // Newest observation first
        assert_eq!(all[0].listing.id, "wg-1");
        assert_eq!(all[2].listing.id, "ka-cheap");

        let ka_only = store
            .query(&ListingFilter {
                source: Some(Source::Kleinanzeigen),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ka_only.len(), 2);

        let under_1000 = store
            .query(&ListingFilter {
                max_price: Some(1000.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(under_1000.len(), 2);

        let band = store
            .query(&ListingFilter {
                min_price: Some(500.0),
                max_price: Some(1000.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(band.len(), 2);
        assert!(band.iter().all(|l| l.listing.price >= Some(500.0)));
    }

    #[test]
    fn test_query_active_filter() {
        let store = test_store();
        let now = Utc::now();

        store
            .upsert(
                &sample_listing("ka-gone", Source::Kleinanzeigen),
                now - Duration::days(10),
            )
            .unwrap();
        store
            .upsert(&sample_listing("ka-here", Source::Kleinanzeigen), now)
            .unwrap();
        store.sweep(Source::Kleinanzeigen, 7, now).unwrap();

        let active = store
            .query(&ListingFilter {
                active: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].listing.id, "ka-here");

        let inactive = store
            .query(&ListingFilter {
                active: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].listing.id, "ka-gone");
    }

    #[test]
    fn test_query_pagination() {
        let store = test_store();
        let now = Utc::now();
        for i in 0..5 {
            let listing = sample_listing(&format!("ka-{i}"), Source::Kleinanzeigen);
            store.upsert(&listing, now + Duration::seconds(i)).unwrap();
        }

        let page = store
            .query(&ListingFilter {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].listing.id, "ka-4");

        let page = store
            .query(&ListingFilter {
                limit: Some(2),
                offset: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].listing.id, "ka-2");

        let tail = store
            .query(&ListingFilter {
                offset: Some(4),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].listing.id, "ka-0");
    }

    #[test]
    fn test_count_with_filters() {
        let store = test_store();
        let now = Utc::now();
        store
            .upsert(&sample_listing("ka-1", Source::Kleinanzeigen), now)
            .unwrap();
        store
            .upsert(&sample_listing("wg-1", Source::WgGesucht), now)
            .unwrap();

        assert_eq!(store.count(&ListingFilter::default()).unwrap(), 2);
        assert_eq!(
            store
                .count(&ListingFilter {
                    source: Some(Source::WgGesucht),
                    ..Default::default()
                })
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_enrichment_flags() {
        let store = test_store();
        let now = Utc::now();
        store
            .upsert(&sample_listing("ka-1", Source::Kleinanzeigen), now)
            .unwrap();

        let stored = store.get("ka-1").unwrap().unwrap();
        assert!(stored.enriched_at.is_none());
        assert!(!stored.enrichment_failed);

        store.mark_enrichment_failed("ka-1").unwrap();
        assert!(store.get("ka-1").unwrap().unwrap().enrichment_failed);

        // A later successful enrichment clears the failure flag
        store.mark_enriched("ka-1", now).unwrap();
        let stored = store.get("ka-1").unwrap().unwrap();
        assert_eq!(stored.enriched_at.as_deref(), Some(timestamp(now).as_str()));
        assert!(!stored.enrichment_failed);
    }

    #[test]
    fn test_run_stats_roundtrip() {
        let store = test_store();
        let now = Utc::now();

        let stats = RunStats {
            id: "run-1".into(),
            source: Source::Kleinanzeigen,
            query: "wohnung berlin".into(),
            total_found: 25,
            new_items: 20,
            updated_items: 5,
            errors: 0,
            started_at: timestamp(now),
            finished_at: timestamp(now + Duration::seconds(3)),
            duration_ms: 3000,
        };
        store.record_run_stats(&stats).unwrap();

        let later = RunStats {
            id: "run-2".into(),
            source: Source::WgGesucht,
            query: "wg berlin".into(),
            started_at: timestamp(now + Duration::minutes(1)),
            ..stats.clone()
        };
        store.record_run_stats(&later).unwrap();

        let runs = store.recent_runs(None, 10).unwrap();
        assert_eq!(runs.len(), 2);
        // Most recent run first
        assert_eq!(runs[0].id, "run-2");
        assert_eq!(runs[1].total_found, 25);

        let ka_runs = store.recent_runs(Some(Source::Kleinanzeigen), 10).unwrap();
        assert_eq!(ka_runs.len(), 1);
        assert_eq!(ka_runs[0].id, "run-1");

        let limited = store.recent_runs(None, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_error_log_roundtrip() {
        let store = test_store();
        let now = Utc::now();

        store
            .record_error(
                Some(Source::Kleinanzeigen),
                "normalize",
                "record carries no native id, url or title",
                now,
            )
            .unwrap();
        store
            .record_error(None, "fetch_records", "connection timed out", now)
            .unwrap();

        let errors = store.recent_errors(10).unwrap();
        assert_eq!(errors.len(), 2);
        // Newest entry first
        assert_eq!(errors[0].context, "fetch_records");
        assert!(errors[0].source.is_none());
        assert_eq!(errors[1].source, Some(Source::Kleinanzeigen));
        assert_eq!(errors[1].occurred_at, timestamp(now));

        let limited = store.recent_errors(1).unwrap();
        assert_eq!(limited.len(), 1);
    }
}

use rusqlite::Connection;

const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    "CREATE TABLE IF NOT EXISTS listings (
        id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        source_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        full_description TEXT NOT NULL,
        price REAL,
        currency TEXT NOT NULL DEFAULT 'EUR',
        location TEXT NOT NULL,
        detailed_location TEXT NOT NULL,
        latitude REAL,
        longitude REAL,
        size_sqm REAL,
        rooms REAL,
        property_type TEXT NOT NULL,
        images TEXT NOT NULL DEFAULT '[]',
        url TEXT NOT NULL,
        source_data TEXT NOT NULL DEFAULT '{}',
        first_seen TEXT NOT NULL,
        last_seen TEXT NOT NULL,
        scraped_at TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        enriched_at TEXT,
        enrichment_failed INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_listings_source ON listings(source);
    CREATE INDEX IF NOT EXISTS idx_listings_last_seen ON listings(last_seen);
    CREATE INDEX IF NOT EXISTS idx_listings_sweep ON listings(source, is_active, last_seen);

    CREATE TABLE IF NOT EXISTS run_stats (
        id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        query TEXT NOT NULL,
        total_found INTEGER NOT NULL,
        new_items INTEGER NOT NULL,
        updated_items INTEGER NOT NULL,
        errors INTEGER NOT NULL,
        started_at TEXT NOT NULL,
        finished_at TEXT NOT NULL,
        duration_ms INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS error_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source TEXT,
        context TEXT NOT NULL,
        message TEXT NOT NULL,
        occurred_at TEXT NOT NULL
    );",
];

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS _migrations (version INTEGER PRIMARY KEY)")?;

    let current_version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;

    for (i, sql) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i64;
        if version > current_version {
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO _migrations (version) VALUES (?1)", [version])?;
            tracing::info!("Applied migration {version}");
        }
    }

    Ok(())
}

//! Schema for a single day-store database (§4.4).
//!
//! Applied idempotently with `CREATE TABLE IF NOT EXISTS` on every connection
//! open — simpler than the teacher's versioned-migration-tracking machinery
//! (`schema_migrations` with per-step checksums), which this engine doesn't
//! need: the schema is fixed for the life of the crate, so there is never an
//! incremental migration to apply, only the question of "does it exist yet".
//! `schema_version` is kept anyway as the ambient marker the teacher's own
//! schema carries, recording when a day-store was first created.

pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS platforms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS news_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform_id TEXT NOT NULL REFERENCES platforms(id),
    title TEXT NOT NULL,
    url TEXT NOT NULL DEFAULT '',
    mobile_url TEXT NOT NULL DEFAULT '',
    rank INTEGER NOT NULL,
    first_crawl_time TEXT NOT NULL,
    last_crawl_time TEXT NOT NULL,
    crawl_count INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_news_items_platform_url
    ON news_items(platform_id, url) WHERE url != '';
CREATE INDEX IF NOT EXISTS idx_news_items_platform_last_crawl
    ON news_items(platform_id, last_crawl_time);

CREATE TABLE IF NOT EXISTS rank_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    news_item_id INTEGER NOT NULL REFERENCES news_items(id),
    rank INTEGER NOT NULL,
    crawl_time TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rank_history_item ON rank_history(news_item_id);

CREATE TABLE IF NOT EXISTS title_changes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    news_item_id INTEGER NOT NULL REFERENCES news_items(id),
    old_title TEXT NOT NULL,
    new_title TEXT NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS crawl_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_time TEXT NOT NULL UNIQUE,
    total_items INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS crawl_source_status (
    crawl_record_id INTEGER NOT NULL REFERENCES crawl_records(id),
    platform_id TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('success', 'failed')),
    PRIMARY KEY (crawl_record_id, platform_id)
);

CREATE TABLE IF NOT EXISTS push_records (
    date TEXT PRIMARY KEY,
    pushed INTEGER NOT NULL DEFAULT 0,
    push_time TEXT,
    report_type TEXT,
    created_at TEXT NOT NULL
);
"#;

/// Apply the schema and stamp `schema_version` if this is a fresh database.
pub async fn apply(pool: &sqlx::SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(SCHEMA).execute(&mut *tx).await?;

    let stamped: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM schema_version WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;
    if !stamped {
        sqlx::query("INSERT INTO schema_version (id, version, applied_at) VALUES (1, ?, datetime('now'))")
            .bind(SCHEMA_VERSION)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

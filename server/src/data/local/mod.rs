//! Local day-store backend (§4.4): one SQLite database per calendar date,
//! connections cached per day and created lazily.
//!
//! Grounded on the teacher's `data/sqlite/mod.rs` (sqlx pool construction,
//! WAL pragmas, `tracing` instrumentation) generalized from one shared pool
//! to a day-keyed map of pools, since the spec requires one database file
//! per `<data_root>/<date>/news.db` rather than a single shared file.

pub mod schema;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::log::LevelFilter;

use crate::core::constants::{
    SQLITE_BUSY_TIMEOUT_SECS, SQLITE_CACHE_SIZE, SQLITE_DB_FILENAME, SQLITE_MAX_CONNECTIONS_PER_DAY,
    SQLITE_WAL_AUTOCHECKPOINT,
};
use crate::core::storage::{AppStorage, DaySubdir};
use crate::data::error::StorageError;
use crate::domain::news::{CrawlRecord, NewsData, NewsItem, PushRecord, SaveOutcome, SourceStatus};
use crate::domain::time::{folder_datetime, parse_day_folder_name};
use crate::domain::url::canonicalize;

pub struct LocalStorageBackend {
    storage: Arc<AppStorage>,
    pools: Mutex<HashMap<String, SqlitePool>>,
}

impl LocalStorageBackend {
    pub fn new(storage: Arc<AppStorage>) -> Self {
        Self {
            storage,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Get or lazily open the pool for `date`, applying the schema on first
    /// open. Held behind a mutex so two concurrent callers for the same new
    /// date don't race to create the file.
    async fn pool_for(&self, date: &str) -> Result<SqlitePool, StorageError> {
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(date) {
            return Ok(pool.clone());
        }

        self.storage
            .ensure_day_dir(date)
            .map_err(StorageError::Io)?;
        let db_path = self.storage.day_db_path(date);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .pragma("cache_size", SQLITE_CACHE_SIZE.to_string())
            .pragma("temp_store", "MEMORY")
            .pragma("wal_autocheckpoint", SQLITE_WAL_AUTOCHECKPOINT.to_string())
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS_PER_DAY)
            .connect_with(options)
            .await?;

        schema::apply(&pool).await?;

        tracing::debug!(date, path = %db_path.display(), "opened day-store");
        pools.insert(date.to_string(), pool.clone());
        Ok(pool)
    }

    /// Save one crawl batch (§4.4 save operation, steps 1-5).
    pub async fn save_news_data(&self, data: &NewsData) -> Result<SaveOutcome, StorageError> {
        let pool = self.pool_for(&data.date).await?;
        merge_save_news_data(&pool, data).await
    }

    /// Seed `date`'s on-disk database from raw bytes before anything else
    /// opens a pool for it. Used by the remote backend (§4.5) to materialize
    /// a downloaded day-store into its local shadow copy.
    pub(crate) async fn write_raw_bytes(&self, date: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.storage.ensure_day_dir(date).map_err(StorageError::Io)?;
        let path = self.storage.day_db_path(date);
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Checkpoint the WAL into the main file and read it back whole. Used by
    /// the remote backend (§4.5) before re-uploading a mutated day-store,
    /// since an un-checkpointed file would be missing writes still sitting in
    /// `news.db-wal`.
    pub(crate) async fn checkpoint_and_read_bytes(&self, date: &str) -> Result<Vec<u8>, StorageError> {
        let pool = self.pool_for(date).await?;
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&pool)
            .await?;
        let path = self.storage.day_db_path(date);
        tokio::fs::read(&path).await.map_err(StorageError::Io)
    }

    /// Whether a pool has already been opened for `date`, i.e. whether a
    /// local (or shadow) copy has already been materialized this process.
    pub(crate) async fn has_pool_for(&self, date: &str) -> bool {
        self.pools.lock().await.contains_key(date)
    }
}

/// Merge one crawl batch into an already-open pool (§4.4 save operation,
/// steps 1-5). Factored out of [`LocalStorageBackend::save_news_data`] so the
/// remote engine's download-mutate-upload cycle (§4.5) can run the identical
/// merge against a temporary local copy of a remote day-store.
pub(crate) async fn merge_save_news_data(
    pool: &SqlitePool,
    data: &NewsData,
) -> Result<SaveOutcome, StorageError> {
    let mut tx = pool.begin().await?;
    let mut outcome = SaveOutcome::default();

    for (platform_id, name) in &data.platform_names {
        sqlx::query(
            "INSERT INTO platforms (id, name, updated_at) VALUES (?, ?, datetime('now'))
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, updated_at = excluded.updated_at",
        )
        .bind(platform_id)
        .bind(name)
        .execute(&mut *tx)
        .await?;
    }

    for (platform_id, items) in &data.items {
            for item in items {
                let canonical_url = canonicalize(&item.url, platform_id);
                let existing = if canonical_url.is_empty() {
                    None
                } else {
                    sqlx::query("SELECT id, title FROM news_items WHERE platform_id = ? AND url = ?")
                        .bind(platform_id)
                        .bind(&canonical_url)
                        .fetch_optional(&mut *tx)
                        .await?
                };

                if let Some(row) = existing {
                    let item_id: i64 = row.get("id");
                    let old_title: String = row.get("title");

                    if old_title != item.title {
                        sqlx::query(
                            "INSERT INTO title_changes (news_item_id, old_title, new_title, changed_at)
                             VALUES (?, ?, ?, datetime('now'))",
                        )
                        .bind(item_id)
                        .bind(&old_title)
                        .bind(&item.title)
                        .execute(&mut *tx)
                        .await?;
                        outcome.title_changes += 1;
                    }

                    sqlx::query(
                        "UPDATE news_items
                         SET title = ?, rank = ?, mobile_url = ?, last_crawl_time = ?,
                             updated_at = datetime('now'), crawl_count = crawl_count + 1
                         WHERE id = ?",
                    )
                    .bind(&item.title)
                    .bind(item.rank)
                    .bind(&item.mobile_url)
                    .bind(&data.crawl_time)
                    .bind(item_id)
                    .execute(&mut *tx)
                    .await?;

                    sqlx::query(
                        "INSERT INTO rank_history (news_item_id, rank, crawl_time, created_at)
                         VALUES (?, ?, ?, datetime('now'))",
                    )
                    .bind(item_id)
                    .bind(item.rank)
                    .bind(&data.crawl_time)
                    .execute(&mut *tx)
                    .await?;

                    outcome.updated_items += 1;
                } else {
                    let inserted = sqlx::query(
                        "INSERT INTO news_items
                             (platform_id, title, url, mobile_url, rank, first_crawl_time,
                              last_crawl_time, crawl_count, created_at, updated_at)
                         VALUES (?, ?, ?, ?, ?, ?, ?, 1, datetime('now'), datetime('now'))",
                    )
                    .bind(platform_id)
                    .bind(&item.title)
                    .bind(&canonical_url)
                    .bind(&item.mobile_url)
                    .bind(item.rank)
                    .bind(&data.crawl_time)
                    .bind(&data.crawl_time)
                    .execute(&mut *tx)
                    .await?;

                    sqlx::query(
                        "INSERT INTO rank_history (news_item_id, rank, crawl_time, created_at)
                         VALUES (?, ?, ?, datetime('now'))",
                    )
                    .bind(inserted.last_insert_rowid())
                    .bind(item.rank)
                    .bind(&data.crawl_time)
                    .execute(&mut *tx)
                    .await?;

                    outcome.new_items += 1;
                }
            }
        }

        let total = outcome.new_items + outcome.updated_items;
        let record = sqlx::query(
            "INSERT INTO crawl_records (crawl_time, total_items, created_at)
             VALUES (?, ?, datetime('now'))
             ON CONFLICT(crawl_time) DO UPDATE SET total_items = excluded.total_items
             RETURNING id",
        )
        .bind(&data.crawl_time)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;
        let crawl_record_id: i64 = record.get("id");

        for platform_id in data.items.keys() {
            if data.failed_platform_ids.contains(platform_id) {
                continue;
            }
            sqlx::query(
                "INSERT INTO crawl_source_status (crawl_record_id, platform_id, status)
                 VALUES (?, ?, 'success')
                 ON CONFLICT(crawl_record_id, platform_id) DO UPDATE SET status = excluded.status",
            )
            .bind(crawl_record_id)
            .bind(platform_id)
            .execute(&mut *tx)
            .await?;
        }
        for platform_id in &data.failed_platform_ids {
            sqlx::query(
                "INSERT INTO platforms (id, name, updated_at) VALUES (?, ?, datetime('now'))
                 ON CONFLICT(id) DO NOTHING",
            )
            .bind(platform_id)
            .bind(platform_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "INSERT INTO crawl_source_status (crawl_record_id, platform_id, status)
                 VALUES (?, ?, 'failed')
                 ON CONFLICT(crawl_record_id, platform_id) DO UPDATE SET status = excluded.status",
            )
            .bind(crawl_record_id)
            .bind(platform_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(
            date = %data.date,
            crawl_time = %data.crawl_time,
            new = outcome.new_items,
            updated = outcome.updated_items,
            title_changes = outcome.title_changes,
            "saved crawl batch"
        );
        Ok(outcome)
    }

impl LocalStorageBackend {
    /// Full day read: every item, grouped by platform, with complete
    /// `rank_history` (§4.4 read operations, "full day").
    pub async fn get_today_all_data(&self, date: &str) -> Result<NewsData, StorageError> {
        let pool = self.pool_for(date).await?;

        let rows = sqlx::query(
            "SELECT ni.id, ni.platform_id, p.name AS platform_name, ni.title, ni.url,
                    ni.mobile_url, ni.rank, ni.first_crawl_time, ni.last_crawl_time, ni.crawl_count
             FROM news_items ni
             LEFT JOIN platforms p ON p.id = ni.platform_id
             ORDER BY ni.platform_id, ni.last_crawl_time",
        )
        .fetch_all(&pool)
        .await?;

        let mut history_by_item: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in sqlx::query("SELECT news_item_id, rank FROM rank_history ORDER BY news_item_id, crawl_time")
            .fetch_all(&pool)
            .await?
        {
            let item_id: i64 = row.get("news_item_id");
            let rank: i64 = row.get("rank");
            history_by_item.entry(item_id).or_default().push(rank);
        }

        let mut data = NewsData {
            date: date.to_string(),
            crawl_time: String::new(),
            items: HashMap::new(),
            platform_names: HashMap::new(),
            failed_platform_ids: HashSet::new(),
        };

        for row in rows {
            let item_id: i64 = row.get("id");
            let platform_id: String = row.get("platform_id");
            let platform_name: Option<String> = row.get("platform_name");
            let platform_name = platform_name.unwrap_or_else(|| platform_id.clone());

            data.platform_names
                .entry(platform_id.clone())
                .or_insert_with(|| platform_name.clone());

            let item = NewsItem {
                title: row.get("title"),
                platform_id: platform_id.clone(),
                platform_name,
                rank: row.get("rank"),
                url: row.get("url"),
                mobile_url: row.get("mobile_url"),
                first_seen_time: row.get("first_crawl_time"),
                last_seen_time: row.get("last_crawl_time"),
                crawl_count: row.get("crawl_count"),
                rank_history: history_by_item.remove(&item_id).unwrap_or_default(),
            };
            data.items.entry(platform_id).or_default().push(item);
        }

        if let Some(latest) = sqlx::query_scalar::<_, Option<String>>("SELECT MAX(crawl_time) FROM crawl_records")
            .fetch_one(&pool)
            .await?
        {
            data.crawl_time = latest;
        }

        for row in sqlx::query(
            "SELECT cs.platform_id FROM crawl_source_status cs
             JOIN crawl_records cr ON cr.id = cs.crawl_record_id
             WHERE cs.status = 'failed' AND cr.crawl_time = (SELECT MAX(crawl_time) FROM crawl_records)",
        )
        .fetch_all(&pool)
        .await?
        {
            data.failed_platform_ids.insert(row.get("platform_id"));
        }

        Ok(data)
    }

    /// Latest batch read: items whose `last_crawl_time` equals the day's
    /// most recent crawl (§4.4 read operations, "latest batch").
    pub async fn get_latest_crawl_data(&self, date: &str) -> Result<NewsData, StorageError> {
        let full = self.get_today_all_data(date).await?;
        let Some(latest_time) = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(crawl_time) FROM crawl_records",
        )
        .fetch_one(&self.pool_for(date).await?)
        .await?
        else {
            return Ok(full);
        };

        let mut filtered = full;
        for items in filtered.items.values_mut() {
            items.retain(|i| i.last_seen_time == latest_time);
        }
        filtered.items.retain(|_, v| !v.is_empty());
        Ok(filtered)
    }

    /// New-title detection at `at_time` (§4.6).
    pub async fn detect_new_titles(
        &self,
        date: &str,
        at_time: &str,
    ) -> Result<HashMap<String, Vec<NewsItem>>, StorageError> {
        let full = self.get_today_all_data(date).await?;
        let mut historical: HashMap<String, HashSet<String>> = HashMap::new();
        let mut current: HashMap<String, Vec<&NewsItem>> = HashMap::new();

        for (platform_id, items) in &full.items {
            for item in items {
                if item.first_seen_time < at_time.to_string() {
                    historical.entry(platform_id.clone()).or_default().insert(item.title.clone());
                }
                if item.last_seen_time == at_time {
                    current.entry(platform_id.clone()).or_default().push(item);
                }
            }
        }

        if historical.values().all(|s| s.is_empty()) {
            return Ok(HashMap::new());
        }

        let mut new_titles: HashMap<String, Vec<NewsItem>> = HashMap::new();
        for (platform_id, items) in current {
            let seen = historical.get(&platform_id).cloned().unwrap_or_default();
            let fresh: Vec<NewsItem> = items
                .into_iter()
                .filter(|i| !seen.contains(&i.title))
                .cloned()
                .collect();
            if !fresh.is_empty() {
                new_titles.insert(platform_id, fresh);
            }
        }
        Ok(new_titles)
    }

    pub async fn crawl_times(&self, date: &str) -> Result<Vec<String>, StorageError> {
        let pool = self.pool_for(date).await?;
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT crawl_time FROM crawl_records ORDER BY crawl_time")
                .fetch_all(&pool)
                .await?;
        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    pub async fn is_first_crawl_today(&self, date: &str) -> Result<bool, StorageError> {
        let pool = self.pool_for(date).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM crawl_records")
            .fetch_one(&pool)
            .await?;
        Ok(count <= 1)
    }

    pub async fn crawl_records(&self, date: &str) -> Result<Vec<CrawlRecord>, StorageError> {
        let pool = self.pool_for(date).await?;
        let rows = sqlx::query("SELECT crawl_time, total_items, created_at FROM crawl_records ORDER BY crawl_time")
            .fetch_all(&pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| CrawlRecord {
                crawl_time: row.get("crawl_time"),
                total_items: row.get("total_items"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Write a TXT snapshot per §6's format.
    pub async fn save_txt_snapshot(&self, date: &str, time: &str, content: &str) -> Result<(), StorageError> {
        let dir = self.storage.day_subdir(date, DaySubdir::Txt);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(format!("{time}.txt")), content).await?;
        Ok(())
    }

    pub async fn save_html_report(&self, date: &str, name: &str, content: &str) -> Result<(), StorageError> {
        let dir = self.storage.day_subdir(date, DaySubdir::Html);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(format!("{name}.html")), content).await?;
        Ok(())
    }

    pub async fn has_pushed_today(&self, date: &str) -> Result<bool, StorageError> {
        let pool = self.pool_for(date).await?;
        let pushed: Option<bool> = sqlx::query_scalar("SELECT pushed FROM push_records WHERE date = ?")
            .bind(date)
            .fetch_optional(&pool)
            .await?;
        Ok(pushed.unwrap_or(false))
    }

    pub async fn record_push(&self, date: &str, report_type: Option<&str>) -> Result<(), StorageError> {
        let pool = self.pool_for(date).await?;
        sqlx::query(
            "INSERT INTO push_records (date, pushed, push_time, report_type, created_at)
             VALUES (?, 1, datetime('now'), ?, datetime('now'))
             ON CONFLICT(date) DO UPDATE SET pushed = 1, push_time = excluded.push_time, report_type = excluded.report_type",
        )
        .bind(date)
        .bind(report_type)
        .execute(&pool)
        .await?;
        Ok(())
    }

    pub fn push_record(date: String, pushed: bool, push_time: Option<String>, report_type: Option<String>) -> PushRecord {
        PushRecord { date, pushed, push_time, report_type }
    }

    /// Delete every day-folder older than `retention_days` (§4.4 retention).
    pub async fn cleanup_old_data(&self, retention_days: i64) -> Result<Vec<String>, StorageError> {
        let tz = crate::domain::time::resolve_timezone(None);
        let cutoff = crate::domain::time::today(tz) - chrono::Duration::days(retention_days);
        let mut removed = Vec::new();

        for folder in self.storage.list_day_folders()? {
            let Some(parsed) = parse_day_folder_name(&folder) else {
                continue;
            };
            if parsed >= cutoff {
                continue;
            }

            if folder_datetime(&folder, tz).is_none() {
                continue;
            }

            self.pools.lock().await.remove(&folder);
            let dir = self.storage.day_dir(&folder);
            tokio::fs::remove_dir_all(&dir).await?;
            removed.push(folder);
        }

        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "pruned day-stores past retention");
        }
        Ok(removed)
    }

    /// Surfaces success/failed per platform for the latest crawl, used by
    /// `trigger_crawl`'s response shaping.
    pub async fn latest_source_status(&self, date: &str) -> Result<HashMap<String, SourceStatus>, StorageError> {
        let pool = self.pool_for(date).await?;
        let rows = sqlx::query(
            "SELECT cs.platform_id, cs.status FROM crawl_source_status cs
             JOIN crawl_records cr ON cr.id = cs.crawl_record_id
             WHERE cr.crawl_time = (SELECT MAX(crawl_time) FROM crawl_records)",
        )
        .fetch_all(&pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let status: String = row.get("status");
                let status = if status == "success" { SourceStatus::Success } else { SourceStatus::Failed };
                (row.get("platform_id"), status)
            })
            .collect())
    }

    /// Close every cached connection (called from `ShutdownService::shutdown`).
    pub async fn cleanup(&self) {
        let mut pools = self.pools.lock().await;
        for (date, pool) in pools.drain() {
            pool.close().await;
            tracing::debug!(date, "closed day-store connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data(date: &str, crawl_time: &str) -> NewsData {
        let mut items = HashMap::new();
        items.insert(
            "weibo".to_string(),
            vec![NewsItem {
                title: "Headline A".into(),
                platform_id: "weibo".into(),
                platform_name: "Weibo".into(),
                rank: 1,
                url: "https://weibo.com/hot?band_rank=1".into(),
                mobile_url: String::new(),
                first_seen_time: crawl_time.into(),
                last_seen_time: crawl_time.into(),
                crawl_count: 1,
                rank_history: vec![1],
            }],
        );
        let mut platform_names = HashMap::new();
        platform_names.insert("weibo".to_string(), "Weibo".to_string());
        NewsData {
            date: date.to_string(),
            crawl_time: crawl_time.to_string(),
            items,
            platform_names,
            failed_platform_ids: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn saving_twice_increments_crawl_count_not_row_count() {
        let (storage, _tmp) = AppStorage::init_for_test();
        let backend = LocalStorageBackend::new(Arc::new(storage));

        backend.save_news_data(&sample_data("2025-11-26", "09-00")).await.unwrap();
        backend.save_news_data(&sample_data("2025-11-26", "10-00")).await.unwrap();

        let data = backend.get_today_all_data("2025-11-26").await.unwrap();
        let items = &data.items["weibo"];
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].crawl_count, 2);
        assert_eq!(items[0].rank_history, vec![1, 1]);
    }

    #[tokio::test]
    async fn is_first_crawl_today_flips_after_second_save() {
        let (storage, _tmp) = AppStorage::init_for_test();
        let backend = LocalStorageBackend::new(Arc::new(storage));

        backend.save_news_data(&sample_data("2025-11-26", "09-00")).await.unwrap();
        assert!(backend.is_first_crawl_today("2025-11-26").await.unwrap());

        backend.save_news_data(&sample_data("2025-11-26", "10-00")).await.unwrap();
        assert!(!backend.is_first_crawl_today("2025-11-26").await.unwrap());
    }
}

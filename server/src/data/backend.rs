//! Unifies [`LocalStorageBackend`] and [`RemoteStorageBackend`] behind one
//! type the facade and dispatcher layers hold (§4.9 "Polymorphism").
//!
//! An enum rather than a trait object: the two backends' method signatures
//! already line up one-to-one, there is no third implementation on the
//! horizon, and an enum lets `as_remote()` hand back the concrete remote type
//! for the handful of remote-only operations (`pull_recent_days`,
//! `list_remote_dates`) without a downcast.

use std::collections::HashMap;
use std::sync::Arc;

use crate::data::local::LocalStorageBackend;
use crate::data::remote::RemoteStorageBackend;
use crate::domain::news::{CrawlRecord, NewsData, NewsItem, SaveOutcome};

#[derive(Clone)]
pub enum StorageBackend {
    Local(Arc<LocalStorageBackend>),
    Remote(Arc<RemoteStorageBackend>),
}

impl StorageBackend {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The concrete remote backend, for callers that need `pull_recent_days`
    /// or `list_remote_dates` (§4.9: "dispatchers that need remote-only
    /// capabilities must interrogate the backend variant explicitly").
    pub fn as_remote(&self) -> Option<&Arc<RemoteStorageBackend>> {
        match self {
            Self::Remote(r) => Some(r),
            Self::Local(_) => None,
        }
    }

    pub async fn save_news_data(&self, data: &NewsData) -> anyhow::Result<SaveOutcome> {
        match self {
            Self::Local(l) => Ok(l.save_news_data(data).await?),
            Self::Remote(r) => Ok(r.save_news_data(data).await?),
        }
    }

    pub async fn get_today_all_data(&self, date: &str) -> anyhow::Result<NewsData> {
        match self {
            Self::Local(l) => Ok(l.get_today_all_data(date).await?),
            Self::Remote(r) => Ok(r.get_today_all_data(date).await?),
        }
    }

    pub async fn get_latest_crawl_data(&self, date: &str) -> anyhow::Result<NewsData> {
        match self {
            Self::Local(l) => Ok(l.get_latest_crawl_data(date).await?),
            Self::Remote(r) => Ok(r.get_latest_crawl_data(date).await?),
        }
    }

    pub async fn detect_new_titles(
        &self,
        date: &str,
        at_time: &str,
    ) -> anyhow::Result<HashMap<String, Vec<NewsItem>>> {
        match self {
            Self::Local(l) => Ok(l.detect_new_titles(date, at_time).await?),
            Self::Remote(r) => Ok(r.detect_new_titles(date, at_time).await?),
        }
    }

    pub async fn crawl_times(&self, date: &str) -> anyhow::Result<Vec<String>> {
        match self {
            Self::Local(l) => Ok(l.crawl_times(date).await?),
            Self::Remote(r) => Ok(r.crawl_times(date).await?),
        }
    }

    pub async fn is_first_crawl_today(&self, date: &str) -> anyhow::Result<bool> {
        match self {
            Self::Local(l) => Ok(l.is_first_crawl_today(date).await?),
            Self::Remote(r) => Ok(r.is_first_crawl_today(date).await?),
        }
    }

    pub async fn crawl_records(&self, date: &str) -> anyhow::Result<Vec<CrawlRecord>> {
        match self {
            Self::Local(l) => Ok(l.crawl_records(date).await?),
            Self::Remote(r) => Ok(r.crawl_records(date).await?),
        }
    }

    pub async fn save_txt_snapshot(&self, date: &str, time: &str, content: &str) -> anyhow::Result<()> {
        match self {
            Self::Local(l) => Ok(l.save_txt_snapshot(date, time, content).await?),
            Self::Remote(r) => Ok(r.save_txt_snapshot(date, time, content).await?),
        }
    }

    pub async fn save_html_report(&self, date: &str, name: &str, content: &str) -> anyhow::Result<()> {
        match self {
            Self::Local(l) => Ok(l.save_html_report(date, name, content).await?),
            Self::Remote(r) => Ok(r.save_html_report(date, name, content).await?),
        }
    }

    pub async fn has_pushed_today(&self, date: &str) -> anyhow::Result<bool> {
        match self {
            Self::Local(l) => Ok(l.has_pushed_today(date).await?),
            Self::Remote(r) => Ok(r.has_pushed_today(date).await?),
        }
    }

    pub async fn record_push(&self, date: &str, report_type: Option<&str>) -> anyhow::Result<()> {
        match self {
            Self::Local(l) => Ok(l.record_push(date, report_type).await?),
            Self::Remote(r) => Ok(r.record_push(date, report_type).await?),
        }
    }

    pub async fn cleanup_old_data(&self, retention_days: i64) -> anyhow::Result<Vec<String>> {
        match self {
            Self::Local(l) => Ok(l.cleanup_old_data(retention_days).await?),
            Self::Remote(r) => Ok(r.cleanup_old_data(retention_days).await?),
        }
    }

    pub async fn cleanup(&self) {
        match self {
            Self::Local(l) => l.cleanup().await,
            Self::Remote(r) => r.cleanup().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::AppStorage;

    #[tokio::test]
    async fn local_variant_reports_not_remote() {
        let (storage, _tmp) = AppStorage::init_for_test();
        let backend = StorageBackend::Local(Arc::new(LocalStorageBackend::new(Arc::new(storage))));
        assert!(!backend.is_remote());
        assert!(backend.as_remote().is_none());
    }
}

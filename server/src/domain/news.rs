//! Core data model (§3): one ranked headline, one crawl batch, and the small
//! supporting records that round out a day-store's schema.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One ranked headline from one platform at one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub platform_id: String,
    pub platform_name: String,
    /// 1-based rank; 99 when the source omitted one.
    pub rank: i64,
    pub url: String,
    pub mobile_url: String,
    /// `HH-MM`
    pub first_seen_time: String,
    /// `HH-MM`
    pub last_seen_time: String,
    pub crawl_count: i64,
    /// One entry per observation, in temporal order.
    pub rank_history: Vec<i64>,
}

impl NewsItem {
    pub const MISSING_RANK: i64 = 99;
}

/// One crawl batch across every platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsData {
    pub date: String,
    /// `HH-MM`
    pub crawl_time: String,
    pub items: HashMap<String, Vec<NewsItem>>,
    pub platform_names: HashMap<String, String>,
    pub failed_platform_ids: HashSet<String>,
}

impl NewsData {
    pub fn total_items(&self) -> usize {
        self.items.values().map(|v| v.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Platform {
    pub id: String,
    pub name: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct CrawlRecord {
    pub crawl_time: String,
    pub total_items: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    Success,
    Failed,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Success => "success",
            SourceStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TitleChange {
    pub news_item_id: i64,
    pub old_title: String,
    pub new_title: String,
    pub changed_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRecord {
    pub date: String,
    pub pushed: bool,
    pub push_time: Option<String>,
    pub report_type: Option<String>,
}

/// Outcome of a single `save_news_data` call (§4.4 step 2-4).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveOutcome {
    pub new_items: i64,
    pub updated_items: i64,
    pub title_changes: i64,
}

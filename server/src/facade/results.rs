//! Result types returned by [`super::Facade`]'s operations. Kept as plain
//! `Serialize` structs rather than `serde_json::Value` so the dispatcher
//! layer (§4.10) has something typed to flatten into its response envelope.

use serde::Serialize;

use crate::data::ttl_cache::CacheStats;
use crate::domain::news::NewsItem;
use crate::domain::time::DateRange;
use crate::domain::weight::{GroupResult, WeightConfig};

/// A news item shaped for a tool response: `url`/`mobile_url` are dropped
/// entirely (not just emptied) when the caller didn't ask for them.
#[derive(Debug, Clone, Serialize)]
pub struct NewsItemView {
    pub title: String,
    pub platform_id: String,
    pub platform_name: String,
    pub rank: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_url: Option<String>,
    pub first_seen_time: String,
    pub last_seen_time: String,
    pub crawl_count: i64,
}

impl NewsItemView {
    pub fn from_item(item: &NewsItem, include_url: bool) -> Self {
        Self {
            title: item.title.clone(),
            platform_id: item.platform_id.clone(),
            platform_name: item.platform_name.clone(),
            rank: item.rank,
            url: include_url.then(|| item.url.clone()),
            mobile_url: include_url.then(|| item.mobile_url.clone()),
            first_seen_time: item.first_seen_time.clone(),
            last_seen_time: item.last_seen_time.clone(),
            crawl_count: item.crawl_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GetLatestNewsResult {
    pub items: Vec<NewsItemView>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetNewsByDateResult {
    pub date_range: DateRange,
    pub items: Vec<NewsItemView>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutoExtractTopic {
    pub token: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TrendingTopics {
    Keywords(Vec<GroupResult>),
    AutoExtract(Vec<AutoExtractTopic>),
}

#[derive(Debug, Clone, Serialize)]
pub struct GetTrendingTopicsResult {
    pub mode: String,
    pub extract_mode: String,
    pub topics: TrendingTopics,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentHistogram {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentItem {
    pub title: String,
    pub platform_name: String,
    pub weight: f64,
    pub sentiment: String,
    pub score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeSentimentResult {
    pub items: Vec<SentimentItem>,
    pub histogram: SentimentHistogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedItem {
    pub title: String,
    pub platform_name: String,
    pub similarity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FindRelatedNewsResult {
    pub reference_title: String,
    pub related: Vec<RelatedItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub title: String,
    pub platform_name: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchNewsResult {
    pub query: String,
    pub search_mode: String,
    pub items: Vec<SearchResultItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsCluster {
    pub representative_title: String,
    pub platforms: Vec<String>,
    pub best_rank: i64,
    pub sum_weight: f64,
    pub is_cross_platform: bool,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateNewsResult {
    pub clusters: Vec<NewsCluster>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverviewDelta {
    pub period1_total: usize,
    pub period2_total: usize,
    pub top_titles_period1: Vec<String>,
    pub top_titles_period2: Vec<String>,
    pub rising_keywords: Vec<String>,
    pub falling_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicShift {
    pub group_key: String,
    pub period1_count: usize,
    pub period2_count: usize,
    pub delta: i64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformActivity {
    pub platform_id: String,
    pub period1_count: usize,
    pub period2_count: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparePeriodsResult {
    pub compare_type: String,
    pub period1: DateRange,
    pub period2: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<OverviewDelta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_shift: Option<Vec<TopicShift>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_activity: Option<Vec<PlatformActivity>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummaryReportResult {
    pub report_type: String,
    pub date_range: DateRange,
    pub markdown: String,
    pub groups: Vec<GroupResult>,
    pub sentiment_histogram: SentimentHistogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub count: usize,
    pub avg_weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeTopicTrendResult {
    pub topic: String,
    pub date_range: DateRange,
    pub mode: String,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformCount {
    pub platform_id: String,
    pub platform_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeDataInsightsResult {
    pub date_range: DateRange,
    pub total_items: usize,
    pub trending: Vec<GroupResult>,
    pub sentiment: SentimentHistogram,
    pub top_platforms: Vec<PlatformCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetCurrentConfigResult {
    pub timezone: String,
    pub retention_days: i64,
    pub weight_config: WeightConfig,
    pub backend_kind: String,
    pub frequency_words_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetSystemStatusResult {
    pub backend_kind: String,
    pub cache_stats: CacheStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerCrawlResult {
    pub platforms: Vec<String>,
    pub failed_platforms: Vec<String>,
    pub new_items: i64,
    pub updated_items: i64,
    pub title_changes: i64,
    pub saved_to_local: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub data: crate::domain::news::NewsData,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncDateResult {
    pub date: String,
    pub synced: bool,
    pub skipped: bool,
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncFromRemoteResult {
    pub results: Vec<SyncDateResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetStorageStatusResult {
    pub backend_kind: String,
    pub today: String,
    pub today_crawl_count: usize,
    pub is_first_crawl_today: bool,
    pub retention_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListAvailableDatesResult {
    pub local_dates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_dates: Option<Vec<String>>,
}

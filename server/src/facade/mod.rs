//! Query/analytics facade (§4.8): the one place every tool handler in
//! `api::mcp::tools` reaches into storage through. Every read path funnels
//! through [`Facade::read_all_titles`], which is the sole point of contact
//! with the TTL cache (§4.9), so callers never have to reason about caching
//! themselves.

pub mod results;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;

use crate::core::constants::{
    CACHE_KEY_PREFIX_ALL_TITLES, CACHE_TTL_HISTORICAL_SECS, CACHE_TTL_TODAY_SECS,
    DEFAULT_SIMILARITY_THRESHOLD, MAX_NEWS_LIMIT, MAX_SENTIMENT_LIMIT, MIN_AGGREGATION_THRESHOLD,
};
use crate::core::fetcher::{FetchRequest, NewsFetcher};
use crate::core::storage::AppStorage;
use crate::data::backend::StorageBackend;
use crate::data::ttl_cache::TtlCache;
use crate::data::DispatchError;
use crate::domain::news::{NewsData, NewsItem};
use crate::domain::time::{self, DateRange};
use crate::domain::weight::{self, AnalysisMode, GroupSortOrder, WeightConfig};
use crate::domain::{entity, keywords::KeywordRules, sentiment, similarity, tokenize};

use results::*;

#[derive(Clone)]
pub struct Facade {
    backend: Arc<StorageBackend>,
    local_storage: Arc<AppStorage>,
    cache: Arc<TtlCache>,
    rules: KeywordRules,
    weight_config: WeightConfig,
    tz: Tz,
    retention_days: i64,
    frequency_words_path: PathBuf,
}

impl Facade {
    pub fn new(
        backend: Arc<StorageBackend>,
        local_storage: Arc<AppStorage>,
        cache: Arc<TtlCache>,
        rules: KeywordRules,
        weight_config: WeightConfig,
        tz: Tz,
        retention_days: i64,
        frequency_words_path: PathBuf,
    ) -> Self {
        Self {
            backend,
            local_storage,
            cache,
            rules,
            weight_config,
            tz,
            retention_days,
            frequency_words_path,
        }
    }

    pub fn backend(&self) -> &Arc<StorageBackend> {
        &self.backend
    }

    pub fn cache(&self) -> &Arc<TtlCache> {
        &self.cache
    }

    fn today(&self) -> String {
        time::today(self.tz).format("%Y-%m-%d").to_string()
    }

    fn today_range(&self) -> DateRange {
        DateRange::single(time::today(self.tz))
    }

    fn backend_kind(&self) -> &'static str {
        if self.backend.is_remote() { "remote" } else { "local" }
    }

    /// The sole point of contact with the TTL cache (§4.9): every read in
    /// this facade ultimately calls through here. Cache key matches §4.8
    /// exactly: `read_all_titles:<date>:<platform-key>`.
    async fn read_all_titles(
        &self,
        date: &str,
        platforms: Option<&[String]>,
    ) -> Result<NewsData, DispatchError> {
        let platform_key = match platforms {
            Some(p) if !p.is_empty() => {
                let mut sorted = p.to_vec();
                sorted.sort();
                sorted.join(",")
            }
            _ => "all".to_string(),
        };
        let cache_key = format!("{CACHE_KEY_PREFIX_ALL_TITLES}:{date}:{platform_key}");
        let ttl_secs = if date == self.today() { CACHE_TTL_TODAY_SECS } else { CACHE_TTL_HISTORICAL_SECS };
        let ttl = Duration::from_secs(ttl_secs);

        if let Some(cached) = self.cache.get::<NewsData>(&cache_key, ttl) {
            return Ok(cached);
        }

        let mut data = self.backend.get_today_all_data(date).await?;
        if let Some(p) = platforms {
            if !p.is_empty() {
                data.items.retain(|k, _| p.contains(k));
                data.platform_names.retain(|k, _| p.contains(k));
            }
        }
        self.cache.set(&cache_key, &data).map_err(anyhow::Error::from)?;
        Ok(data)
    }

    /// Flatten every item across every day in `range`, optionally restricted
    /// to `platforms`. Each day's read goes through [`Self::read_all_titles`]
    /// so every day but "today" hits the cache on repeat calls.
    async fn read_range(
        &self,
        range: &DateRange,
        platforms: Option<&[String]>,
    ) -> Result<Vec<NewsItem>, DispatchError> {
        let mut out = Vec::new();
        for date in range.dates()? {
            let data = self.read_all_titles(&date, platforms).await?;
            for items in data.items.into_values() {
                out.extend(items);
            }
        }
        Ok(out)
    }

    fn weight_of(&self, item: &NewsItem) -> f64 {
        weight::compute_weight(item, &self.weight_config)
    }

    // ---- §4.2 ----

    pub fn resolve_date_range(&self, expression: &str) -> Result<DateRange, DispatchError> {
        Ok(time::resolve_date_range(expression, self.tz)?)
    }

    // ---- §4.8 ----

    pub async fn get_latest_news(
        &self,
        platforms: Option<Vec<String>>,
        limit: usize,
        include_url: bool,
    ) -> Result<GetLatestNewsResult, DispatchError> {
        let limit = limit.clamp(1, MAX_NEWS_LIMIT);
        let today = self.today();
        let data = self.read_all_titles(&today, platforms.as_deref()).await?;
        let latest_time = data.crawl_time.clone();

        let mut items: Vec<&NewsItem> = data
            .items
            .values()
            .flatten()
            .filter(|i| i.last_seen_time == latest_time)
            .collect();
        items.sort_by(|a, b| {
            self.weight_of(b)
                .partial_cmp(&self.weight_of(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let total = items.len();
        items.truncate(limit);

        Ok(GetLatestNewsResult {
            items: items.into_iter().map(|i| NewsItemView::from_item(i, include_url)).collect(),
            total,
        })
    }

    pub async fn get_news_by_date(
        &self,
        date_range: DateRange,
        platforms: Option<Vec<String>>,
        limit: usize,
        include_url: bool,
    ) -> Result<GetNewsByDateResult, DispatchError> {
        let limit = limit.clamp(1, MAX_NEWS_LIMIT);
        let mut items = self.read_range(&date_range, platforms.as_deref()).await?;
        items.sort_by(|a, b| {
            self.weight_of(b)
                .partial_cmp(&self.weight_of(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let total = items.len();
        items.truncate(limit);

        Ok(GetNewsByDateResult {
            date_range,
            items: items.iter().map(|i| NewsItemView::from_item(i, include_url)).collect(),
            total,
        })
    }

    /// (1) the `granularity`/`mode` argument only ever honors "day": there is
    /// no sub-day data to bucket by, so `current` just narrows to the latest
    /// crawl and `daily` takes the whole day (§9 open question 1).
    pub async fn get_trending_topics(
        &self,
        top_n: usize,
        mode: &str,
        extract_mode: &str,
    ) -> Result<GetTrendingTopicsResult, DispatchError> {
        let today = self.today();
        let data = self.read_all_titles(&today, None).await?;
        let all_items: Vec<NewsItem> = data.items.values().flatten().cloned().collect();

        let analysis_mode = match mode {
            "daily" => AnalysisMode::Daily,
            "current" => AnalysisMode::Current,
            other => return Err(DispatchError::InvalidArguments(format!("unknown trending mode: {other}"))),
        };
        let empty_new_titles = HashSet::new();
        let input = weight::select_input(analysis_mode, &all_items, true, &empty_new_titles);

        let topics = match extract_mode {
            "keywords" => {
                let mut groups = weight::analyze(
                    &input,
                    &self.rules,
                    &empty_new_titles,
                    false,
                    &self.weight_config,
                    GroupSortOrder::CountThenConfig,
                );
                groups.truncate(top_n);
                TrendingTopics::Keywords(groups)
            }
            "auto_extract" => {
                let titles: Vec<&str> = input.iter().map(|i| i.title.as_str()).collect();
                let extracted = tokenize::auto_extract(&titles, top_n);
                TrendingTopics::AutoExtract(
                    extracted.into_iter().map(|(token, count)| AutoExtractTopic { token, count }).collect(),
                )
            }
            other => return Err(DispatchError::InvalidArguments(format!("unknown extract_mode: {other}"))),
        };

        Ok(GetTrendingTopicsResult { mode: mode.to_string(), extract_mode: extract_mode.to_string(), topics })
    }

    pub async fn analyze_sentiment(
        &self,
        topic: Option<String>,
        platforms: Option<Vec<String>>,
        date_range: Option<DateRange>,
        limit: usize,
        sort_by_weight: bool,
        include_url: bool,
    ) -> Result<AnalyzeSentimentResult, DispatchError> {
        let limit = limit.clamp(1, MAX_SENTIMENT_LIMIT);
        let range = date_range.unwrap_or_else(|| self.today_range());
        let items = self.read_range(&range, platforms.as_deref()).await?;

        let topic_lower = topic.map(|t| t.to_lowercase());
        let mut best_by_title: HashMap<String, NewsItem> = HashMap::new();
        for item in items {
            if let Some(t) = &topic_lower {
                if !item.title.to_lowercase().contains(t) {
                    continue;
                }
            }
            best_by_title
                .entry(item.title.clone())
                .and_modify(|existing| {
                    if self.weight_of(&item) > self.weight_of(existing) {
                        *existing = item.clone();
                    }
                })
                .or_insert(item);
        }

        let mut deduped: Vec<NewsItem> = best_by_title.into_values().collect();
        if sort_by_weight {
            deduped.sort_by(|a, b| {
                self.weight_of(b).partial_cmp(&self.weight_of(a)).unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let mut histogram = SentimentHistogram { positive: 0, neutral: 0, negative: 0 };
        for item in &deduped {
            match sentiment::classify(&item.title).0 {
                sentiment::Sentiment::Positive => histogram.positive += 1,
                sentiment::Sentiment::Neutral => histogram.neutral += 1,
                sentiment::Sentiment::Negative => histogram.negative += 1,
            }
        }

        deduped.truncate(limit);
        let items = deduped
            .into_iter()
            .map(|item| {
                let (sentiment, score) = sentiment::classify(&item.title);
                SentimentItem {
                    title: item.title.clone(),
                    platform_name: item.platform_name.clone(),
                    weight: self.weight_of(&item),
                    sentiment: sentiment.as_str().to_string(),
                    score,
                    url: include_url.then_some(item.url),
                }
            })
            .collect();

        Ok(AnalyzeSentimentResult { items, histogram })
    }

    pub async fn find_related_news(
        &self,
        reference_title: String,
        date_range: Option<DateRange>,
        threshold: Option<f64>,
        limit: usize,
    ) -> Result<FindRelatedNewsResult, DispatchError> {
        let threshold = threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        let limit = limit.clamp(1, MAX_NEWS_LIMIT);
        let range = date_range.unwrap_or_else(|| self.today_range());
        let items = self.read_range(&range, None).await?;

        let mut related: Vec<(f64, NewsItem)> = items
            .into_iter()
            .filter(|i| i.title != reference_title)
            .map(|i| (similarity::cosine_similarity(&reference_title, &i.title), i))
            .filter(|(score, _)| *score >= threshold)
            .collect();
        related.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        related.truncate(limit);

        Ok(FindRelatedNewsResult {
            reference_title,
            related: related
                .into_iter()
                .map(|(similarity, item)| RelatedItem {
                    title: item.title,
                    platform_name: item.platform_name,
                    similarity,
                    url: Some(item.url),
                })
                .collect(),
        })
    }

    pub async fn search_news(
        &self,
        query: String,
        search_mode: &str,
        date_range: Option<DateRange>,
        platforms: Option<Vec<String>>,
        limit: usize,
        sort_by: &str,
        threshold: Option<f64>,
        include_url: bool,
    ) -> Result<SearchNewsResult, DispatchError> {
        let threshold = threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        let limit = limit.clamp(1, MAX_NEWS_LIMIT);
        let range = date_range.unwrap_or_else(|| self.today_range());
        let items = self.read_range(&range, platforms.as_deref()).await?;
        let query_lower = query.to_lowercase();

        let mut scored: Vec<(f64, NewsItem)> = Vec::new();
        for item in items {
            let score = match search_mode {
                "keyword" => {
                    if item.title.to_lowercase().contains(&query_lower) { Some(1.0) } else { None }
                }
                "fuzzy" => {
                    let s = similarity::cosine_similarity(&query, &item.title);
                    (s >= threshold).then_some(s)
                }
                "entity" => {
                    entity::entity_matches(&item.title, &query).then_some(1.0)
                }
                other => return Err(DispatchError::InvalidArguments(format!("unknown search_mode: {other}"))),
            };
            if let Some(score) = score {
                scored.push((score, item));
            }
        }

        match sort_by {
            "relevance" => scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal)),
            "weight" => scored.sort_by(|a, b| {
                self.weight_of(&b.1).partial_cmp(&self.weight_of(&a.1)).unwrap_or(std::cmp::Ordering::Equal)
            }),
            "date" => scored.sort_by(|a, b| b.1.last_seen_time.cmp(&a.1.last_seen_time)),
            other => return Err(DispatchError::InvalidArguments(format!("unknown sort_by: {other}"))),
        }
        scored.truncate(limit);

        Ok(SearchNewsResult {
            query,
            search_mode: search_mode.to_string(),
            items: scored
                .into_iter()
                .map(|(score, item)| SearchResultItem {
                    title: item.title,
                    platform_name: item.platform_name,
                    score,
                    url: include_url.then_some(item.url),
                })
                .collect(),
        })
    }

    pub async fn aggregate_news(
        &self,
        date_range: Option<DateRange>,
        platforms: Option<Vec<String>>,
        similarity_threshold: f64,
        limit: usize,
        _include_url: bool,
    ) -> Result<AggregateNewsResult, DispatchError> {
        let limit = limit.clamp(1, MAX_NEWS_LIMIT);
        let threshold = similarity_threshold.clamp(MIN_AGGREGATION_THRESHOLD, 1.0);
        let range = date_range.unwrap_or_else(|| self.today_range());
        let items = self.read_range(&range, platforms.as_deref()).await?;

        // Greedy single-link clustering (§4.8, §8 invariant 8: idempotent on
        // its own output — clustering this step's own cluster
        // representatives again yields singleton clusters, since each
        // representative is already maximally distinct from the others).
        let mut clusters: Vec<Vec<NewsItem>> = Vec::new();
        'items: for item in items {
            for cluster in clusters.iter_mut() {
                if cluster.iter().any(|member| similarity::cosine_similarity(&member.title, &item.title) >= threshold) {
                    cluster.push(item);
                    continue 'items;
                }
            }
            clusters.push(vec![item]);
        }

        let mut results: Vec<NewsCluster> = clusters
            .into_iter()
            .map(|cluster| {
                let representative = cluster
                    .iter()
                    .max_by(|a, b| self.weight_of(a).partial_cmp(&self.weight_of(b)).unwrap_or(std::cmp::Ordering::Equal))
                    .expect("cluster is never empty")
                    .clone();
                let platforms: HashSet<String> = cluster.iter().map(|i| i.platform_id.clone()).collect();
                let best_rank = cluster.iter().flat_map(|i| i.rank_history.iter().copied()).min().unwrap_or(representative.rank);
                let sum_weight = cluster.iter().map(|i| self.weight_of(i)).sum();
                NewsCluster {
                    representative_title: representative.title,
                    is_cross_platform: platforms.len() >= 2,
                    platforms: platforms.into_iter().collect(),
                    best_rank,
                    sum_weight,
                    size: cluster.len(),
                }
            })
            .collect();
        results.sort_by(|a, b| b.sum_weight.partial_cmp(&a.sum_weight).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        Ok(AggregateNewsResult { clusters: results })
    }

    pub async fn compare_periods(
        &self,
        period1: DateRange,
        period2: DateRange,
        topic: Option<String>,
        compare_type: &str,
        platforms: Option<Vec<String>>,
        top_n: usize,
    ) -> Result<ComparePeriodsResult, DispatchError> {
        let items1 = self.read_range(&period1, platforms.as_deref()).await?;
        let items2 = self.read_range(&period2, platforms.as_deref()).await?;

        let filter_topic = |items: &[NewsItem]| -> Vec<NewsItem> {
            match &topic {
                Some(t) => {
                    let t = t.to_lowercase();
                    items.iter().filter(|i| i.title.to_lowercase().contains(&t)).cloned().collect()
                }
                None => items.to_vec(),
            }
        };
        let items1 = filter_topic(&items1);
        let items2 = filter_topic(&items2);

        let mut result = ComparePeriodsResult {
            compare_type: compare_type.to_string(),
            period1: period1.clone(),
            period2: period2.clone(),
            overview: None,
            topic_shift: None,
            platform_activity: None,
        };

        match compare_type {
            "overview" => {
                let top_titles = |items: &[NewsItem]| -> Vec<String> {
                    let mut sorted = items.to_vec();
                    sorted.sort_by(|a, b| {
                        self.weight_of(b).partial_cmp(&self.weight_of(a)).unwrap_or(std::cmp::Ordering::Equal)
                    });
                    sorted.into_iter().take(top_n).map(|i| i.title).collect()
                };
                let (g1, g2) = self.group_counts(&items1, &items2);
                let (rising, falling) = keyword_deltas(&g1, &g2, top_n);
                result.overview = Some(OverviewDelta {
                    period1_total: items1.len(),
                    period2_total: items2.len(),
                    top_titles_period1: top_titles(&items1),
                    top_titles_period2: top_titles(&items2),
                    rising_keywords: rising,
                    falling_keywords: falling,
                });
            }
            "topic_shift" => {
                let (g1, g2) = self.group_counts(&items1, &items2);
                let mut keys: Vec<&String> = g1.keys().chain(g2.keys()).collect();
                keys.sort();
                keys.dedup();
                let mut shifts: Vec<TopicShift> = keys
                    .into_iter()
                    .map(|key| {
                        let c1 = *g1.get(key).unwrap_or(&0);
                        let c2 = *g2.get(key).unwrap_or(&0);
                        let status = if c1 == 0 { "new" } else if c2 > c1 { "rising" } else if c2 < c1 { "falling" } else { "stable" };
                        TopicShift { group_key: key.clone(), period1_count: c1, period2_count: c2, delta: c2 as i64 - c1 as i64, status: status.to_string() }
                    })
                    .collect();
                shifts.sort_by(|a, b| b.delta.abs().cmp(&a.delta.abs()));
                shifts.truncate(top_n);
                result.topic_shift = Some(shifts);
            }
            "platform_activity" => {
                let count_by_platform = |items: &[NewsItem]| -> HashMap<String, usize> {
                    let mut m = HashMap::new();
                    for i in items {
                        *m.entry(i.platform_id.clone()).or_insert(0) += 1;
                    }
                    m
                };
                let p1 = count_by_platform(&items1);
                let p2 = count_by_platform(&items2);
                let mut ids: Vec<&String> = p1.keys().chain(p2.keys()).collect();
                ids.sort();
                ids.dedup();
                let activity = ids
                    .into_iter()
                    .map(|id| {
                        let c1 = *p1.get(id).unwrap_or(&0);
                        let c2 = *p2.get(id).unwrap_or(&0);
                        PlatformActivity { platform_id: id.clone(), period1_count: c1, period2_count: c2, delta: c2 as i64 - c1 as i64 }
                    })
                    .collect();
                result.platform_activity = Some(activity);
            }
            other => return Err(DispatchError::InvalidArguments(format!("unknown compare_type: {other}"))),
        }

        Ok(result)
    }

    fn group_counts(&self, items1: &[NewsItem], items2: &[NewsItem]) -> (HashMap<String, usize>, HashMap<String, usize>) {
        let empty = HashSet::new();
        let refs1: Vec<&NewsItem> = items1.iter().collect();
        let refs2: Vec<&NewsItem> = items2.iter().collect();
        let groups1 = weight::analyze(&refs1, &self.rules, &empty, false, &self.weight_config, GroupSortOrder::CountThenConfig);
        let groups2 = weight::analyze(&refs2, &self.rules, &empty, false, &self.weight_config, GroupSortOrder::CountThenConfig);
        (
            groups1.into_iter().map(|g| (g.group_key, g.count)).collect(),
            groups2.into_iter().map(|g| (g.group_key, g.count)).collect(),
        )
    }

    pub async fn generate_summary_report(
        &self,
        report_type: &str,
        date_range: Option<DateRange>,
    ) -> Result<GenerateSummaryReportResult, DispatchError> {
        let range = match date_range {
            Some(r) => r,
            None if report_type == "weekly" => self.resolve_date_range("last 7 days")?,
            None => self.today_range(),
        };
        let items = self.read_range(&range, None).await?;
        let refs: Vec<&NewsItem> = items.iter().collect();
        let empty = HashSet::new();
        let mut groups = weight::analyze(&refs, &self.rules, &empty, false, &self.weight_config, GroupSortOrder::CountThenConfig);
        groups.truncate(10);

        let mut histogram = SentimentHistogram { positive: 0, neutral: 0, negative: 0 };
        for item in &items {
            match sentiment::classify(&item.title).0 {
                sentiment::Sentiment::Positive => histogram.positive += 1,
                sentiment::Sentiment::Neutral => histogram.neutral += 1,
                sentiment::Sentiment::Negative => histogram.negative += 1,
            }
        }

        let mut markdown = format!("# {} summary: {} to {}\n\n", report_type, range.start, range.end);
        markdown.push_str(&format!("Total items: {}\n\n", items.len()));
        for group in &groups {
            markdown.push_str(&format!("## {} ({} items, {:.1}%)\n", group.group_key, group.count, group.percentage));
            for title in group.titles.iter().take(5) {
                markdown.push_str(&format!("- {} ({})\n", title.title, title.platform_name));
            }
            markdown.push('\n');
        }

        Ok(GenerateSummaryReportResult {
            report_type: report_type.to_string(),
            date_range: range,
            markdown,
            groups,
            sentiment_histogram: histogram,
        })
    }

    /// Not part of §4.8's nine named operations, but registered as a tool
    /// (§4.10): runs the §4.7 pipeline per-day across a range to chart one
    /// topic's count and average weight over time.
    pub async fn analyze_topic_trend(
        &self,
        topic: String,
        date_range: Option<DateRange>,
        granularity: Option<String>,
    ) -> Result<AnalyzeTopicTrendResult, DispatchError> {
        if let Some(g) = &granularity {
            if g != "day" {
                tracing::debug!(granularity = %g, "non-day granularity requested, treating as day");
            }
        }
        let range = date_range.unwrap_or_else(|| self.resolve_date_range("last 7 days").unwrap_or_else(|_| self.today_range()));
        let topic_lower = topic.to_lowercase();

        let mut points = Vec::new();
        for date in range.dates()? {
            let data = self.read_all_titles(&date, None).await?;
            let matching: Vec<&NewsItem> = data
                .items
                .values()
                .flatten()
                .filter(|i| i.title.to_lowercase().contains(&topic_lower))
                .collect();
            let count = matching.len();
            let avg_weight = if count == 0 {
                0.0
            } else {
                matching.iter().map(|i| self.weight_of(i)).sum::<f64>() / count as f64
            };
            points.push(TrendPoint { date, count, avg_weight });
        }

        Ok(AnalyzeTopicTrendResult { topic, date_range: range, mode: "day".to_string(), points })
    }

    /// Also not one of the nine §4.8 operations by name, but registered in
    /// §4.10's roster: a single-call dashboard combining trending topics,
    /// sentiment, and per-platform activity for one range.
    pub async fn analyze_data_insights(
        &self,
        date_range: Option<DateRange>,
        top_n: usize,
    ) -> Result<AnalyzeDataInsightsResult, DispatchError> {
        let range = date_range.unwrap_or_else(|| self.today_range());
        let items = self.read_range(&range, None).await?;
        let refs: Vec<&NewsItem> = items.iter().collect();
        let empty = HashSet::new();
        let mut trending = weight::analyze(&refs, &self.rules, &empty, false, &self.weight_config, GroupSortOrder::CountThenConfig);
        trending.truncate(top_n);

        let mut sentiment = SentimentHistogram { positive: 0, neutral: 0, negative: 0 };
        let mut platform_counts: HashMap<(String, String), usize> = HashMap::new();
        for item in &items {
            match crate::domain::sentiment::classify(&item.title).0 {
                crate::domain::sentiment::Sentiment::Positive => sentiment.positive += 1,
                crate::domain::sentiment::Sentiment::Neutral => sentiment.neutral += 1,
                crate::domain::sentiment::Sentiment::Negative => sentiment.negative += 1,
            }
            *platform_counts.entry((item.platform_id.clone(), item.platform_name.clone())).or_insert(0) += 1;
        }
        let mut top_platforms: Vec<PlatformCount> = platform_counts
            .into_iter()
            .map(|((platform_id, platform_name), count)| PlatformCount { platform_id, platform_name, count })
            .collect();
        top_platforms.sort_by(|a, b| b.count.cmp(&a.count));
        top_platforms.truncate(top_n);

        Ok(AnalyzeDataInsightsResult { date_range: range, total_items: items.len(), trending, sentiment, top_platforms })
    }

    // ---- system / storage tools ----

    pub fn get_current_config(&self) -> GetCurrentConfigResult {
        GetCurrentConfigResult {
            timezone: self.tz.to_string(),
            retention_days: self.retention_days,
            weight_config: self.weight_config,
            backend_kind: self.backend_kind().to_string(),
            frequency_words_path: self.frequency_words_path.display().to_string(),
        }
    }

    pub fn get_system_status(&self) -> GetSystemStatusResult {
        GetSystemStatusResult {
            backend_kind: self.backend_kind().to_string(),
            cache_stats: self.cache.get_stats(),
        }
    }

    pub async fn get_storage_status(&self) -> Result<GetStorageStatusResult, DispatchError> {
        let today = self.today();
        let crawl_times = self.backend.crawl_times(&today).await?;
        let is_first = self.backend.is_first_crawl_today(&today).await?;
        Ok(GetStorageStatusResult {
            backend_kind: self.backend_kind().to_string(),
            today,
            today_crawl_count: crawl_times.len(),
            is_first_crawl_today: is_first,
            retention_days: self.retention_days,
        })
    }

    pub async fn list_available_dates(&self) -> Result<ListAvailableDatesResult, DispatchError> {
        let mut local_dates: Vec<String> = self
            .local_storage
            .list_day_folders()
            .map_err(|e| DispatchError::Internal(e.into()))?
            .into_iter()
            .filter_map(|f| time::parse_day_folder_name(&f))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect();
        local_dates.sort();
        local_dates.dedup();
        local_dates.reverse();

        let remote_dates = match self.backend.as_remote() {
            Some(remote) => Some(remote.list_remote_dates().await.map_err(|e| DispatchError::Internal(e.into()))?),
            None => None,
        };

        Ok(ListAvailableDatesResult { local_dates, remote_dates })
    }

    // ---- crawl / sync ----

    pub async fn trigger_crawl(
        &self,
        fetcher: &dyn NewsFetcher,
        requests: Vec<FetchRequest>,
        request_interval_ms: u64,
        save_txt: bool,
        save_html: bool,
    ) -> Result<TriggerCrawlResult, DispatchError> {
        if requests.is_empty() {
            return Err(DispatchError::InvalidArguments("trigger_crawl requires at least one platform".into()));
        }

        let output = fetcher.fetch(&requests, request_interval_ms).await;
        let date = self.today();
        let crawl_time = time::format_time_filename(self.tz);

        let mut items: HashMap<String, Vec<NewsItem>> = HashMap::new();
        let mut platform_names = output.platform_names.clone();
        for req in &requests {
            if let Some(name) = &req.platform_name {
                platform_names.entry(req.platform_id.clone()).or_insert_with(|| name.clone());
            }
        }

        for (platform_id, titles) in &output.items {
            let platform_name = platform_names.get(platform_id).cloned().unwrap_or_else(|| platform_id.clone());
            let mut platform_items = Vec::new();
            for (title, raw) in titles {
                let rank = raw.ranks.first().copied().unwrap_or(NewsItem::MISSING_RANK);
                platform_items.push(NewsItem {
                    title: title.clone(),
                    platform_id: platform_id.clone(),
                    platform_name: platform_name.clone(),
                    rank,
                    url: raw.url.clone(),
                    mobile_url: raw.mobile_url.clone(),
                    first_seen_time: crawl_time.clone(),
                    last_seen_time: crawl_time.clone(),
                    crawl_count: 1,
                    rank_history: if raw.ranks.is_empty() { vec![rank] } else { raw.ranks.clone() },
                });
            }
            items.insert(platform_id.clone(), platform_items);
        }

        let data = NewsData {
            date: date.clone(),
            crawl_time: crawl_time.clone(),
            items,
            platform_names,
            failed_platform_ids: output.failed.iter().cloned().collect(),
        };

        tracing::debug!(
            date = %date,
            platforms = output.items.len(),
            failed = output.failed.len(),
            "crawl fetched, saving"
        );

        let (saved_to_local, save_error, note, outcome) = match self.backend.save_news_data(&data).await {
            Ok(outcome) => (true, None, None, outcome),
            Err(e) => {
                tracing::warn!(error = %e, "crawl data fetched but could not be persisted");
                (
                    false,
                    Some(e.to_string()),
                    Some("crawl data was fetched successfully but could not be saved to storage".to_string()),
                    Default::default(),
                )
            }
        };

        if saved_to_local {
            if save_txt {
                let content = render_txt_snapshot(&data);
                if let Err(e) = self.backend.save_txt_snapshot(&date, &crawl_time, &content).await {
                    tracing::warn!(error = %e, "failed to write TXT snapshot");
                }
            }
            if save_html {
                let content = render_html_report(&data);
                if let Err(e) = self.backend.save_html_report(&date, &crawl_time, &content).await {
                    tracing::warn!(error = %e, "failed to write HTML report");
                }
            }
            self.cache.clear();
        }

        Ok(TriggerCrawlResult {
            platforms: data.platform_names.keys().cloned().collect(),
            failed_platforms: data.failed_platform_ids.iter().cloned().collect(),
            new_items: outcome.new_items,
            updated_items: outcome.updated_items,
            title_changes: outcome.title_changes,
            saved_to_local,
            save_error,
            note,
            data,
        })
    }

    pub async fn sync_from_remote(&self, days: u32) -> Result<SyncFromRemoteResult, DispatchError> {
        let Some(remote) = self.backend.as_remote() else {
            return Err(DispatchError::InvalidArguments("remote backend is not configured".into()));
        };

        let pulled = remote
            .pull_recent_days(days, &self.local_storage)
            .await
            .map_err(|e| DispatchError::CrawlTaskError(format!("remote sync failed: {e}")))?;
        let pulled_set: HashSet<&String> = pulled.iter().collect();

        let today = time::today(self.tz);
        let mut results = Vec::new();
        for offset in 0..days {
            let date = (today - chrono::Duration::days(offset as i64)).format("%Y-%m-%d").to_string();
            let synced = pulled_set.contains(&date);
            results.push(SyncDateResult { date, synced, skipped: !synced, failed: false, error: None });
        }

        self.cache.clear();
        Ok(SyncFromRemoteResult { results })
    }
}

fn keyword_deltas(g1: &HashMap<String, usize>, g2: &HashMap<String, usize>, top_n: usize) -> (Vec<String>, Vec<String>) {
    let mut deltas: Vec<(&String, i64)> = g1
        .keys()
        .chain(g2.keys())
        .collect::<HashSet<_>>()
        .into_iter()
        .map(|k| (k, *g2.get(k).unwrap_or(&0) as i64 - *g1.get(k).unwrap_or(&0) as i64))
        .collect();
    deltas.sort_by(|a, b| b.1.cmp(&a.1));
    let rising = deltas.iter().filter(|(_, d)| *d > 0).take(top_n).map(|(k, _)| (*k).clone()).collect();
    let falling = deltas.iter().rev().filter(|(_, d)| *d < 0).take(top_n).map(|(k, _)| (*k).clone()).collect();
    (rising, falling)
}

/// §6's TXT snapshot format: blank-line-separated sections, one per
/// platform, trailing `==== 以下ID请求失败 ====` block for failures.
fn render_txt_snapshot(data: &NewsData) -> String {
    let mut out = String::new();
    let mut platform_ids: Vec<&String> = data.items.keys().collect();
    platform_ids.sort();

    for platform_id in platform_ids {
        let name = data.platform_names.get(platform_id);
        match name {
            Some(name) if name != platform_id => out.push_str(&format!("{platform_id} | {name}\n")),
            _ => out.push_str(&format!("{platform_id}\n")),
        }
        for item in &data.items[platform_id] {
            let mut line = format!("{}. {}", item.rank, item.title);
            if !item.url.is_empty() {
                line.push_str(&format!(" [URL:{}]", item.url));
            }
            if !item.mobile_url.is_empty() {
                line.push_str(&format!(" [MOBILE:{}]", item.mobile_url));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    if !data.failed_platform_ids.is_empty() {
        out.push_str("==== 以下ID请求失败 ====\n");
        let mut failed: Vec<&String> = data.failed_platform_ids.iter().collect();
        failed.sort();
        for id in failed {
            out.push_str(id);
            out.push('\n');
        }
    }

    out
}

fn render_html_report(data: &NewsData) -> String {
    let mut out = String::from("<!doctype html><html><head><meta charset=\"utf-8\"><title>TrendRadar</title></head><body>\n");
    out.push_str(&format!("<h1>{} &middot; {}</h1>\n", data.date, data.crawl_time));
    let mut platform_ids: Vec<&String> = data.items.keys().collect();
    platform_ids.sort();
    for platform_id in platform_ids {
        let name = data.platform_names.get(platform_id).cloned().unwrap_or_else(|| platform_id.clone());
        out.push_str(&format!("<h2>{name}</h2>\n<ol>\n"));
        for item in &data.items[platform_id] {
            out.push_str(&format!("<li>{}</li>\n", html_escape(&item.title)));
        }
        out.push_str("</ol>\n");
    }
    out.push_str("</body></html>\n");
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetcher::{FetchOutput, RawTitle};
    use crate::core::storage::AppStorage;
    use crate::data::local::LocalStorageBackend;

    struct StaticFetcher(FetchOutput);

    #[async_trait::async_trait]
    impl NewsFetcher for StaticFetcher {
        async fn fetch(&self, _requests: &[FetchRequest], _interval_ms: u64) -> FetchOutput {
            self.0.clone()
        }
    }

    fn test_facade() -> (Facade, tempfile::TempDir) {
        let (storage, tmp) = AppStorage::init_for_test();
        let storage = Arc::new(storage);
        let backend = Arc::new(StorageBackend::Local(Arc::new(LocalStorageBackend::new(storage.clone()))));
        let facade = Facade::new(
            backend,
            storage,
            Arc::new(TtlCache::new()),
            KeywordRules::default(),
            WeightConfig::default(),
            time::resolve_timezone(None),
            30,
            PathBuf::from("frequency_words.txt"),
        );
        (facade, tmp)
    }

    #[tokio::test]
    async fn trigger_crawl_saves_and_reflects_in_get_latest_news() {
        let (facade, _tmp) = test_facade();
        let mut titles = HashMap::new();
        titles.insert(
            "Headline A".to_string(),
            RawTitle { ranks: vec![1], url: "https://example.com/a".into(), mobile_url: String::new() },
        );
        let mut items = HashMap::new();
        items.insert("weibo".to_string(), titles);
        let mut platform_names = HashMap::new();
        platform_names.insert("weibo".to_string(), "Weibo".to_string());
        let fetcher = StaticFetcher(FetchOutput { items, platform_names, failed: Vec::new() });

        let result = facade
            .trigger_crawl(
                &fetcher,
                vec![FetchRequest { platform_id: "weibo".into(), platform_name: Some("Weibo".into()) }],
                0,
                false,
                false,
            )
            .await
            .unwrap();
        assert!(result.saved_to_local);
        assert_eq!(result.new_items, 1);

        let latest = facade.get_latest_news(None, 10, true).await.unwrap();
        assert_eq!(latest.items.len(), 1);
        assert_eq!(latest.items[0].title, "Headline A");
    }

    #[tokio::test]
    async fn get_trending_topics_rejects_an_unknown_mode() {
        let (facade, _tmp) = test_facade();
        let err = facade.get_trending_topics(5, "weekly", "keywords").await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn sync_from_remote_rejects_when_no_remote_backend_configured() {
        let (facade, _tmp) = test_facade();
        let err = facade.sync_from_remote(3).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
    }
}

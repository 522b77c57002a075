//! Weight and frequency analyzer (§4.7): composite news weight, mode
//! selection, keyword-group bucketing, per-group ranking, and caps.

use serde::Serialize;

use crate::core::constants::{
    DEFAULT_GROUP_MAX_COUNT, DEFAULT_RANK_THRESHOLD, DEFAULT_WEIGHT_FREQUENCY,
    DEFAULT_WEIGHT_HOTNESS, DEFAULT_WEIGHT_RANK, FREQUENCY_SCORE_CAP, RANK_SCORE_CAP,
};
use crate::domain::keywords::{KeywordGroup, KeywordRules, match_title};
use crate::domain::news::NewsItem;
use crate::domain::time::convert_time_for_display;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WeightConfig {
    pub weight_rank: f64,
    pub weight_frequency: f64,
    pub weight_hotness: f64,
    pub rank_threshold: i64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            weight_rank: DEFAULT_WEIGHT_RANK,
            weight_frequency: DEFAULT_WEIGHT_FREQUENCY,
            weight_hotness: DEFAULT_WEIGHT_HOTNESS,
            rank_threshold: DEFAULT_RANK_THRESHOLD,
        }
    }
}

/// Composite weight in roughly `[0, 100]` (§4.7, §8 scenario 4).
pub fn compute_weight(item: &NewsItem, config: &WeightConfig) -> f64 {
    let ranks = &item.rank_history;
    if ranks.is_empty() {
        return 0.0;
    }

    let rank_score: f64 = ranks
        .iter()
        .map(|&r| (11 - r.min(RANK_SCORE_CAP)) as f64)
        .sum::<f64>()
        / ranks.len() as f64;

    let frequency_score = (item.crawl_count.min(FREQUENCY_SCORE_CAP) * 10) as f64;

    let high_rank_count = ranks.iter().filter(|&&r| r <= config.rank_threshold).count();
    let hotness_score = (high_rank_count as f64 / ranks.len() as f64) * 100.0;

    rank_score * config.weight_rank + frequency_score * config.weight_frequency + hotness_score * config.weight_hotness
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    Daily,
    Incremental,
    Current,
}

/// Select the input set for a mode (§4.7 mode table).
///
/// `new_titles` is the per-platform new-title set for the latest crawl,
/// needed only for `Incremental` mode; `is_first_crawl_today` short-circuits
/// incremental mode to "all items" on the day's first crawl.
pub fn select_input<'a>(
    mode: AnalysisMode,
    all_items: &'a [NewsItem],
    is_first_crawl_today: bool,
    new_titles: &std::collections::HashSet<String>,
) -> Vec<&'a NewsItem> {
    match mode {
        AnalysisMode::Daily => all_items.iter().collect(),
        AnalysisMode::Incremental => {
            if is_first_crawl_today {
                all_items.iter().collect()
            } else {
                all_items.iter().filter(|i| new_titles.contains(&i.title)).collect()
            }
        }
        AnalysisMode::Current => {
            let max_time = all_items.iter().map(|i| i.last_seen_time.as_str()).max();
            match max_time {
                Some(max_time) => all_items.iter().filter(|i| i.last_seen_time == max_time).collect(),
                None => Vec::new(),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleEntry {
    pub title: String,
    pub platform_name: String,
    pub min_rank: i64,
    pub max_rank: i64,
    pub time_display: String,
    pub crawl_count: i64,
    pub is_new: bool,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub group_key: String,
    pub count: usize,
    pub percentage: f64,
    pub titles: Vec<TitleEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSortOrder {
    /// Preserve config order, break ties by descending count.
    ConfigThenCount,
    /// Sort by descending count first, config order as tiebreak.
    CountThenConfig,
}

/// Run the full §4.7 pipeline: bucket matched titles into groups, rank within
/// each group, cap per group, then order the groups.
pub fn analyze(
    input: &[&NewsItem],
    rules: &KeywordRules,
    new_titles: &std::collections::HashSet<String>,
    all_is_new: bool,
    weight_config: &WeightConfig,
    group_sort: GroupSortOrder,
) -> Vec<GroupResult> {
    let total = input.len();
    if total == 0 {
        return Vec::new();
    }

    // Step 2: synthesize the "all news" group when no rules are configured.
    let synthetic_all;
    let groups: &[KeywordGroup] = if rules.groups.is_empty() {
        synthetic_all = vec![KeywordGroup {
            required: Vec::new(),
            normal: Vec::new(),
            group_filters: Vec::new(),
            max_count: 0,
        }];
        &synthetic_all
    } else {
        &rules.groups
    };
    let bypass_filters = rules.groups.is_empty();

    let mut bucketed: Vec<Vec<&NewsItem>> = vec![Vec::new(); groups.len()];

    for &item in input {
        let idx = if bypass_filters {
            Some(0)
        } else {
            match_title(rules, &item.title)
        };
        if let Some(idx) = idx {
            bucketed[idx].push(item);
        }
    }

    let mut results: Vec<(usize, GroupResult)> = Vec::new();

    for (idx, mut items) in bucketed.into_iter().enumerate() {
        if items.is_empty() {
            continue;
        }
        items.sort_by(|a, b| {
            let wa = compute_weight(a, weight_config);
            let wb = compute_weight(b, weight_config);
            let ra = a.rank_history.iter().min().copied().unwrap_or(i64::MAX);
            let rb = b.rank_history.iter().min().copied().unwrap_or(i64::MAX);
            wb.partial_cmp(&wa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ra.cmp(&rb))
                .then(b.crawl_count.cmp(&a.crawl_count))
        });

        let cap = if groups[idx].max_count > 0 {
            groups[idx].max_count
        } else {
            DEFAULT_GROUP_MAX_COUNT
        };
        if cap > 0 {
            items.truncate(cap);
        }

        let titles: Vec<TitleEntry> = items
            .iter()
            .map(|item| {
                let time_display = if item.first_seen_time == item.last_seen_time {
                    convert_time_for_display(&item.first_seen_time)
                } else {
                    format!(
                        "[{} ~ {}]",
                        convert_time_for_display(&item.first_seen_time),
                        convert_time_for_display(&item.last_seen_time)
                    )
                };
                TitleEntry {
                    title: item.title.clone(),
                    platform_name: item.platform_name.clone(),
                    min_rank: item.rank_history.iter().min().copied().unwrap_or(item.rank),
                    max_rank: item.rank_history.iter().max().copied().unwrap_or(item.rank),
                    time_display,
                    crawl_count: item.crawl_count,
                    is_new: all_is_new || new_titles.contains(&item.title),
                    weight: compute_weight(item, weight_config),
                }
            })
            .collect();

        results.push((
            idx,
            GroupResult {
                group_key: if bypass_filters {
                    "all news".to_string()
                } else {
                    groups[idx].group_key()
                },
                count: titles.len(),
                percentage: (titles.len() as f64 / total as f64) * 100.0,
                titles,
            },
        ));
    }

    match group_sort {
        GroupSortOrder::ConfigThenCount => {
            results.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.count.cmp(&a.1.count)))
        }
        GroupSortOrder::CountThenConfig => {
            results.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(&b.0)))
        }
    }

    results.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(ranks: Vec<i64>, crawl_count: i64) -> NewsItem {
        NewsItem {
            title: "t".into(),
            platform_id: "p".into(),
            platform_name: "P".into(),
            rank: ranks[0],
            url: String::new(),
            mobile_url: String::new(),
            first_seen_time: "09-00".into(),
            last_seen_time: "09-00".into(),
            crawl_count,
            rank_history: ranks,
        }
    }

    #[test]
    fn weight_matches_the_worked_example() {
        let config = WeightConfig::default();
        let i = item(vec![1, 1, 2], 3);
        let w = compute_weight(&i, &config);
        assert!((w - 42.87).abs() < 0.01, "got {w}");
    }

    #[test]
    fn frequency_score_saturates_at_ten() {
        let config = WeightConfig::default();
        let low = item(vec![5], 10);
        let high = item(vec![5], 25);
        assert_eq!(compute_weight(&low, &config), compute_weight(&high, &config));
    }
}

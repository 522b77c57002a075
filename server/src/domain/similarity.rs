//! Character-bigram cosine similarity (§4.8), used by `find_related_news`,
//! `search_news`'s fuzzy mode, and `aggregate_news`'s clustering step.
//!
//! Grounded on the same "small, pure, well-tested function" shape as
//! [`crate::domain::url::canonicalize`] — no crate pulls in a string-distance
//! library in the teacher or the rest of the pack, so this is hand-rolled
//! rather than reached for a dependency that solves a one-screen problem.

use std::collections::HashMap;

/// Bigram multiset of a string, lowercased, whitespace-insensitive.
fn bigrams(s: &str) -> HashMap<(char, char), u32> {
    let chars: Vec<char> = s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
    let mut counts = HashMap::new();
    if chars.len() < 2 {
        if let Some(&c) = chars.first() {
            *counts.entry((c, '\0')).or_insert(0) += 1;
        }
        return counts;
    }
    for window in chars.windows(2) {
        *counts.entry((window[0], window[1])).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity between the bigram vectors of `a` and `b`, in `[0, 1]`.
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    let ba = bigrams(a);
    let bb = bigrams(b);
    if ba.is_empty() || bb.is_empty() {
        return 0.0;
    }

    let dot: f64 = ba
        .iter()
        .filter_map(|(k, &va)| bb.get(k).map(|&vb| (va as f64) * (vb as f64)))
        .sum();
    let norm_a: f64 = ba.values().map(|&v| (v as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = bb.values().map(|&v| (v as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_fully_similar() {
        assert!((cosine_similarity("特斯拉降价", "特斯拉降价") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unrelated_strings_score_low() {
        let score = cosine_similarity("特斯拉宣布降价", "篮球比赛结果公布");
        assert!(score < 0.3, "got {score}");
    }

    #[test]
    fn overlapping_titles_score_moderately_high() {
        let score = cosine_similarity("特斯拉宣布全系降价", "特斯拉全系车型降价通知");
        assert!(score > 0.4, "got {score}");
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(cosine_similarity("", "anything"), 0.0);
    }
}

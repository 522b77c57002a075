//! N-gram auto-extraction (§4.8), used by `get_trending_topics` when no
//! keyword rule groups are configured: instead of bucketing by a fixed
//! grammar, surface the character n-grams that recur most often across the
//! day's titles as emergent topic candidates.

use std::collections::{HashMap, HashSet};

const STOPWORDS: &[&str] = &[
    "的", "了", "是", "在", "和", "与", "对", "为", "被", "将", "从", "及", "或", "也", "都",
    "又", "就", "还", "却", "而", "之", "其", "他", "她", "它", "这", "那", "个", "中", "上",
    "下", "不", "有", "人", "the", "a", "an", "of", "to", "in", "on", "for", "and", "is", "are",
];

fn is_stopword(s: &str) -> bool {
    STOPWORDS.contains(&s)
}

/// Character n-grams of length `n` from one title, punctuation stripped.
fn ngrams(title: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = title
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_ascii_punctuation())
        .collect();
    if chars.len() < n {
        return Vec::new();
    }
    chars
        .windows(n)
        .map(|w| w.iter().collect::<String>())
        .filter(|g| !is_stopword(g))
        .collect()
}

/// Extract the `top_n` most frequent 2-4 character n-grams across `titles`.
///
/// Each title contributes each distinct n-gram at most once, so the count is
/// "how many titles mention this", not raw occurrence count within a title.
/// Ties break on the n-gram text for deterministic ordering.
pub fn auto_extract(titles: &[&str], top_n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for title in titles {
        let mut seen: HashSet<String> = HashSet::new();
        for n in 1..=3 {
            for gram in ngrams(title, n) {
                seen.insert(gram);
            }
        }
        for gram in seen {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().filter(|(_, c)| *c > 1).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurring_substring_surfaces_as_a_topic() {
        let titles = vec!["特斯拉宣布降价", "特斯拉全系降价", "比亚迪也在降价"];
        let out = auto_extract(&titles, 5);
        assert!(out.iter().any(|(g, _)| g == "降价"));
    }

    #[test]
    fn a_single_occurrence_is_dropped() {
        let titles = vec!["只出现一次的标题内容"];
        let out = auto_extract(&titles, 10);
        assert!(out.is_empty());
    }

    #[test]
    fn stopwords_are_never_emitted() {
        let titles = vec!["这是一个的的的的测试", "这是另一个的的的的测试"];
        let out = auto_extract(&titles, 20);
        assert!(!out.iter().any(|(g, _)| g == "的的"));
    }
}

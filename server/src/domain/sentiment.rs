//! Lexicon-based sentiment classifier (§4.8).
//!
//! Deliberately simple: count lexicon hits, not a trained model — matching
//! the rest of the analyzer, which favors small deterministic functions over
//! a dependency that would need its own weights shipped in the crate.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "增长", "上涨", "突破", "喜讯", "成功", "利好", "好评", "夺冠", "胜利", "提升",
    "surge", "growth", "breakthrough", "success", "win", "record high", "rally", "boost",
];

const NEGATIVE_WORDS: &[&str] = &[
    "下跌", "暴跌", "失败", "危机", "事故", "爆炸", "死亡", "坠毁", "骗局", "丑闻", "谴责", "冲突",
    "crash", "plunge", "fail", "crisis", "accident", "scandal", "death", "collapse", "conflict",
];

/// Classify one title. Returns the net score (`hits_positive - hits_negative`)
/// alongside the label, since callers may want to rank by magnitude.
pub fn classify(title: &str) -> (Sentiment, i32) {
    let lower = title.to_lowercase();
    let pos = POSITIVE_WORDS.iter().filter(|w| lower.contains(&w.to_lowercase())).count() as i32;
    let neg = NEGATIVE_WORDS.iter().filter(|w| lower.contains(&w.to_lowercase())).count() as i32;
    let score = pos - neg;
    let sentiment = match score.cmp(&0) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    };
    (sentiment, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_lexicon_hit_classifies_positive() {
        let (s, score) = classify("股价大涨，公司业绩增长显著");
        assert_eq!(s, Sentiment::Positive);
        assert!(score > 0);
    }

    #[test]
    fn negative_lexicon_hit_classifies_negative() {
        let (s, score) = classify("股市暴跌，公司陷入危机");
        assert_eq!(s, Sentiment::Negative);
        assert!(score < 0);
    }

    #[test]
    fn no_lexicon_hits_is_neutral() {
        let (s, score) = classify("今日天气晴朗");
        assert_eq!(s, Sentiment::Neutral);
        assert_eq!(score, 0);
    }

    #[test]
    fn mixed_signals_net_to_a_score() {
        let (_, score) = classify("crash followed by a strong rally");
        assert_eq!(score, 0);
    }
}

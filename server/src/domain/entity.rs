//! Entity lexicon (§4.8 `search_news` entity mode).
//!
//! The source material documents keyword rules (§4.3) in detail but never
//! specifies an entity tagger; the entity-mode search only needs to restrict
//! matches to tokens that look like a person/place/organization, not run a
//! full NER model, so this is a small static gazetteer in the same spirit as
//! [`crate::domain::tokenize`]'s stopword list.

const ENTITIES: &[&str] = &[
    "特斯拉", "苹果", "谷歌", "微软", "亚马逊", "腾讯", "阿里巴巴", "字节跳动", "华为", "比亚迪",
    "美国", "中国", "日本", "欧盟", "俄罗斯", "印度", "英国", "法国", "德国", "韩国",
    "联合国", "世界银行", "美联储", "国家队",
    "tesla", "apple", "google", "microsoft", "amazon", "meta", "openai", "nvidia",
    "nasa", "fed", "eu", "un",
];

/// Every gazetteer entry present in `text`, longest match first so a
/// substring entry (e.g. "apple") doesn't shadow a longer one that contains it.
pub fn tag_entities(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let mut found: Vec<&'static str> = ENTITIES
        .iter()
        .copied()
        .filter(|e| lower.contains(&e.to_lowercase()))
        .collect();
    found.sort_by_key(|e| std::cmp::Reverse(e.chars().count()));
    found
}

/// Whether `query` names (or is named by) one of the entities present in `text`.
pub fn entity_matches(text: &str, query: &str) -> bool {
    let query_lower = query.to_lowercase();
    tag_entities(text)
        .iter()
        .any(|e| e.to_lowercase().contains(&query_lower) || query_lower.contains(&e.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_a_known_organization() {
        assert!(tag_entities("特斯拉宣布降价").contains(&"特斯拉"));
    }

    #[test]
    fn entity_match_is_case_insensitive() {
        assert!(entity_matches("Tesla cuts prices again", "tesla"));
    }

    #[test]
    fn unrelated_query_does_not_match() {
        assert!(!entity_matches("今日天气晴朗", "tesla"));
    }
}

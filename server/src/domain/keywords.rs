//! Keyword rule loader and matcher (§4.3).
//!
//! The rule file groups tokens into blank-line-separated groups, each line
//! prefixed to mean required (`+`), filter (`!`), cap (`@N`), or plain/normal.
//! An optional `[GLOBAL_FILTER]` / `[WORD_GROUPS]` marker switches sections.

use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordGroup {
    pub required: Vec<String>,
    pub normal: Vec<String>,
    pub group_filters: Vec<String>,
    pub max_count: usize,
}

impl KeywordGroup {
    pub fn group_key(&self) -> String {
        if !self.normal.is_empty() {
            self.normal.join(" ")
        } else {
            self.required.join(" ")
        }
    }

    fn is_emittable(&self) -> bool {
        !self.required.is_empty() || !self.normal.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordRules {
    pub groups: Vec<KeywordGroup>,
    pub shared_filters: Vec<String>,
    pub global_filters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    WordGroups,
    GlobalFilter,
}

/// Parse a keyword rule file from text. A missing file (`content = ""`) yields
/// empty rules, not an error — that is handled by the caller reading the file.
pub fn parse(content: &str) -> KeywordRules {
    let mut rules = KeywordRules::default();
    let mut section = Section::WordGroups;
    let mut current = KeywordGroup::default();

    let flush = |group: &mut KeywordGroup, rules: &mut KeywordRules| {
        if group.is_emittable() {
            rules.groups.push(std::mem::take(group));
        } else {
            *group = KeywordGroup::default();
        }
    };

    for raw_line in content.lines() {
        let line = raw_line.trim();

        if line.is_empty() {
            flush(&mut current, &mut rules);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }
        if line.eq_ignore_ascii_case("[WORD_GROUPS]") {
            section = Section::WordGroups;
            continue;
        }
        if line.eq_ignore_ascii_case("[GLOBAL_FILTER]") {
            flush(&mut current, &mut rules);
            section = Section::GlobalFilter;
            continue;
        }

        match section {
            Section::GlobalFilter => {
                // Only bare words are read here; prefixed tokens are ignored.
                if !line.starts_with(['+', '!', '@']) {
                    rules.global_filters.extend(split_words(line));
                }
            }
            Section::WordGroups => {
                if let Some(word) = line.strip_prefix('+') {
                    current.required.extend(split_words(word));
                } else if let Some(word) = line.strip_prefix('!') {
                    let words = split_words(word);
                    rules.shared_filters.extend(words.iter().cloned());
                    current.group_filters.extend(words);
                } else if let Some(n) = line.strip_prefix('@') {
                    if let Ok(n) = n.trim().parse::<usize>() {
                        current.max_count = n;
                    }
                } else {
                    current.normal.extend(split_words(line));
                }
            }
        }
    }
    flush(&mut current, &mut rules);
    rules
}

/// Split a line's token on `,`/`，` into its constituent words (§8 scenario
/// 2: `涨价,降价` on one line yields two normal words, `group_key` "涨价 降价").
fn split_words(token: &str) -> Vec<String> {
    token
        .split([',', '，'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load rules from a file path. Missing file -> empty rules (logged, not an error).
pub fn load(path: &Path) -> KeywordRules {
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "keyword rule file unreadable, using empty rules");
            KeywordRules::default()
        }
    }
}

/// Match a title against the rule set, returning the index of the first
/// matching group (declaration order wins). `None` if the title is globally
/// filtered, filtered by the shared filter set, or matches no group.
///
/// An empty rule set (`groups` is empty) matches everything — callers that
/// need the "all news" synthetic group build it themselves (§4.7 step 2) and
/// never call this function in that state.
pub fn match_title(rules: &KeywordRules, title: &str) -> Option<usize> {
    let lower = title.to_lowercase();

    if rules.global_filters.iter().any(|f| lower.contains(&f.to_lowercase())) {
        return None;
    }

    if rules.groups.is_empty() {
        return None;
    }

    if rules.shared_filters.iter().any(|f| lower.contains(&f.to_lowercase())) {
        return None;
    }

    rules.groups.iter().position(|group| {
        let required_ok = group.required.iter().all(|w| lower.contains(&w.to_lowercase()));
        let normal_ok = group.normal.is_empty() || group.normal.iter().any(|w| lower.contains(&w.to_lowercase()));
        let filter_ok = !group.group_filters.iter().any(|w| lower.contains(&w.to_lowercase()));
        required_ok && normal_ok && filter_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[GLOBAL_FILTER]\n广告\n[WORD_GROUPS]\n+特斯拉\n涨价,降价\n!二手\n@5\n";

    #[test]
    fn parses_groups_filters_and_cap() {
        let rules = parse(SAMPLE);
        assert_eq!(rules.global_filters, vec!["广告"]);
        assert_eq!(rules.groups.len(), 1);
        let g = &rules.groups[0];
        assert_eq!(g.required, vec!["特斯拉"]);
        assert_eq!(g.normal, vec!["涨价", "降价"]);
        assert_eq!(g.group_filters, vec!["二手"]);
        assert_eq!(g.max_count, 5);
    }

    #[test]
    fn matches_required_and_normal_words() {
        let rules = parse(SAMPLE);
        let idx = match_title(&rules, "特斯拉宣布降价5万");
        assert_eq!(idx, Some(0));
        assert_eq!(rules.groups[0].group_key(), "涨价 降价");
    }

    #[test]
    fn group_local_filter_rejects_the_title() {
        let rules = parse(SAMPLE);
        assert_eq!(match_title(&rules, "特斯拉二手车涨价"), None);
    }

    #[test]
    fn comma_separated_words_on_one_line_split_into_two_normal_words() {
        let rules = parse("+x\na,b\n");
        assert_eq!(rules.groups[0].normal, vec!["a", "b"]);
    }

    #[test]
    fn global_filter_rejects_regardless_of_group_match() {
        let rules = parse(SAMPLE);
        assert_eq!(match_title(&rules, "广告：特斯拉降价促销"), None);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let rules = parse("+tesla\nprice\n");
        assert_eq!(match_title(&rules, "TESLA PRICE CUT"), Some(0));
    }

    #[test]
    fn missing_file_yields_empty_rules() {
        let rules = load(Path::new("/nonexistent/frequency_words.txt"));
        assert!(rules.groups.is_empty());
    }
}

//! URL canonicalizer (§4.1): strips per-platform volatile query parameters so
//! the storage engine can use the result as a stable identity key.

/// Query parameters known to be volatile for a given platform id.
fn volatile_params_for(platform_id: &str) -> &'static [&'static str] {
    match platform_id {
        "weibo" => &["band_rank"],
        "toutiao" | "douyin" => &["session_id", "sid"],
        _ => &[],
    }
}

/// Drop volatile query parameters for `platform_id`, preserving the order of
/// the parameters that remain. Pure and idempotent: re-canonicalizing an
/// already-canonical URL returns it unchanged.
pub fn canonicalize(url: &str, platform_id: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    let drop_list = volatile_params_for(platform_id);
    if drop_list.is_empty() {
        return url.to_string();
    }

    let Some(query_start) = url.find('?') else {
        return url.to_string();
    };

    let (base, query) = url.split_at(query_start);
    let query = &query[1..]; // drop leading '?'

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or(pair);
            !drop_list.contains(&key)
        })
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_weibo_band_rank_preserving_other_params() {
        let url = "https://weibo.com/hot?band_rank=3&x=1";
        assert_eq!(canonicalize(url, "weibo"), "https://weibo.com/hot?x=1");
    }

    #[test]
    fn empty_url_stays_empty() {
        assert_eq!(canonicalize("", "weibo"), "");
    }

    #[test]
    fn unknown_platform_is_left_untouched() {
        let url = "https://example.com/a?b=1";
        assert_eq!(canonicalize(url, "unknown"), url);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let url = "https://weibo.com/hot?band_rank=3&x=1";
        let once = canonicalize(url, "weibo");
        let twice = canonicalize(&once, "weibo");
        assert_eq!(once, twice);
    }

    #[test]
    fn dropping_the_only_param_leaves_the_bare_path() {
        let url = "https://weibo.com/hot?band_rank=3";
        assert_eq!(canonicalize(url, "weibo"), "https://weibo.com/hot");
    }
}

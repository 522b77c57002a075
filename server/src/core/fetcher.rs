//! External fetcher boundary (§6 "External fetcher contract").
//!
//! The fetcher itself — the code that actually calls out to each news
//! platform's hot-list endpoint — is explicitly out of scope for this engine;
//! only the shape it must produce is specified. [`NewsFetcher`] is that
//! boundary: `trigger_crawl` composes whatever implementation is wired in
//! with the storage engine, and never knows how the data was obtained.

use std::collections::HashMap;

use async_trait::async_trait;

/// One platform to fetch, by id with an optional display name override.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub platform_id: String,
    pub platform_name: Option<String>,
}

/// One title as the fetcher observed it in a single pass.
#[derive(Debug, Clone)]
pub struct RawTitle {
    pub ranks: Vec<i64>,
    pub url: String,
    pub mobile_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutput {
    pub items: HashMap<String, HashMap<String, RawTitle>>,
    pub platform_names: HashMap<String, String>,
    pub failed: Vec<String>,
}

#[async_trait]
pub trait NewsFetcher: Send + Sync {
    async fn fetch(&self, requests: &[FetchRequest], request_interval_ms: u64) -> FetchOutput;
}

/// Placeholder fetcher that reports every requested platform as failed.
///
/// Stands in for the real scraping implementation the spec declares out of
/// scope, so `trigger_crawl`'s save/snapshot/cache-clear composition is fully
/// exercisable without a live network dependency; swapping in a real fetcher
/// means providing another [`NewsFetcher`] impl, not touching this engine.
pub struct NullFetcher;

#[async_trait]
impl NewsFetcher for NullFetcher {
    async fn fetch(&self, requests: &[FetchRequest], _request_interval_ms: u64) -> FetchOutput {
        tracing::warn!(
            count = requests.len(),
            "no fetcher configured; reporting every requested platform as failed"
        );
        FetchOutput {
            items: HashMap::new(),
            platform_names: HashMap::new(),
            failed: requests.iter().map(|r| r.platform_id.clone()).collect(),
        }
    }
}

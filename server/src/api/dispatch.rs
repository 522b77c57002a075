//! Tool dispatcher (§4.10): the registry of named tools the transports
//! (stdio, http) route requests into, plus the `{tool_name, arguments}` ->
//! envelope translation (§6).
//!
//! Grounded on the teacher's `api::mcp::tools` dispatch table: one match arm
//! per tool name, argument extraction up front, the actual work delegated to
//! a single service the handlers never touch storage directly through.  Here
//! that service is [`Facade`] instead of the teacher's repository traits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::fetcher::{FetchRequest, NewsFetcher};
use crate::data::DispatchError;
use crate::domain::time::DateRange;
use crate::facade::Facade;

/// `{tool_name, arguments}` request frame (§6), the sole entry point both
/// transports deserialize into.
#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Wrap a handler's outcome into the `{success, ...}` envelope (§6). A
/// successful object result is flattened (its fields sit alongside
/// `success: true`); a successful non-object result is nested under `result`.
pub fn wrap_response(outcome: Result<Value, DispatchError>) -> Value {
    match outcome {
        Ok(Value::Object(mut map)) => {
            map.insert("success".to_string(), Value::Bool(true));
            Value::Object(map)
        }
        Ok(other) => json!({ "success": true, "result": other }),
        Err(e) => json!({
            "success": false,
            "error": { "code": e.code(), "message": e.to_string() },
        }),
    }
}

/// Everything a tool call needs besides its own arguments.
#[derive(Clone)]
pub struct Dispatcher {
    facade: Arc<Facade>,
    fetcher: Arc<dyn NewsFetcher>,
}

impl Dispatcher {
    pub fn new(facade: Arc<Facade>, fetcher: Arc<dyn NewsFetcher>) -> Self {
        Self { facade, fetcher }
    }

    /// Validate arguments, route to the named tool, call into `Facade`,
    /// serialize the typed result. Never panics on malformed input — every
    /// failure becomes a `DispatchError` for `wrap_response` to translate.
    pub async fn dispatch(&self, tool_name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let args = Args(arguments);

        match tool_name {
            "resolve_date_range" => {
                let expression = args.require_str("expression")?;
                to_value(self.facade.resolve_date_range(&expression)?)
            }

            "get_latest_news" => {
                let platforms = args.opt_str_vec("platforms")?;
                let limit = args.opt_usize("limit")?.unwrap_or(50);
                let include_url = args.opt_bool("include_url")?.unwrap_or(false);
                to_value(self.facade.get_latest_news(platforms, limit, include_url).await?)
            }

            "get_news_by_date" => {
                let date_range = self.require_date_range(&args, "date_range")?;
                let platforms = args.opt_str_vec("platforms")?;
                let limit = args.opt_usize("limit")?.unwrap_or(100);
                let include_url = args.opt_bool("include_url")?.unwrap_or(false);
                to_value(self.facade.get_news_by_date(date_range, platforms, limit, include_url).await?)
            }

            "get_trending_topics" => {
                let top_n = args.opt_usize("top_n")?.unwrap_or(10);
                let mode = args.opt_str("mode")?.unwrap_or_else(|| "daily".to_string());
                let extract_mode = args.opt_str("extract_mode")?.unwrap_or_else(|| "keywords".to_string());
                to_value(self.facade.get_trending_topics(top_n, &mode, &extract_mode).await?)
            }

            "analyze_sentiment" => {
                let topic = args.opt_str("topic")?;
                let platforms = args.opt_str_vec("platforms")?;
                let date_range = self.opt_date_range(&args, "date_range")?;
                let limit = args.opt_usize("limit")?.unwrap_or(20);
                let sort_by_weight = args.opt_bool("sort_by_weight")?.unwrap_or(true);
                let include_url = args.opt_bool("include_url")?.unwrap_or(false);
                to_value(
                    self.facade
                        .analyze_sentiment(topic, platforms, date_range, limit, sort_by_weight, include_url)
                        .await?,
                )
            }

            "find_related_news" => {
                let reference_title = args.require_str("reference_title")?;
                let date_range = self.opt_date_range(&args, "date_range")?;
                let threshold = args.opt_f64("threshold")?;
                let limit = args.opt_usize("limit")?.unwrap_or(10);
                to_value(self.facade.find_related_news(reference_title, date_range, threshold, limit).await?)
            }

            "search_news" => {
                let query = args.require_str("query")?;
                let search_mode = args.opt_str("search_mode")?.unwrap_or_else(|| "keyword".to_string());
                let date_range = self.opt_date_range(&args, "date_range")?;
                let platforms = args.opt_str_vec("platforms")?;
                let limit = args.opt_usize("limit")?.unwrap_or(20);
                let sort_by = args.opt_str("sort_by")?.unwrap_or_else(|| "relevance".to_string());
                let threshold = args.opt_f64("threshold")?;
                let include_url = args.opt_bool("include_url")?.unwrap_or(false);
                to_value(
                    self.facade
                        .search_news(query, &search_mode, date_range, platforms, limit, &sort_by, threshold, include_url)
                        .await?,
                )
            }

            "aggregate_news" => {
                let date_range = self.opt_date_range(&args, "date_range")?;
                let platforms = args.opt_str_vec("platforms")?;
                let similarity_threshold = args.opt_f64("similarity_threshold")?.unwrap_or(0.5);
                let limit = args.opt_usize("limit")?.unwrap_or(20);
                let include_url = args.opt_bool("include_url")?.unwrap_or(false);
                to_value(
                    self.facade
                        .aggregate_news(date_range, platforms, similarity_threshold, limit, include_url)
                        .await?,
                )
            }

            "compare_periods" => {
                let period1 = self.require_date_range(&args, "period1")?;
                let period2 = self.require_date_range(&args, "period2")?;
                let topic = args.opt_str("topic")?;
                let compare_type = args.opt_str("compare_type")?.unwrap_or_else(|| "overview".to_string());
                let platforms = args.opt_str_vec("platforms")?;
                let top_n = args.opt_usize("top_n")?.unwrap_or(10);
                to_value(
                    self.facade
                        .compare_periods(period1, period2, topic, &compare_type, platforms, top_n)
                        .await?,
                )
            }

            "generate_summary_report" => {
                let report_type = args.opt_str("report_type")?.unwrap_or_else(|| "daily".to_string());
                let date_range = self.opt_date_range(&args, "date_range")?;
                to_value(self.facade.generate_summary_report(&report_type, date_range).await?)
            }

            "analyze_topic_trend" => {
                let topic = args.require_str("topic")?;
                let date_range = self.opt_date_range(&args, "date_range")?;
                let granularity = args.opt_str("granularity")?;
                to_value(self.facade.analyze_topic_trend(topic, date_range, granularity).await?)
            }

            "analyze_data_insights" => {
                let date_range = self.opt_date_range(&args, "date_range")?;
                let top_n = args.opt_usize("top_n")?.unwrap_or(10);
                to_value(self.facade.analyze_data_insights(date_range, top_n).await?)
            }

            "get_current_config" => to_value(self.facade.get_current_config()),

            "get_system_status" => to_value(self.facade.get_system_status()),

            "get_storage_status" => to_value(self.facade.get_storage_status().await?),

            "list_available_dates" => to_value(self.facade.list_available_dates().await?),

            "trigger_crawl" => {
                let requests = parse_fetch_requests(&args)?;
                let request_interval_ms = args.opt_u64("request_interval_ms")?.unwrap_or(1000);
                let save_txt = args.opt_bool("save_txt")?.unwrap_or(false);
                let save_html = args.opt_bool("save_html")?.unwrap_or(false);
                to_value(
                    self.facade
                        .trigger_crawl(self.fetcher.as_ref(), requests, request_interval_ms, save_txt, save_html)
                        .await?,
                )
            }

            "sync_from_remote" => {
                let days = args.opt_u32("days")?.unwrap_or(7);
                to_value(self.facade.sync_from_remote(days).await?)
            }

            other => Err(DispatchError::UnknownTool(other.to_string())),
        }
    }

    fn opt_date_range(&self, args: &Args, key: &str) -> Result<Option<DateRange>, DispatchError> {
        match args.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(expr)) => Ok(Some(self.facade.resolve_date_range(expr)?)),
            Some(v @ Value::Object(_)) => {
                let range: DateRange = serde_json::from_value(v.clone()).map_err(|e| {
                    DispatchError::InvalidArguments(format!("`{key}` must have `start`/`end` string fields: {e}"))
                })?;
                Ok(Some(range))
            }
            Some(_) => Err(DispatchError::InvalidArguments(format!(
                "`{key}` must be an object `{{start, end}}` or a date expression string"
            ))),
        }
    }

    fn require_date_range(&self, args: &Args, key: &str) -> Result<DateRange, DispatchError> {
        self.opt_date_range(args, key)?
            .ok_or_else(|| DispatchError::InvalidArguments(format!("missing required argument `{key}`")))
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::Internal(e.into()))
}

fn parse_fetch_requests(args: &Args) -> Result<Vec<FetchRequest>, DispatchError> {
    let items = args
        .get("platforms")
        .and_then(Value::as_array)
        .ok_or_else(|| DispatchError::InvalidArguments("`platforms` must be a non-empty array".to_string()))?;

    items
        .iter()
        .map(|item| match item {
            Value::String(id) => Ok(FetchRequest { platform_id: id.clone(), platform_name: None }),
            Value::Object(_) => {
                let platform_id = item
                    .get("platform_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| DispatchError::InvalidArguments("platform entry missing `platform_id`".to_string()))?
                    .to_string();
                let platform_name = item.get("platform_name").and_then(Value::as_str).map(str::to_string);
                Ok(FetchRequest { platform_id, platform_name })
            }
            _ => Err(DispatchError::InvalidArguments(
                "each `platforms` entry must be a string id or `{platform_id, platform_name?}`".to_string(),
            )),
        })
        .collect()
}

/// Thin read-only view over a tool call's JSON `arguments` object.
struct Args(Value);

impl Args {
    fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    fn require_str(&self, key: &str) -> Result<String, DispatchError> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DispatchError::InvalidArguments(format!("missing required string argument `{key}`")))
    }

    fn opt_str(&self, key: &str) -> Result<Option<String>, DispatchError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(DispatchError::InvalidArguments(format!("`{key}` must be a string"))),
        }
    }

    fn opt_str_vec(&self, key: &str) -> Result<Option<Vec<String>>, DispatchError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| DispatchError::InvalidArguments(format!("`{key}` must be an array of strings")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(DispatchError::InvalidArguments(format!("`{key}` must be an array of strings"))),
        }
    }

    fn opt_usize(&self, key: &str) -> Result<Option<usize>, DispatchError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .map(|n| n as usize)
                .ok_or_else(|| DispatchError::InvalidArguments(format!("`{key}` must be a non-negative integer")))
                .map(Some),
        }
    }

    fn opt_u32(&self, key: &str) -> Result<Option<u32>, DispatchError> {
        Ok(self.opt_usize(key)?.map(|n| n as u32))
    }

    fn opt_u64(&self, key: &str) -> Result<Option<u64>, DispatchError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_u64()
                .ok_or_else(|| DispatchError::InvalidArguments(format!("`{key}` must be a non-negative integer")))
                .map(Some),
        }
    }

    fn opt_f64(&self, key: &str) -> Result<Option<f64>, DispatchError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| DispatchError::InvalidArguments(format!("`{key}` must be a number")))
                .map(Some),
        }
    }

    fn opt_bool(&self, key: &str) -> Result<Option<bool>, DispatchError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(DispatchError::InvalidArguments(format!("`{key}` must be a boolean"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::AppStorage;
    use crate::data::backend::StorageBackend;
    use crate::data::local::LocalStorageBackend;
    use crate::data::ttl_cache::TtlCache;
    use crate::domain::keywords::KeywordRules;
    use crate::domain::weight::WeightConfig;

    fn make_dispatcher() -> (Dispatcher, tempfile::TempDir) {
        let (storage, tmp) = AppStorage::init_for_test();
        let storage = Arc::new(storage);
        let backend = Arc::new(StorageBackend::Local(Arc::new(LocalStorageBackend::new(storage.clone()))));
        let facade = Arc::new(Facade::new(
            backend,
            storage,
            Arc::new(TtlCache::new()),
            KeywordRules::default(),
            WeightConfig::default(),
            crate::domain::time::resolve_timezone(None),
            30,
            std::path::PathBuf::from("frequency_words.txt"),
        ));
        (Dispatcher::new(facade, Arc::new(crate::core::fetcher::NullFetcher)), tmp)
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let (dispatcher, _tmp) = make_dispatcher();
        let err = dispatcher.dispatch("not_a_real_tool", json!({})).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn missing_required_argument_is_rejected() {
        let (dispatcher, _tmp) = make_dispatcher();
        let err = dispatcher.dispatch("resolve_date_range", json!({})).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn resolve_date_range_accepts_a_natural_language_expression() {
        let (dispatcher, _tmp) = make_dispatcher();
        let result = dispatcher.dispatch("resolve_date_range", json!({"expression": "today"})).await.unwrap();
        assert!(result.get("start").is_some());
        assert!(result.get("end").is_some());
    }

    #[tokio::test]
    async fn get_latest_news_wraps_into_success_envelope() {
        let (dispatcher, _tmp) = make_dispatcher();
        let outcome = dispatcher.dispatch("get_latest_news", json!({})).await;
        let response = wrap_response(outcome);
        assert_eq!(response["success"], json!(true));
        assert_eq!(response["total"], json!(0));
    }

    #[tokio::test]
    async fn date_range_argument_accepts_an_object_form() {
        let (dispatcher, _tmp) = make_dispatcher();
        let result = dispatcher
            .dispatch("get_news_by_date", json!({"date_range": {"start": "2025-01-01", "end": "2025-01-02"}}))
            .await
            .unwrap();
        assert_eq!(result["date_range"]["start"], json!("2025-01-01"));
    }

    #[tokio::test]
    async fn dispatch_error_produces_a_failure_envelope() {
        let outcome: Result<Value, DispatchError> = Err(DispatchError::DataNotFound("2099-01-01".into()));
        let response = wrap_response(outcome);
        assert_eq!(response["success"], json!(false));
        assert_eq!(response["error"]["code"], json!("DATA_NOT_FOUND"));
    }
}

// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "TrendRadar";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "trendradar";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".trendradar";

// =============================================================================
// Environment Variables - Debug / Logging
// =============================================================================

pub const ENV_LOG: &str = "TRENDRADAR_LOG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

pub const ENV_HOST: &str = "TRENDRADAR_HOST";
pub const ENV_PORT: &str = "TRENDRADAR_PORT";
pub const ENV_PROJECT_ROOT: &str = "TRENDRADAR_PROJECT_ROOT";
pub const ENV_TRANSPORT: &str = "TRENDRADAR_TRANSPORT";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server bind host. The spec requires 0.0.0.0 (unlike the teacher's
/// loopback-only default) because the tool server is meant to be reachable
/// from other containers in a compose stack.
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3333;
pub const DEFAULT_TRANSPORT: &str = "stdio";

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Override the data root directory (per-day subdirectories live under it).
pub const ENV_DATA_DIR: &str = "TRENDRADAR_DATA_DIR";

/// Retention window in days; day-folders older than this are pruned.
pub const ENV_RETENTION_DAYS: &str = "STORAGE_RETENTION_DAYS";
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Path to the keyword rule file (§4.3). Falls back to `config/frequency_words.txt`
/// under the project root when unset.
pub const ENV_FREQUENCY_WORDS_PATH: &str = "FREQUENCY_WORDS_PATH";
pub const DEFAULT_FREQUENCY_WORDS_FILENAME: &str = "frequency_words.txt";

// =============================================================================
// Environment Variables - Remote (S3-compatible) Storage
// =============================================================================

pub const ENV_S3_ENDPOINT_URL: &str = "S3_ENDPOINT_URL";
pub const ENV_S3_BUCKET_NAME: &str = "S3_BUCKET_NAME";
pub const ENV_S3_ACCESS_KEY_ID: &str = "S3_ACCESS_KEY_ID";
pub const ENV_S3_SECRET_ACCESS_KEY: &str = "S3_SECRET_ACCESS_KEY";
pub const ENV_S3_REGION: &str = "S3_REGION";

/// Vendor fingerprint that selects legacy SigV2 signing (see DESIGN.md).
pub const S3_LEGACY_VENDOR_MARKER: &str = "myqcloud.com";

/// Remote object key prefix; objects live at `<prefix>/<date>.db`.
pub const S3_OBJECT_PREFIX: &str = "news";
pub const S3_CONTENT_TYPE_SQLITE: &str = "application/x-sqlite3";

/// Default SigV4 region when the caller doesn't set `S3_REGION`.
pub const S3_DEFAULT_REGION: &str = "us-east-1";
pub const S3_SERVICE_NAME: &str = "s3";

/// Per-request timeout for the fetcher and object-store HTTP clients (§5).
pub const HTTP_CLIENT_TIMEOUT_SECS: u64 = 10;

/// Max keys per `list-objects-v2` page and per batch delete request.
pub const S3_LIST_PAGE_SIZE: u32 = 1000;
pub const S3_DELETE_BATCH_SIZE: usize = 1000;

// =============================================================================
// SQLite day-store pragmas
// =============================================================================

pub const SQLITE_DB_FILENAME: &str = "news.db";
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;
pub const SQLITE_CACHE_SIZE: i64 = -8000;
pub const SQLITE_WAL_AUTOCHECKPOINT: i64 = 1000;
pub const SQLITE_MAX_CONNECTIONS_PER_DAY: u32 = 4;

// =============================================================================
// Time & date formatting (§4.2)
// =============================================================================

pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DATE_FOLDER_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FILENAME_FORMAT: &str = "%H-%M";

// =============================================================================
// Weight formula defaults (§4.7)
// =============================================================================

pub const DEFAULT_WEIGHT_RANK: f64 = 0.4;
pub const DEFAULT_WEIGHT_FREQUENCY: f64 = 0.3;
pub const DEFAULT_WEIGHT_HOTNESS: f64 = 0.3;
pub const DEFAULT_RANK_THRESHOLD: i64 = 3;
pub const RANK_SCORE_CAP: i64 = 10;
pub const FREQUENCY_SCORE_CAP: i64 = 10;
pub const DEFAULT_GROUP_MAX_COUNT: usize = 0;

// =============================================================================
// Query limits (§4.8)
// =============================================================================

pub const MAX_NEWS_LIMIT: usize = 1000;
pub const MAX_SENTIMENT_LIMIT: usize = 100;
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;
pub const MIN_AGGREGATION_THRESHOLD: f64 = 0.3;

// =============================================================================
// TTL cache (§4.9)
// =============================================================================

pub const CACHE_TTL_TODAY_SECS: u64 = 900;
pub const CACHE_TTL_HISTORICAL_SECS: u64 = 3600;
pub const CACHE_KEY_PREFIX_ALL_TITLES: &str = "read_all_titles";

// =============================================================================
// Shutdown
// =============================================================================

pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Background tasks
// =============================================================================

/// How often the retention sweep checks for day-stores older than the
/// configured window (§4.4).
pub const RETENTION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// How often the TTL cache is swept for stale entries (§4.9). Independent of
/// the cache's own per-entry TTLs, which gate reads, not eviction.
pub const CACHE_SWEEP_INTERVAL_SECS: u64 = 300;

// =============================================================================
// MCP server
// =============================================================================

pub const MCP_HTTP_PATH: &str = "/mcp";

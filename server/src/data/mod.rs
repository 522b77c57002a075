//! Data storage layer
//!
//! - `local` - one SQLite day-store per calendar date (§4.4)
//! - `remote` - optional S3-backed day-store replication (§4.5)
//! - `backend` - `StorageBackend` enum unifying local/remote behind one type (§4.9)
//! - `ttl_cache` - in-memory TTL cache for read-heavy query results (§4.9)
//! - `error` - unified error types for all backends

pub mod backend;
pub mod error;
pub mod local;
pub mod remote;
pub mod ttl_cache;

pub use backend::StorageBackend;
pub use error::{CacheError, DispatchError, KeywordRuleError, RemoteError, StorageError};
pub use local::LocalStorageBackend;
pub use remote::RemoteStorageBackend;
pub use ttl_cache::TtlCache;

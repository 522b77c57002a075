//! Final merged application configuration.
//!
//! Unlike the layered JSON-config-file cascade some deployments use, the
//! configuration surface here is CLI flags plus environment-variable
//! fallbacks only (`clap`'s `env = "..."` mechanism) — config-file loading is
//! explicitly out of scope. `AppConfig::load` still follows the teacher's
//! "resolve once into one immutable struct, then validate" shape.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::cli::CliConfig;
use super::constants::DEFAULT_RETENTION_DAYS;

/// Remote (S3-compatible) storage configuration. Present only when every
/// required field is set; the remote engine is optional per §4.5.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint_url: String,
    pub bucket_name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: Option<String>,
}

impl S3Config {
    /// Vendor fingerprint that needs legacy SigV2 signing (see DESIGN.md).
    pub fn needs_legacy_signature(&self) -> bool {
        self.endpoint_url
            .contains(super::constants::S3_LEGACY_VENDOR_MARKER)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub project_root: PathBuf,
    pub retention_days: i64,
    pub frequency_words_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transport: super::cli::Transport,
    pub storage: StorageConfig,
    pub s3: Option<S3Config>,
}

impl AppConfig {
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let project_root = match &cli.project_root {
            Some(p) => p.clone(),
            None => std::env::current_dir().context("resolving current directory")?,
        };

        let frequency_words_path = cli.frequency_words_path.clone().unwrap_or_else(|| {
            project_root
                .join("config")
                .join(super::constants::DEFAULT_FREQUENCY_WORDS_FILENAME)
        });

        let retention_days = if cli.retention_days > 0 {
            cli.retention_days
        } else {
            DEFAULT_RETENTION_DAYS
        };

        let s3 = match (
            &cli.s3_endpoint_url,
            &cli.s3_bucket_name,
            &cli.s3_access_key_id,
            &cli.s3_secret_access_key,
        ) {
            (Some(endpoint_url), Some(bucket_name), Some(access_key_id), Some(secret_access_key)) => {
                Some(S3Config {
                    endpoint_url: endpoint_url.clone(),
                    bucket_name: bucket_name.clone(),
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                    region: cli.s3_region.clone(),
                })
            }
            (None, None, None, None) => None,
            _ => {
                anyhow::bail!(
                    "partial S3 configuration: endpoint, bucket, access key, and secret key must all be set together"
                );
            }
        };

        let config = Self {
            server: ServerConfig {
                host: cli.host.clone(),
                port: cli.port,
            },
            transport: cli.transport,
            storage: StorageConfig {
                project_root,
                retention_days,
                frequency_words_path,
            },
            s3,
        };

        config.validate()?;
        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            retention_days = config.storage.retention_days,
            remote_enabled = config.s3.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("configuration error: host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("configuration error: port must be greater than 0");
        }
        if self.storage.retention_days <= 0 {
            anyhow::bail!("configuration error: retention_days must be greater than 0");
        }
        Ok(())
    }
}

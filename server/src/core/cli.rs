use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_RETENTION_DAYS, DEFAULT_TRANSPORT, ENV_FREQUENCY_WORDS_PATH,
    ENV_HOST, ENV_PORT, ENV_PROJECT_ROOT, ENV_RETENTION_DAYS, ENV_S3_ACCESS_KEY_ID,
    ENV_S3_BUCKET_NAME, ENV_S3_ENDPOINT_URL, ENV_S3_REGION, ENV_S3_SECRET_ACCESS_KEY,
    ENV_TRANSPORT,
};

#[derive(Parser)]
#[command(name = "trendradar")]
#[command(version, about = "Hot-topic news aggregation tool server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Tool server transport
    #[arg(long, global = true, env = ENV_TRANSPORT, value_parser = parse_transport, default_value = DEFAULT_TRANSPORT)]
    pub transport: Transport,

    /// HTTP bind host (only used when --transport=http)
    #[arg(long, global = true, env = ENV_HOST, default_value = DEFAULT_HOST)]
    pub host: String,

    /// HTTP bind port (only used when --transport=http)
    #[arg(long, global = true, env = ENV_PORT, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Root directory the data folder and keyword rule file are resolved under
    #[arg(long, global = true, env = ENV_PROJECT_ROOT)]
    pub project_root: Option<PathBuf>,

    /// Day-folder retention window, in days
    #[arg(long, global = true, env = ENV_RETENTION_DAYS, default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: i64,

    /// Path to the keyword rule file (§4.3)
    #[arg(long, global = true, env = ENV_FREQUENCY_WORDS_PATH)]
    pub frequency_words_path: Option<PathBuf>,

    /// S3-compatible endpoint URL for the remote engine. Remote sync is
    /// disabled unless all four S3 fields are present.
    #[arg(long, global = true, env = ENV_S3_ENDPOINT_URL)]
    pub s3_endpoint_url: Option<String>,

    #[arg(long, global = true, env = ENV_S3_BUCKET_NAME)]
    pub s3_bucket_name: Option<String>,

    #[arg(long, global = true, env = ENV_S3_ACCESS_KEY_ID)]
    pub s3_access_key_id: Option<String>,

    #[arg(long, global = true, env = ENV_S3_SECRET_ACCESS_KEY)]
    pub s3_secret_access_key: Option<String>,

    #[arg(long, global = true, env = ENV_S3_REGION)]
    pub s3_region: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

fn parse_transport(s: &str) -> Result<Transport, String> {
    match s.to_lowercase().as_str() {
        "stdio" => Ok(Transport::Stdio),
        "http" => Ok(Transport::Http),
        _ => Err(format!(
            "Invalid transport '{}'. Valid options: stdio, http",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the tool server (default command)
    Start,
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete the local data directory (all day-stores). Requires confirmation.
    Prune {
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments, independent of `clap`.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub transport: Transport,
    pub host: String,
    pub port: u16,
    pub project_root: Option<PathBuf>,
    pub retention_days: i64,
    pub frequency_words_path: Option<PathBuf>,
    pub s3_endpoint_url: Option<String>,
    pub s3_bucket_name: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub s3_region: Option<String>,
}

pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        transport: cli.transport,
        host: cli.host,
        port: cli.port,
        project_root: cli.project_root,
        retention_days: cli.retention_days,
        frequency_words_path: cli.frequency_words_path,
        s3_endpoint_url: cli.s3_endpoint_url,
        s3_bucket_name: cli.s3_bucket_name,
        s3_access_key_id: cli.s3_access_key_id,
        s3_secret_access_key: cli.s3_secret_access_key,
        s3_region: cli.s3_region,
    };
    (config, cli.command)
}

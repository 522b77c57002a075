//! Core application bootstrap.
//!
//! Wires the storage engines, the query/analytics facade, and the tool
//! dispatcher together, then hands off to whichever transport (§6) the CLI
//! selected. Grounded on the teacher's `CoreApp`: `run()` parses args and
//! dispatches system subcommands before constructing the full app, `init()`
//! builds every long-lived service once, and `start_server()` installs signal
//! handlers, starts background tasks, then blocks on the chosen transport.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::api::{self, Dispatcher};
use crate::core::cli::{self, CliConfig, Commands, SystemCommands, Transport};
use crate::core::config::AppConfig;
use crate::core::constants::{
    APP_NAME_LOWER, CACHE_SWEEP_INTERVAL_SECS, CACHE_TTL_HISTORICAL_SECS, ENV_LOG,
    RETENTION_SWEEP_INTERVAL_SECS,
};
use crate::core::fetcher::{NewsFetcher, NullFetcher};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::backend::StorageBackend;
use crate::data::local::LocalStorageBackend;
use crate::data::remote::RemoteStorageBackend;
use crate::data::ttl_cache::TtlCache;
use crate::domain::keywords;
use crate::domain::time;
use crate::domain::weight::WeightConfig;
use crate::facade::Facade;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: Arc<AppStorage>,
    pub facade: Arc<Facade>,
    pub dispatcher: Dispatcher,
}

impl CoreApp {
    /// Run the application with CLI argument parsing.
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "parsed command");

        match command {
            Some(Commands::System { command: system_cmd }) => {
                return Self::handle_system_command(&cli_config, system_cmd);
            }
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = Arc::new(AppStorage::init(Some(&config.storage.project_root))?);
        let local = Arc::new(LocalStorageBackend::new(storage.clone()));

        let backend = match &config.s3 {
            Some(s3) => {
                tracing::debug!("remote (S3-compatible) storage engine enabled");
                Arc::new(StorageBackend::Remote(Arc::new(RemoteStorageBackend::new(s3.clone())?)))
            }
            None => Arc::new(StorageBackend::Local(local)),
        };

        let rules = keywords::load(&config.storage.frequency_words_path);
        let cache = Arc::new(TtlCache::new());
        let weight_config = WeightConfig::default();
        let tz = time::resolve_timezone(None);

        let facade = Arc::new(Facade::new(
            backend.clone(),
            storage.clone(),
            cache,
            rules,
            weight_config,
            tz,
            config.storage.retention_days,
            config.storage.frequency_words_path.clone(),
        ));

        let fetcher: Arc<dyn NewsFetcher> = Arc::new(NullFetcher);
        let dispatcher = Dispatcher::new(facade.clone(), fetcher);
        let shutdown = ShutdownService::new(backend);

        Ok(Self { shutdown, config, storage, facade, dispatcher })
    }

    fn handle_system_command(cli: &CliConfig, cmd: SystemCommands) -> Result<()> {
        match cmd {
            SystemCommands::Prune { yes } => Self::prune_data(cli, yes),
        }
    }

    fn prune_data(cli: &CliConfig, skip_confirm: bool) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let data_dir = AppStorage::resolve_data_dir(Some(&config.storage.project_root));

        if !data_dir.exists() {
            println!("Nothing to prune. Data directory does not exist: {}", data_dir.display());
            return Ok(());
        }

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        println!("This will permanently delete the local data directory:");
        println!("  {}", data_dir.display());
        println!();
        println!(
            "Make sure the server is not running. \
             Deleting data while the server is running will cause data corruption."
        );

        if !skip_confirm {
            print!("\nContinue? [y/N] ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        std::fs::remove_dir_all(&data_dir)
            .map_err(|e| anyhow::anyhow!("failed to delete data directory {}: {e}", data_dir.display()))?;
        println!("Pruned: {}", data_dir.display());
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        app.shutdown.install_signal_handlers();
        app.start_background_tasks().await?;

        tracing::info!(
            transport = ?app.config.transport,
            data_dir = %app.storage.data_dir().display(),
            "trendradar tool server ready"
        );

        match app.config.transport {
            Transport::Stdio => {
                api::stdio::serve(app.dispatcher.clone()).await?;
            }
            Transport::Http => {
                let listener = tokio::net::TcpListener::bind((
                    app.config.server.host.as_str(),
                    app.config.server.port,
                ))
                .await?;
                tracing::info!(
                    host = %app.config.server.host,
                    port = app.config.server.port,
                    "listening for HTTP tool calls"
                );
                let router = api::http::router(app.dispatcher.clone());
                axum::serve(listener, router)
                    .with_graceful_shutdown(app.shutdown.wait())
                    .await?;
            }
        }

        app.shutdown.shutdown().await;
        Ok(())
    }

    /// Spawn the retention sweep (§4.4) and the TTL cache's expiry sweep
    /// (§4.9). Both run until the shutdown signal fires.
    pub async fn start_background_tasks(&self) -> Result<()> {
        let backend = self.facade.backend().clone();
        let retention_days = self.config.storage.retention_days;
        let mut shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(RETENTION_SWEEP_INTERVAL_SECS));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match backend.cleanup_old_data(retention_days).await {
                            Ok(removed) if !removed.is_empty() => {
                                tracing::info!(count = removed.len(), "retention sweep pruned old day-stores")
                            }
                            Ok(_) => {}
                            Err(e) => tracing::warn!(error = %e, "retention sweep failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
        self.shutdown.register(handle).await;

        let cache = self.facade.cache().clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CACHE_SWEEP_INTERVAL_SECS));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = cache.cleanup_expired(Duration::from_secs(CACHE_TTL_HISTORICAL_SECS));
                        if removed > 0 {
                            tracing::debug!(count = removed, "evicted expired cache entries");
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
        self.shutdown.register(handle).await;

        tracing::debug!("background tasks started");
        Ok(())
    }
}

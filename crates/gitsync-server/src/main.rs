//! gitsync binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gitsync_core::{SchedulerConfig, SyncEngine, SyncScheduler, Trigger};
use gitsync_git::GitRepository;
use gitsync_server::metrics::init_metrics;
use gitsync_server::{AppState, Settings, create_router, serve, shutdown_signal};
use gitsync_store::{EtcdClient, StoreClient};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Mirror a Git branch into etcd, one key per file.
#[derive(Parser, Debug)]
#[command(name = "gitsync")]
#[command(version)]
#[command(about = "Mirror a Git branch into etcd", long_about = None)]
struct Cli {
    /// Extra directory to search for gitsync.{toml,yaml,json}
    #[arg(short, long, value_name = "DIR")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load(cli.config.as_deref()).context("Invalid configuration")?;
    let addr = settings.listen_addr()?;
    let repo_config = settings.repo_config()?;
    let prometheus = init_metrics().context("Failed to initialize metrics")?;

    info!("Starting gitsync v{}", env!("CARGO_PKG_VERSION"));
    info!(url = %repo_config.url(), branch = %repo_config.branch(), path = %repo_config.local_path().display(), "Repository");
    info!(endpoints = ?settings.etcd_endpoints(), "Store");

    let store: Arc<dyn StoreClient> = Arc::new(
        EtcdClient::connect(settings.etcd_config())
            .await
            .context("Couldn't connect to etcd")?,
    );
    info!("Connected to etcd");

    let repository = GitRepository::open_or_clone(repo_config)
        .await
        .context("Couldn't open or clone repository")?;
    info!("Repository ready");

    let engine = Arc::new(SyncEngine::new(Arc::new(repository), Arc::clone(&store)));

    if let Err(e) = engine.try_full_sync(Trigger::Startup).await {
        warn!(error = %e, "Initial sync failed, serving anyway");
    }

    let scheduler = SyncScheduler::new(
        Arc::clone(&engine),
        SchedulerConfig {
            interval: settings.sync_interval(),
        },
    )
    .start();

    let state = AppState::new(Arc::clone(&engine), store, &settings.repo.branch);
    let app = create_router(state, &settings.hook_path(), prometheus);
    info!(hook = %settings.hook_path(), "Webhook route");

    serve(addr, app, shutdown_signal()).await?;

    if let Some(handle) = scheduler {
        handle.join().await;
    }
    engine.shutdown().await;
    info!("Bye");

    Ok(())
}

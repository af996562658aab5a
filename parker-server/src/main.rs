//! parker-server - personal comic library server
//!
//! Startup sequence:
//! 1. Bootstrap config (TOML) and root folder
//! 2. Logging
//! 3. Database (schema + migrations)
//! 4. Settings reconciliation, then the stored log level is applied
//! 5. HTTP server

use anyhow::{Context, Result};
use clap::Parser;
use parker_common::collections;
use parker_common::config::{resolve_root_folder, RootFolder, TomlConfig};
use parker_common::db::init::init_database;
use parker_common::enrichment::EventDescriptions;
use parker_common::logging::init_logging;
use parker_common::settings::{keys, Catalog, SettingsCache, SettingsRegistry};
use parker_server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "parker-server")]
#[command(about = "Personal comic library server")]
#[command(version)]
struct Args {
    /// Bootstrap config file (TOML)
    #[arg(short, long, env = "PARKER_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for the database, logs and data files
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "PARKER_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides the config file)
    #[arg(short, long, env = "PARKER_BIND_ADDRESS")]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load config")?;

    let root = RootFolder::new(resolve_root_folder(args.root_folder.as_deref(), &config));
    let root_created = root
        .ensure_directory_exists()
        .with_context(|| format!("Failed to create root folder {}", root.path().display()))?;

    let log_control = init_logging(&config.logging, &root.log_directory(&config))
        .context("Failed to initialize logging")?;

    info!(
        "Starting Parker v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();
    if root_created {
        info!("Created root folder: {}", root.path().display());
    }
    info!("Root folder: {}", root.path().display());

    let db_path = root.database_path(&config);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    // A broken catalog is a build defect; refuse to start
    let catalog = Arc::new(Catalog::builtin().context("Settings catalog is invalid")?);
    let cache = Arc::new(SettingsCache::new(pool.clone()));
    let settings = SettingsRegistry::new(pool.clone(), catalog, cache);
    settings
        .initialize_defaults()
        .await
        .context("Failed to reconcile settings")?;

    match settings.get(keys::LOG_LEVEL).await {
        Ok(Some(level)) => {
            if let Err(e) = log_control.update_level(&level.to_string()) {
                warn!("Ignoring stored log level: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Could not read stored log level: {}", e),
    }

    let removed = collections::cleanup_empty_collections(&pool)
        .await
        .context("Failed to clean up collections")?;
    if removed > 0 {
        info!("Removed {} empty collections", removed);
    }

    let events = EventDescriptions::load_or_empty(&root.event_descriptions_path(&config));

    let state = AppState::new(pool, settings, log_control, events);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let bind_address = args.bind_address.unwrap_or(config.bind_address);
    let addr = format!("{}:{}", bind_address, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("parker-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("parker-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

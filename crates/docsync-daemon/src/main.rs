//! DocSync Daemon - Background document synchronization service
//!
//! This binary runs as a user service and handles:
//! - An initial full scan of the sync folder
//! - Live monitoring of the folder for new or changed documents
//! - Graceful shutdown on SIGTERM/SIGINT with a final state flush
//!
//! # Architecture
//!
//! Startup loads and validates the configuration, restores the sync
//! state, and wires a `SyncCoordinator` to the HTTP remote client. After
//! the initial scan, a `FileWatcher` feeds a `CandidateScheduler` until a
//! `CancellationToken` is triggered by SIGTERM or SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use docsync_core::config::Config;
use docsync_remote::provider::HttpRemoteSync;
use docsync_sync::coordinator::SyncCoordinator;
use docsync_sync::scheduler::{CandidateScheduler, DEFAULT_POLL_INTERVAL};
use docsync_sync::state::SyncStateStore;
use docsync_sync::watcher::FileWatcher;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

/// DocSync daemon - mirrors a local document folder to the remote service
#[derive(Debug, Parser)]
#[command(name = "docsyncd", version, about)]
struct Cli {
    /// Path to the configuration file (default: ~/.config/docsync/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one full scan, then exit instead of monitoring
    #[arg(long)]
    once: bool,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

/// Loads the configuration and applies environment and CLI overrides
///
/// A missing file at the default location yields the defaults; a missing
/// file that was named explicitly is an error.
fn load_config(cli: &Cli) -> Result<(Config, PathBuf)> {
    let path = cli.config.clone().unwrap_or_else(Config::default_path);

    let mut config = if path.exists() {
        Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
    } else if cli.config.is_some() {
        bail!("Configuration file not found: {}", path.display());
    } else {
        Config::default()
    };

    config.apply_env_overrides();
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.expand_paths();

    Ok((config, path))
}

/// Fails with a summary if the configuration has validation errors
fn ensure_valid(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }

    for e in &errors {
        error!(field = %e.field, "Invalid configuration: {}", e.message);
    }
    bail!("Configuration has {} error(s)", errors.len())
}

// ============================================================================
// Logging
// ============================================================================

/// `RUST_LOG` wins; otherwise the configured level applies
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_tracing(level: &str, json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the coordinator and the shutdown token for one daemon run
struct DaemonService {
    /// Validated configuration
    config: Config,
    coordinator: Arc<SyncCoordinator>,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Restores the sync state and wires the coordinator to the remote client
    async fn new(config: Config, shutdown: CancellationToken) -> Self {
        let state = Arc::new(
            SyncStateStore::load(
                config.sync.state_file.clone(),
                config.sync.batch_threshold,
            )
            .await,
        );
        info!(
            path = %state.path().display(),
            checksums = state.len(),
            "Loaded sync state"
        );

        let remote = Arc::new(HttpRemoteSync::from_config(&config.remote));
        info!(url = %remote.client().base_url(), "Remote client ready");

        let coordinator = Arc::new(SyncCoordinator::from_config(
            &config,
            state,
            remote,
            shutdown.clone(),
        ));

        Self {
            config,
            coordinator,
            shutdown,
        }
    }

    /// Runs the initial scan, then monitors until shutdown
    ///
    /// The sync state is flushed unconditionally before returning, even if
    /// monitoring could not start.
    async fn run(&self, once: bool) -> Result<()> {
        let folder = &self.config.sync.folder_path;

        match self.coordinator.run_scan(folder).await {
            Ok(summary) => info!(
                found = summary.files_found,
                synced = summary.counters.synced,
                already_synced = summary.counters.already_synced,
                failed = summary.counters.failed,
                "Initial scan finished"
            ),
            Err(e) => error!(path = %folder.display(), error = %e, "Initial scan failed"),
        }

        let result = if once || self.shutdown.is_cancelled() {
            Ok(())
        } else {
            self.monitor().await
        };

        if !self.coordinator.shutdown().await {
            warn!("Sync state could not be saved; documents may be re-checked next run");
        }
        result
    }

    /// Watches the sync folder and forwards settled documents until cancelled
    async fn monitor(&self) -> Result<()> {
        let folder = &self.config.sync.folder_path;

        let (mut watcher, change_rx) = FileWatcher::new()?;
        watcher.watch(folder)?;

        let mut scheduler = CandidateScheduler::new(
            change_rx,
            Arc::clone(&self.coordinator),
            self.config.sync.settle_delay(),
            DEFAULT_POLL_INTERVAL,
            self.shutdown.clone(),
        );

        info!(path = %folder.display(), "Monitoring for new documents");
        let counters = scheduler.run().await;
        drop(watcher);

        info!(
            submitted = counters.submitted,
            synced = counters.synced,
            already_synced = counters.already_synced,
            failed = counters.failed,
            "Monitoring stopped"
        );
        Ok(())
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// If a handler cannot be installed, that signal is simply never observed.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(&cli);
    match &loaded {
        Ok((config, _)) => init_tracing(&config.logging.level, config.logging.json),
        Err(_) => init_tracing(cli.log_level.as_deref().unwrap_or("info"), false),
    }
    let (config, config_path) = loaded?;

    info!(config_path = %config_path.display(), "DocSync daemon starting (docsyncd)");
    ensure_valid(&config)?;

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token).await;
    let result = service.run(cli.once).await;

    match &result {
        Ok(()) => info!("DocSync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "DocSync daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

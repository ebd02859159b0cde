// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command-line interface
//!
//! - `serve`: run the HTTP service
//! - `reindex`: ask a running service for a blue/green rebuild
//! - `version`

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use searchsync::index::{RebuildOutcome, RebuildReport};
use searchsync::{EntityRow, PrimaryStore, RebuildTrigger, ServiceConfig, SyncCoordinator};

use crate::app::{build_router, AppState};
use crate::client::{admin_url, AdminClient};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(
    name = "searchsync",
    version,
    about = "Search index sync and read-through cache service"
)]
pub struct Cli {
    /// JSON configuration file (overrides SEARCHSYNC_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<log::Level>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address (overrides server.bind_addr)
        #[arg(long)]
        bind: Option<String>,

        /// JSON array of entity rows loaded into the primary store at startup
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Trigger a rebuild on a running service
    Reindex {
        /// Service base URL (defaults to server.bind_addr)
        #[arg(long)]
        url: Option<String>,

        /// Admin token (defaults to server.admin_token / SEARCHSYNC_ADMIN_TOKEN)
        #[arg(long)]
        token: Option<String>,

        /// Wait for the rebuild to finish and print its report
        #[arg(long)]
        wait: bool,

        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 600)]
        timeout: u64,
    },

    /// Show version information
    Version,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

async fn start(
    config_path: Option<&Path>,
    seed: Option<&Path>,
) -> Result<Arc<SyncCoordinator>, Box<dyn std::error::Error>> {
    let config = ServiceConfig::load(config_path)?;
    let coordinator = SyncCoordinator::from_config(config).await?;

    if let Some(seed) = seed {
        let rows: Vec<EntityRow> = serde_json::from_str(&std::fs::read_to_string(seed)?)?;
        let count = rows.len();
        for row in rows {
            coordinator.store().upsert(row).await?;
        }
        log::info!("Loaded {} seed rows from {}", count, seed.display());
    }
    Ok(coordinator)
}

pub async fn handle_serve(
    config_path: Option<PathBuf>,
    bind: Option<String>,
    seed: Option<PathBuf>,
) -> CliResult {
    let coordinator = start(config_path.as_deref(), seed.as_deref()).await?;
    let addr = bind.unwrap_or_else(|| coordinator.config().server.bind_addr.clone());

    if coordinator.config().server.admin_token.is_none() {
        println!(
            "{}",
            "No admin token configured; admin endpoints are disabled".yellow()
        );
    }

    let app = build_router(AppState::new(Arc::clone(&coordinator)));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("{} listening on {}", "searchsync".bold().green(), addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    coordinator.shutdown().await;
    Ok(())
}

pub async fn handle_reindex(
    config_path: Option<PathBuf>,
    url: Option<String>,
    token: Option<String>,
    wait: bool,
    timeout_secs: u64,
) -> CliResult {
    let config = ServiceConfig::load(config_path.as_deref())?;
    let base_url = url.unwrap_or_else(|| admin_url(&config.server.bind_addr));
    let token = token
        .or(config.server.admin_token)
        .ok_or("No admin token: pass --token or set SEARCHSYNC_ADMIN_TOKEN")?;
    let client = AdminClient::new(base_url, token, REQUEST_TIMEOUT)?;

    match client.trigger_reindex().await? {
        RebuildTrigger::Started => {
            println!("{} on {}", "Rebuild started".bold().green(), client.base_url())
        }
        RebuildTrigger::AlreadyRunning => println!(
            "{}",
            "A rebuild is already running; request coalesced".yellow()
        ),
    }
    if !wait {
        return Ok(());
    }

    let status = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        client.wait_for_rebuild(POLL_INTERVAL),
    )
    .await
    .map_err(|_| format!("Rebuild still running after {}s", timeout_secs))??;

    match status.last_report {
        Some(report) => print_report(&report),
        None => Err("Service finished without a rebuild report".into()),
    }
}

fn print_report(report: &RebuildReport) -> CliResult {
    match &report.outcome {
        RebuildOutcome::Succeeded => println!("{}", "Rebuild succeeded".bold().green()),
        RebuildOutcome::Cancelled => println!("{}", "Rebuild cancelled".yellow()),
        RebuildOutcome::Failed { step, reason } => {
            println!("{} at {}: {}", "Rebuild failed".bold().red(), step, reason);
        }
    }
    println!(
        "Generation: {} (was {})",
        report.generation.as_deref().unwrap_or("-"),
        report.previous.as_deref().unwrap_or("-")
    );
    println!(
        "Documents indexed: {}  skipped: {}  replayed: {}",
        report.documents_indexed, report.rows_skipped, report.replayed
    );
    println!("Duration: {} ms", report.duration_ms);

    match &report.outcome {
        RebuildOutcome::Failed { step, .. } => Err(format!("rebuild failed at {}", step).into()),
        _ => Ok(()),
    }
}

pub fn handle_version() -> CliResult {
    println!("{} {}", "searchsync".bold().green(), searchsync::VERSION);
    println!("Search index sync and read-through cache");
    Ok(())
}

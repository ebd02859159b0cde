// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! searchsync entry point

use clap::Parser;

use searchsync_server::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else if let Some(level) = cli.log_level {
        level.to_level_filter()
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    match cli.command {
        Commands::Serve { bind, seed } => cli::handle_serve(cli.config, bind, seed).await,
        Commands::Reindex {
            url,
            token,
            wait,
            timeout,
        } => cli::handle_reindex(cli.config, url, token, wait, timeout).await,
        Commands::Version => cli::handle_version(),
    }
}

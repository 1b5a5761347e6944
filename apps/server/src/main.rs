mod config;
mod main_lib;
mod scheduler;

use std::future::Future;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use config::Config;
use main_lib::{build_state, init_tracing, AppState};

#[derive(Parser)]
#[command(name = "marketsync-server")]
#[command(about = "Keeps instrument, news and logo data in sync", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interval schedulers until interrupted (default)
    Daemon,

    /// Sync the instrument catalog once
    SyncCatalog,

    /// Sync today's news for every tracked instrument once
    SyncNews,

    /// Acquire logos for instruments that have none
    BackfillLogos {
        /// Maximum number of instruments to process
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Acquire the logo for one symbol and print the acquisition trace
    AcquireLogo { symbol: String },

    /// Search instruments, falling back to the upstream catalog
    Search { query: String },

    /// Add a symbol to an owner's watchlist
    Watch { owner: String, symbol: String },

    /// Remove a symbol from an owner's watchlist
    Unwatch { owner: String, symbol: String },

    /// List stored news for a symbol, newest first
    News {
        symbol: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing();
    let state = build_state(&config).await?;

    let outcome = match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => run_daemon(&state, &config).await,
        command => until_shutdown(run(command, &state, &config), shutdown_signal()).await,
    };

    // The browser outlives every command; always close it
    state.session.shutdown().await;
    outcome
}

async fn run_daemon(state: &Arc<AppState>, config: &Config) -> anyhow::Result<()> {
    let handles =
        scheduler::start_schedulers(state.clone(), config.news_interval, config.catalog_interval);
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping schedulers");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

/// Drives a one-shot command, giving up on it when `shutdown` resolves first.
async fn until_shutdown<C, S>(command: C, shutdown: S) -> anyhow::Result<()>
where
    C: Future<Output = anyhow::Result<()>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        outcome = command => outcome,
        _ = shutdown => {
            tracing::info!("Shutdown signal received, abandoning command");
            anyhow::bail!("Interrupted by shutdown signal")
        }
    }
}

async fn run(command: Commands, state: &Arc<AppState>, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::Daemon => run_daemon(state, config).await?,
        Commands::SyncCatalog => {
            print_json(&state.upstream()?.catalog_sync.sync_catalog().await?)?;
        }
        Commands::SyncNews => {
            print_json(&state.upstream()?.news_sync.sync_news().await?)?;
        }
        Commands::BackfillLogos { limit } => {
            let limit = limit.unwrap_or(state.logo_backfill_limit);
            print_json(&state.logo_backfill.backfill_missing(limit).await?)?;
        }
        Commands::AcquireLogo { symbol } => {
            print_json(&state.logo_acquisition.acquire_traced(&symbol).await?)?;
        }
        Commands::Search { query } => {
            print_json(&state.upstream()?.search.search(&query).await?)?;
        }
        Commands::Watch { owner, symbol } => {
            print_json(&state.watchlist_service.watch(&owner, &symbol).await?)?;
        }
        Commands::Unwatch { owner, symbol } => {
            let removed = state.watchlist_service.unwatch(&owner, &symbol).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::News { symbol, limit } => {
            print_json(&state.news_repository.list_for_instrument(&symbol, limit)?)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_signal_interrupts_long_running_command() {
        let command = async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        };

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            until_shutdown(command, std::future::ready(())),
        )
        .await
        .expect("command should be abandoned on signal");

        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_finished_command_outcome_is_returned() {
        let ok = until_shutdown(async { Ok(()) }, std::future::pending()).await;
        assert!(ok.is_ok());

        let err = until_shutdown(
            async { Err(anyhow::anyhow!("upstream unavailable")) },
            std::future::pending(),
        )
        .await;
        assert_eq!(err.unwrap_err().to_string(), "upstream unavailable");
    }
}

//! Session-Catalog main entry point
//!
//! Loads the session catalog (live or from a snapshot) and answers one query
//! against it. Query results go to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use session_catalog::catalog::{Catalog, QueryMode};
use session_catalog::config::{load_config_with_hash, Config};
use session_catalog::crawler::load_live;
use session_catalog::output::{print_statistics, render_sessions};
use session_catalog::storage::{load_offline, save_snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Session-Catalog: conference sessions, fetched and queryable
#[derive(Parser, Debug)]
#[command(name = "session-catalog")]
#[command(version)]
#[command(about = "Loads conference sessions and answers queries about them", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Load sessions from the snapshot file instead of fetching them
    #[arg(long)]
    offline: bool,

    /// Snapshot file to load in offline mode (overrides the config)
    #[arg(long, value_name = "PATH")]
    data_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every loaded session
    List,

    /// Show one session by its identifier
    Get {
        /// Session identifier
        id: String,
    },

    /// Fetch all sessions and print load statistics
    Fetch {
        /// Write the loaded catalog to this snapshot file
        #[arg(long, value_name = "PATH")]
        save: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    check_mode(&cli.command, cli.offline, config.query.mode)?;

    let catalog = Arc::new(Catalog::new(config.query.mode));
    let shutdown = CancellationToken::new();

    let loader = if cli.offline {
        let path = cli
            .data_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.snapshot.path));
        load_offline(&catalog, &path)?;
        None
    } else {
        Some(spawn_live_load(
            config.clone(),
            Arc::clone(&catalog),
            shutdown.clone(),
        ))
    };

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling load");
                shutdown.cancel();
            }
        }
    });

    match cli.command {
        Command::List => {
            let mut sessions = catalog.list_all().await?;
            println!("{}", render_sessions(&mut sessions)?);
        }
        Command::Get { id } => {
            let session = catalog.get_by_id(&id).await?;
            println!("{}", render_sessions(&mut [session])?);
        }
        Command::Fetch { save } => {
            let Some(loader) = loader else {
                anyhow::bail!("fetch cannot run in offline mode");
            };
            let stats = loader.await??;
            print_statistics(&stats);
            if let Some(path) = save {
                handle_save(&catalog, &path).await?;
            }
            return Ok(());
        }
    }

    // Queries may finish before a live load does; stop it cleanly.
    if let Some(loader) = loader {
        shutdown.cancel();
        if let Err(e) = loader.await {
            tracing::debug!("Loader task ended abnormally: {}", e);
        }
    }

    Ok(())
}

/// Rejects combinations that could never produce a useful answer
///
/// A one-shot query in `incomplete` mode runs right after the live load
/// starts and would always see a catalog that is still loading. That mode
/// is meant for long-lived embedders of the library.
fn check_mode(command: &Command, offline: bool, mode: QueryMode) -> anyhow::Result<()> {
    match command {
        Command::Fetch { .. } if offline => {
            anyhow::bail!("fetch cannot run in offline mode")
        }
        Command::List | Command::Get { .. } if !offline && mode == QueryMode::Incomplete => {
            anyhow::bail!(
                "query mode \"incomplete\" needs --offline for one-shot queries; use mode = \"block\" for a live load"
            )
        }
        _ => Ok(()),
    }
}

fn spawn_live_load(
    config: Config,
    catalog: Arc<Catalog>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<session_catalog::Result<session_catalog::output::LoadStatistics>> {
    tokio::spawn(async move {
        tracing::info!("Loading agenda sessions...");
        let result = load_live(&config, Arc::clone(&catalog), shutdown).await;
        if let Err(e) = &result {
            tracing::error!("Load failed: {}", e);
            // Queries blocked on readiness must not hang on a setup error.
            catalog.mark_ready();
        }
        result
    })
}

async fn handle_save(catalog: &Catalog, path: &Path) -> anyhow::Result<()> {
    let sessions = catalog.list_all().await?;
    save_snapshot(path, &sessions)?;
    println!("✓ Snapshot written to: {}", path.display());
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("session_catalog=info,warn"),
            1 => EnvFilter::new("session_catalog=debug,info"),
            2 => EnvFilter::new("session_catalog=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

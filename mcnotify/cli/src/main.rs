//! mcnotify CLI - Announce new Minecraft versions in a Telegram chat

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mcnotify_lib::{
    ArticleChangelog, ConfigError, FetchError, HttpFetcher, JsonFileStore, LauncherManifest,
    Schedule, TelegramNotifier, VersionKind, VersionSource, WatchConfig, WatchError, Watcher,
    build_message, changelog_url,
};
use thiserror::Error;
use tokio::sync::watch;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mcnotify")]
#[command(about = "Watch for new Minecraft versions and post their changelogs to Telegram", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll for new versions and deliver their changelogs
    Run {
        /// Where the last notified version is stored
        #[arg(long, value_name = "PATH")]
        version_file: Option<PathBuf>,

        /// Perform a single poll and exit
        #[arg(long)]
        once: bool,
    },

    /// Print the message for the latest (or a given) version without sending it
    Preview {
        /// Version id, e.g. 1.16.4 or 20w46a
        #[arg(long, value_name = "ID", requires = "kind")]
        id: Option<String>,

        /// Release channel of --id (release or snapshot)
        #[arg(long, value_name = "KIND", requires = "id")]
        kind: Option<VersionKind>,
    },

    /// Print the changelog URL for a version
    Url {
        /// Release channel (release or snapshot)
        #[arg(value_name = "KIND")]
        kind: VersionKind,

        /// Version id, e.g. 1.16.4 or 20w46a
        #[arg(value_name = "ID")]
        id: String,
    },
}

/// Failures that stop the CLI before or instead of watching.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("no changelog published yet at {0}")]
    NoChangelog(String),
}

/// Initialize tracing subscriber with appropriate verbosity and format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn,mcnotify=info,mcnotify_lib=info".to_string(),
            1 => "warn,mcnotify=debug,mcnotify_lib=debug".to_string(),
            2 => "info,mcnotify=trace,mcnotify_lib=trace".to_string(),
            _ => "trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(verbose >= 2)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    let result = match cli.command {
        Commands::Run { version_file, once } => run(version_file, once).await,
        Commands::Preview { id, kind } => preview(id, kind).await,
        Commands::Url { kind, id } => url(kind, &id),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(version_file: Option<PathBuf>, once: bool) -> Result<(), CliError> {
    let mut config = WatchConfig::from_env()?;
    if let Some(path) = version_file {
        config.version_file = path;
    }
    let telegram = config.require_telegram()?.clone();

    let fetcher = HttpFetcher::from_config(&config)?;
    let mut watcher = Watcher::new(
        LauncherManifest::new(
            fetcher.clone(),
            config.manifest_url.clone(),
            config.changelog_base.clone(),
        ),
        ArticleChangelog::new(fetcher.clone()),
        TelegramNotifier::new(fetcher.client().clone(), telegram),
        JsonFileStore::new(config.version_file.clone()),
        Schedule::from(&config),
    );

    if once {
        let outcome = watcher.poll_once().await;
        tracing::info!(?outcome, "Single poll finished");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(
        manifest = %config.manifest_url,
        version_file = %config.version_file.display(),
        "Watching for new versions"
    );
    watcher.with_shutdown(shutdown_rx).run().await;
    Ok(())
}

async fn preview(id: Option<String>, kind: Option<VersionKind>) -> Result<(), CliError> {
    let config = WatchConfig::from_env()?;
    let fetcher = HttpFetcher::from_config(&config)?;

    let page = match (id, kind) {
        (Some(id), Some(kind)) => changelog_url(&config.changelog_base, kind, &id),
        _ => {
            let manifest = LauncherManifest::new(
                fetcher.clone(),
                config.manifest_url.clone(),
                config.changelog_base.clone(),
            );
            manifest.latest_version().await?.changelog_url
        }
    };

    let changelog = ArticleChangelog::new(fetcher).fetch_from(&page).await;
    if changelog.is_empty() {
        return Err(CliError::NoChangelog(page));
    }

    println!("{}", build_message(&page, &changelog, config.max_message_len));
    Ok(())
}

fn url(kind: VersionKind, id: &str) -> Result<(), CliError> {
    let config = WatchConfig::from_env()?;
    println!("{}", changelog_url(&config.changelog_base, kind, id));
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

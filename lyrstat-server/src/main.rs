//! lyrstat-server - lyrics word-frequency analysis service
//!
//! Resolves configuration, opens the lookup cache, wires the upstream sources into the task
//! runner and serves the HTTP API until Ctrl+C / SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use lyrstat_common::config::{self, Config, ConfigOverrides};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lyrstat_server::analysis::{AnalyzerConfig, StopWords};
use lyrstat_server::cache::LookupCache;
use lyrstat_server::lyrics::{GeniusSource, LrclibSource, LyricsResolver, LyricsSource};
use lyrstat_server::sources::{CatalogSource, LastFmClient, MusicBrainzClient, ScrobbleSource};
use lyrstat_server::tasks::{AnalysisRunner, TaskRegistry};
use lyrstat_server::{build_router, cors_layer, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "lyrstat-server")]
#[command(about = "Lyrics word-frequency analysis for Last.fm listening history")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "LYRSTAT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Last.fm API key
    #[arg(long)]
    lastfm_api_key: Option<String>,

    /// Genius API token (enables the Genius lyrics source)
    #[arg(long)]
    genius_token: Option<String>,

    /// Lookup cache database file
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config = config::load_toml_config(config_path.as_deref())
        .context("Failed to load config file")?;

    let overrides = ConfigOverrides {
        port: args.port,
        lastfm_api_key: args.lastfm_api_key,
        genius_token: args.genius_token,
        db_path: args.db_path,
    };
    let config = Config::resolve(&overrides, &toml_config)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.log_level;
        EnvFilter::new(format!(
            "lyrstat_server={level},lyrstat_common={level},tower_http={level}"
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting lyrstat-server v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let cache = Arc::new(
        LookupCache::open(&config.db_path)
            .await
            .context("Failed to open lyrics cache")?,
    );
    let stats = cache.stats().await;
    info!(total = stats.total, found = stats.found, "Lyrics cache ready");

    let stopwords = StopWords::load_files(&config.stopword_files);
    info!("Loaded {} stop words", stopwords.len());
    let analyzer = Arc::new(AnalyzerConfig::new(stopwords).context("Invalid text pattern")?);

    let mut lyrics_sources: Vec<Arc<dyn LyricsSource>> = Vec::new();
    lyrics_sources.push(Arc::new(LrclibSource::new()?));
    match &config.genius_token {
        Some(token) => lyrics_sources.push(Arc::new(GeniusSource::new(token.clone())?)),
        None => warn!("GENIUS_TOKEN not set, Genius lyrics source disabled"),
    }

    let resolver = Arc::new(LyricsResolver::new(
        cache.clone(),
        lyrics_sources,
        analyzer.clone(),
    ));
    info!("Lyrics sources: {}", resolver.source_tags().join(", "));

    let scrobbles: Arc<dyn ScrobbleSource> = Arc::new(LastFmClient::new(config.lastfm_api_key.clone())?);
    let catalog: Arc<dyn CatalogSource> = Arc::new(MusicBrainzClient::new(analyzer.clone())?);

    let registry = Arc::new(TaskRegistry::new(
        Duration::from_secs(config.task_ttl_secs),
        config.max_tasks,
    ));
    let runner = Arc::new(AnalysisRunner::new(
        registry,
        resolver,
        scrobbles,
        Some(catalog),
        analyzer,
        config.lyrics_workers,
    ));

    let state = AppState::new(cache.clone(), runner, config.default_max_tracks);
    let app = build_router(state).layer(cors_layer(&config.allow_origins));

    let addr = format!("{}:{}", config.bind_host, config.port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // In-flight analysis tasks are not awaited
    cache.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

use anyhow::Result;
use axum::Router;
use bucket_fs_gateway::{
    config::{AppConfig, BackendKind},
    handlers::fs_handlers::AppState,
    routes::routes::routes,
    services::{
        backend::Backend, gateway::Gateway, memory_backend::MemoryBackend,
        storage_service::StorageService,
    },
};
use sqlx::sqlite::SqlitePoolOptions;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt::writer::BoxMakeWriter};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    init_logging(&cfg);
    tracing::info!("Starting bucket-fs-gateway with config: {:?}", cfg);
    if cfg.owner_is_unset() {
        tracing::warn!("no owner configured; buckets are listed and created for the nil identity");
    }

    let log = tracing::info_span!("gateway", owner = %cfg.owner);

    // --- Initialize backend ---
    let backend: Arc<dyn Backend> = match cfg.backend {
        BackendKind::Memory => {
            if migrate {
                tracing::info!("Memory backend has no schema; nothing to migrate.");
                return Ok(());
            }
            Arc::new(MemoryBackend::with_chunk_size(cfg.chunk_size))
        }
        BackendKind::Sqlite => {
            let storage = open_storage(&cfg, log.clone()).await?;
            storage.migrate().await?;
            if migrate {
                tracing::info!("Database migration complete.");
                return Ok(()); // exit after migration
            }
            Arc::new(storage)
        }
    };

    let gateway = Gateway::new(backend, cfg.gateway_settings(), log);
    let shutdown = CancellationToken::new();

    // --- Build router ---
    let state = AppState::new(gateway, shutdown.clone(), cfg.request_timeout);
    let app: Router = routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// `RUST_LOG` wins over `--debug-level`. Output is discarded unless
/// `--debug-stderr` is set.
fn init_logging(cfg: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.debug_level));
    let writer = if cfg.debug_stderr {
        BoxMakeWriter::new(std::io::stderr)
    } else {
        BoxMakeWriter::new(std::io::sink)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();
}

/// Open the SQLite pool and payload directory.
async fn open_storage(cfg: &AppConfig, log: Span) -> Result<StorageService> {
    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    if !db_url.contains(":memory:") {
        let db_path = db_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:")
            .trim_start_matches("file:");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        tracing::debug!("Interpreted SQLite path => {}", db_path);

        // Create parent directory if needed
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }

        // SQLx will not create the database file itself
        match fs::OpenOptions::new().create(true).append(true).open(db_path) {
            Ok(_) => tracing::debug!("File can be created/opened successfully."),
            Err(e) => tracing::warn!("Failed to open file manually: {}", e),
        }
    }

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    Ok(StorageService::new(Arc::new(db), cfg.storage_dir.clone(), log).with_max_chunk_size(cfg.chunk_size))
}

/// Resolve on Ctrl-C and cancel every in-flight request.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

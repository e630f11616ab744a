use std::sync::Arc;

use tracing::info;

use mediavault_api::{logging, router, AppState, ServerConfig};
use mediavault_core::NoteRepository;
use mediavault_db::{Database, MemoryNoteRepository, PoolConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let config = ServerConfig::from_env();

    let repo: Arc<dyn NoteRepository> = match config.database_url.as_deref() {
        Some(url) => {
            let db = Database::connect_with_config(url, &PoolConfig::from_env()).await?;
            db.migrate().await?;
            info!(subsystem = "api", store = "postgres", "Note store ready");
            Arc::new(db.notes)
        }
        None => {
            info!(
                subsystem = "api",
                store = "memory",
                "DATABASE_URL not set, notes will not survive a restart"
            );
            Arc::new(MemoryNoteRepository::new())
        }
    };

    let assistant = mediavault_inference::assistant_from_env()?;
    let state = AppState::with_view_idle_timeout(
        repo,
        assistant,
        config.unlock_delay,
        config.view_idle_timeout,
    );
    let app = router(state, &config.allowed_origins);

    let addr = config.socket_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

use anyhow::{Context, Result};
use notehub::api::{create_app, AppState};
use notehub::config::Config;
use notehub::session::{run_session_cleanup, MemorySessionStore};
use notehub::storage::Database;
use std::sync::Arc;
use tracing::info;

/// How often expired handshake sessions are purged (seconds)
const SESSION_CLEANUP_INTERVAL: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notehub=info".into()),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    let db = Database::new(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path))?;

    let sessions = MemorySessionStore::new();
    tokio::spawn(run_session_cleanup(
        sessions.clone(),
        SESSION_CLEANUP_INTERVAL,
    ));

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        db: Arc::new(db),
        sessions: Arc::new(sessions),
        config: Arc::new(config),
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    info!(addr = %bind_addr, "notehub listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

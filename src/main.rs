use catalog_api::{AppState, Config, create_router, services::ensure_admin};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza il sistema di logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,catalog_api=debug")),
        )
        .with(fmt::layer().with_target(true))
        .init();

    let config = Config::from_env()?;
    config.print_info();

    let state = match config.database_url.clone() {
        Some(url) => {
            info!("Connecting to database...");
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Database ready, migrations applied");
            AppState::new(pool, config)
        }
        None => {
            warn!("DATABASE_URL not set, records live in memory and vanish on exit");
            AppState::in_memory(config)
        }
    };

    ensure_admin(&state).await?;

    let addr = format!("{}:{}", state.config.server_host, state.config.server_port);
    let app = create_router(Arc::new(state));

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

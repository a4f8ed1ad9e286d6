use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use tipstream::config::{Cli, Config};
use tipstream::db;
use tipstream::state::AppState;
use tipstream::views::FallbackIcon;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let db_path = config.db_path();
    let pool = db::create_pool(&db_path, config.database.pool_size)?;
    db::run_migrations(&pool)?;
    tracing::info!("Database: {}", db_path.display());

    let fallback_icon = FallbackIcon::load(config.assets.fallback_icon.as_deref())?;
    if fallback_icon.image.is_none() {
        tracing::warn!("No fallback icon configured, users without an icon get 404");
    }

    let state = AppState::new(pool, config.clone(), fallback_icon);
    let app = tipstream::build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

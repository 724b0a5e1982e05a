use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::AppConfig;
use server::database::init_db;
use server::state::AppState;
use server::{build_router, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;

    if let Some(ref admin) = config.admin {
        if admin.update {
            seed::update_admin(&db, admin)
                .await
                .map_err(|e| anyhow::anyhow!("Admin update failed: {:?}", e))?;
        } else {
            seed::bootstrap_admin(&db, admin)
                .await
                .map_err(|e| anyhow::anyhow!("Admin bootstrap failed: {:?}", e))?;
        }
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState { db, config };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

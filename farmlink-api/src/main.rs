use std::net::SocketAddr;

use anyhow::Context;
use farmlink_api::{app, AppState};
use farmlink_store::{app_config::Config, DbClient, Repositories};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmlink_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting FarmLink API on port {}", config.server.port);

    // Postgres Connection
    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;

    let state = AppState::new(Repositories::postgres(db.pool.clone()), &config.auth);
    let app = app(state, &config.cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

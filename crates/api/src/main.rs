use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use membership_api::{app, config, middleware, services::EmailService};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = config::Config::load()?;

    middleware::logging::init_logging(&config.logging)?;

    info!("Starting membership API v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = middleware::init_metrics() {
        warn!(error = %e, "Prometheus recorder not installed; /metrics disabled");
    }

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let stores = persistence::pg_stores(pool);
    let notifier = Arc::new(EmailService::new(config.email.clone())?);
    if !notifier.is_enabled() {
        warn!("Email delivery disabled; registrations will report email_sent=false");
    }

    let addr = config.socket_addr()?;
    let app = app::create_app(config, stores, notifier)?;

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

use anyhow::Context;
use tracing::{info, warn};

use crate::app::build_app;
use crate::config::AppConfig;
use crate::database::{self, Database};
use crate::logging;
use crate::routes::service_routes;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    logging::init(&config.logging)?;
    info!(environment = ?config.environment, "starting rideplus-api");

    if config.security.jwt_secret.is_empty() {
        warn!("JWT secret not configured, authenticated routes will reject every token");
    }

    let database = match config.database.url {
        Some(_) => Database(Some(
            database::connect(&config.database)
                .await
                .context("Failed to connect to database")?,
        )),
        None => {
            warn!("no database configured, starting without a pool");
            Database(None)
        }
    };

    let app = match build_app(&config, service_routes(&config), database) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(
                method = e.method(),
                path = e.path(),
                error = %e,
                "route registration failed"
            );
            return Err(e.into());
        }
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(addr = %bind_addr, routes = app.routes.len(), "listening");

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

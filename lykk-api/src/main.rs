use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use lykk_api::{app, AppState, AuthConfig};
use lykk_shared::{Clock, SystemClock};
use lykk_store::{Config, DbClient, MemoryStore, PostgresStore, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lykk_api=debug,lykk_booking=debug,lykk_store=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Lykk API on port {}", config.server.port);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
    };

    // Redis only backs the rate limiter, so a bad URL disables it instead of failing startup.
    let redis = match &config.redis {
        Some(redis) => match RedisClient::new(&redis.url) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let state = match &config.database {
        Some(database) => {
            let db = DbClient::new(database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            let store = Arc::new(PostgresStore::new(db.pool));
            AppState::new(store, clock, auth, config.business_rules.clone(), redis)
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            let store = Arc::new(MemoryStore::new());
            AppState::new(store, clock, auth, config.business_rules.clone(), redis)
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hearth_api::app::build_app;
use hearth_api::config::ServerConfig;
use hearth_api::state::{AppState, EngineSettings};
use hearth_core::clock::SystemClock;
use hearth_db::Stores;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hearth_api=debug,hearth_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    let settings = EngineSettings::from_env().expect("Invalid engine configuration");
    tracing::info!(
        push_configured = settings.apns.is_some(),
        integrations_enabled = settings.cipher.is_some(),
        news_feeds = settings.news_feeds.len(),
        "Loaded configuration"
    );

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = hearth_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    hearth_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    hearth_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );

    let state = AppState::build(
        config,
        Stores::postgres(pool.clone()),
        Some(pool),
        settings,
        Arc::new(SystemClock),
    )
    .expect("Failed to build application state");
    let app = build_app(state).expect("Invalid CORS configuration");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Resolve on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use courier_api::contacts::SqlContactDirectory;
use courier_api::routes::{self, AppState, AppStateInner};
use courier_db::{DbConfig, DbPool, ensure_tables_created};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_config = DbConfig::from_env()?;
    let host = std::env::var("COURIER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("COURIER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let pool = DbPool::open(&db_config)?;
    ensure_tables_created(&pool)?;
    info!(
        "Database {} ready ({} connections max)",
        db_config.path.display(),
        pool.max_connections()
    );

    let state: AppState = Arc::new(AppStateInner {
        pool,
        directory: SqlContactDirectory,
    });

    let app = routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Courier server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

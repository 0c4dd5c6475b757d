//! Field history API server.

use std::net::SocketAddr;
use std::sync::Arc;
use trail_api::server::{self, AppState};
use trail_source::ODataAuditSource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source: Arc<dyn trail_types::AuditSource + Send + Sync> =
        Arc::new(ODataAuditSource::from_env()?);
    let idle_ttl = std::env::var("TRAIL_SESSION_TTL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(std::time::Duration::from_secs)
        .unwrap_or(server::DEFAULT_SESSION_TTL);
    let app = server::router(Arc::new(AppState::new(source).with_idle_ttl(idle_ttl)));
    let addr: SocketAddr = std::env::var("TRAIL_LISTEN")
        .unwrap_or_else(|_| "0.0.0.0:8002".to_string())
        .parse()?;
    tracing::info!("field history API listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seogen_ingest::config::{ConfigProvider, MemoryConfig};
use seogen_ingest::server::{AppState, build_router};
use seogen_ingest::store::MemoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seogen_ingest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let license_key = std::env::var("SEOGEN_LICENSE_KEY").ok();
    let callback_secret = std::env::var("SEOGEN_CALLBACK_SECRET").ok();
    let public_url = std::env::var("SEOGEN_PUBLIC_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    let bind: SocketAddr = std::env::var("SEOGEN_BIND")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()
        .expect("SEOGEN_BIND must be a socket address");

    if license_key.is_none() {
        tracing::warn!("SEOGEN_LICENSE_KEY not set; all callbacks will be rejected");
    }

    let config = Arc::new(MemoryConfig::new(license_key, callback_secret));
    // Generated on first boot when not provided; the producer learns it at
    // registration time.
    let secret = config.get_or_create_callback_secret();
    tracing::info!(secret_len = secret.len(), "callback secret ready");

    let state = AppState::new(Arc::new(MemoryStore::new()), config, public_url);
    let app = build_router(state);

    tracing::info!("listening on {}", bind);
    let listener = tokio::net::TcpListener::bind(bind).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

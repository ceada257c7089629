use anyhow::Context;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use db::DBService;
use rand::RngCore;
use server::{AppState, routes};
use services::services::expiry::RequestExpiryService;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("FACHMANI_DB_URL").unwrap_or_else(|_| "sqlite://fachmani.db".to_string());
    let bind_addr =
        std::env::var("FACHMANI_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let jwt_secret = match std::env::var("FACHMANI_JWT_SECRET") {
        Ok(secret) => secret,
        Err(_) => {
            warn!("FACHMANI_JWT_SECRET is not set; sessions will not survive a restart");
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            BASE64.encode(bytes)
        }
    };

    let db = DBService::new(&database_url)
        .await
        .with_context(|| format!("failed to open database at {database_url}"))?;
    let state = AppState::new(db.clone(), jwt_secret);

    RequestExpiryService::spawn(db, state.notifications.clone()).await;

    let app = routes::router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

use std::sync::Arc;

use axum::{Router, http::HeaderValue};
use instachat::{AppState, api, db, relay, store::SqliteStore};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("instachat=debug,info")),
        )
        .init();

    let database_url =
        dotenv::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:instachat.db?mode=rwc".to_owned());
    let pool = db::connect(&database_url).await?;
    let state = AppState::new(Arc::new(SqliteStore::new(pool)));

    let mut origins = vec![HeaderValue::from_static("http://localhost:5173")];
    if let Ok(origin) = dotenv::var("CLIENT_ORIGIN") {
        origins.push(origin.parse()?);
    }
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(relay::router())
        .nest("/api", api::router())
        .with_state(state)
        .layer(cors);

    let port: u16 = dotenv::var("PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(5000);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

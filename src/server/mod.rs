pub mod error;
pub mod routes;

use crate::core::tfdrift::TfDrift;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub tfdrift: Arc<TfDrift>,
}

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(tfdrift: Arc<TfDrift>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/drift", get(routes::get_drift))
        .route("/api/drift/apply", post(routes::apply_drift))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { tfdrift })
}

/// Serve the drift API until the process is stopped.
pub async fn serve(tfdrift: Arc<TfDrift>, host: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(tfdrift);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("tfdrift API listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

//! Web server setup and routing

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::handlers;
use super::state::AppState;

/// All API routes over the given state
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/leaderboard", get(handlers::api_leaderboard))
        .route("/api/leaderboard/chart", get(handlers::api_leaderboard_chart))
        .route("/api/submissions", get(handlers::api_list_submissions))
        .route("/api/submissions/:agent_key", get(handlers::api_get_submission))
        .route(
            "/api/submissions/:agent_key/trajectories",
            get(handlers::api_submission_trajectories),
        )
        .route(
            "/api/trajectories/:submission_dir/:file",
            get(handlers::api_get_trajectory),
        )
        .route(
            "/api/trajectories/:submission_dir/:file/simulations/:simulation_id",
            get(handlers::api_get_simulation),
        )
        .route("/api/tasks", get(handlers::api_list_tasks))
        .route("/api/refresh", post(handlers::api_refresh))
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    // Warm the caches; a failure here is reported but the server still starts
    // so clients can retry through /api/refresh
    if let Err(e) = state.refresh().await {
        tracing::warn!("Initial load failed: {}", e);
    }

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting API server on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

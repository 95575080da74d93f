use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use super::handlers;
use crate::pipeline::InsightsPipeline;

pub fn create_router(pipeline: Arc<InsightsPipeline>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/generate-insights", post(handlers::generate_insights))
        .route("/generate-insights/nightly", post(handlers::generate_nightly))
        .layer(cors)
        .with_state(pipeline)
}

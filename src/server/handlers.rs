use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use super::error::ApiResult;
use crate::insights::{InsightsReport, InsightsRequest};
use crate::pipeline::InsightsPipeline;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Generate a report for the requested scope and try to store it. The
/// report is returned even when storing fails.
pub async fn generate_insights(
    State(pipeline): State<Arc<InsightsPipeline>>,
    payload: Result<Json<InsightsRequest>, JsonRejection>,
) -> ApiResult<Json<InsightsReport>> {
    let Json(request) = payload?;
    let generated = pipeline.generate_and_store(&request).await?;
    Ok(Json(generated.report))
}

pub async fn generate_nightly(
    State(pipeline): State<Arc<InsightsPipeline>>,
) -> ApiResult<Json<Value>> {
    pipeline
        .generate_and_store(&InsightsRequest::global())
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Insights generated for all scopes"
    })))
}

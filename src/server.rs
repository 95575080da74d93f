mod error;
mod handlers;
mod router;

use std::sync::Arc;

use log::info;

pub use router::create_router;

use crate::error::Result;
use crate::pipeline::InsightsPipeline;

pub async fn run(pipeline: Arc<InsightsPipeline>, host: &str, port: u16) -> Result<()> {
    let app = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

//! REST API server for Lectern.
//!
//! Thin HTTP layer over the pipeline: all behavior lives in the injected
//! components, handlers only translate requests and responses.

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::auth::ZoomOauth;
use crate::pipeline::{PipelineMachine, PipelineStatusHandle};
use crate::session::SessionStore;
use crate::transform::TextTransform;
use crate::zoom::ZoomRecordings;

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub oauth: Arc<ZoomOauth>,
    pub recordings: Arc<ZoomRecordings>,
    pub pipeline: Arc<PipelineMachine>,
    pub questions: Arc<dyn TextTransform>,
    pub status: PipelineStatusHandle,
}

pub struct ApiServer {
    port: u16,
    state: AppState,
}

impl ApiServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::router(self.state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                    - Service info");
        info!("  GET  /auth/login          - Start the authorization flow");
        info!("  GET  /auth/callback       - OAuth redirect target");
        info!("  POST /auth/logout         - Drop session tokens");
        info!("  GET  /recordings          - List cloud recordings");
        info!("  POST /transcript/:id      - Transcribe + proofread a recording");
        info!("  GET  /transcript          - Last processed transcript");
        info!("  GET  /pipeline/status     - Pipeline phase");
        info!("  POST /questions           - Generate study questions");
        info!("  GET  /questions           - Last generated questions");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "lectern",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "lectern"
    }))
}

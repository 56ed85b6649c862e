//! Documentation server.
//!
//! Serves the Swagger UI page at `/`, the raw document at `/openapi.json` and the
//! static assets under `/static/`. The document is rebuilt on every request with
//! the absolute URI of `/` as its server URL.

use crate::openapi_builder::{build_openapi_spec, OpenApiDocument};
use crate::registry::Api;
use crate::serializer::serialize_json_compact;
use crate::settings::Settings;
use crate::template::render_index;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{debug, error, info};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Shared state for the documentation server
#[derive(Clone)]
pub struct DocsState {
    pub settings: Arc<Settings>,
    pub apis: Arc<Vec<Api>>,
}

impl DocsState {
    pub fn new(settings: Settings, apis: Vec<Api>) -> Self {
        Self {
            settings: Arc::new(settings),
            apis: Arc::new(apis),
        }
    }

    fn document(&self, headers: &HeaderMap) -> crate::error::Result<OpenApiDocument> {
        let server_url = request_server_url(headers, self.settings.bind);
        debug!("Building OpenAPI document for {}", server_url);
        build_openapi_spec(&self.settings, &self.apis, Some(&server_url))
    }
}

/// Absolute URI of `/` as seen by the client
pub fn request_server_url(headers: &HeaderMap, bind: SocketAddr) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.to_string())
        .unwrap_or_else(|| bind.to_string());
    format!("{}://{}/", scheme, host)
}

fn error_response(err: impl std::fmt::Display) -> Response {
    error!("Failed to build OpenAPI document: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": {"code": 500, "message": err.to_string()}})),
    )
        .into_response()
}

async fn index_handler(State(state): State<DocsState>, headers: HeaderMap) -> Response {
    let document = match state.document(&headers) {
        Ok(document) => document,
        Err(e) => return error_response(e),
    };
    match serialize_json_compact(&document) {
        Ok(json_spec) => {
            Html(render_index(&state.settings.index_title, "/static/", &json_spec)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn spec_handler(State(state): State<DocsState>, headers: HeaderMap) -> Response {
    match state.document(&headers) {
        Ok(document) => Json(document).into_response(),
        Err(e) => error_response(e),
    }
}

/// Build the documentation router
pub fn router(state: DocsState) -> Router {
    let static_dir = ServeDir::new(&state.settings.static_dir);
    Router::new()
        .route("/", get(index_handler))
        .route("/openapi.json", get(spec_handler))
        .nest_service("/static", static_dir)
        .with_state(state)
}

/// Serve the documentation until the process is stopped
pub async fn serve(state: DocsState, bind: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener on {}: {}", bind, e))?;

    info!("Serving API documentation on http://{}/", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}

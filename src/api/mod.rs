// API module - HTTP endpoints

use axum::{
    extract::OriginalUri,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod cards;
pub mod health;
pub mod state;

pub use state::AppState;

/// Success envelope shared by every card endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data,
        }
    }
}

/// 404 for unknown paths, and for known paths hit with a method they don't serve
pub(crate) async fn route_not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    tracing::debug!(path = %uri.path(), "No route matched");

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Route not found",
            "path": uri.path(),
        })),
    )
}

/// Builds the full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check).fallback(route_not_found))
        .nest("/api", cards::router())
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

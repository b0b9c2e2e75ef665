use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::JSON_BODY_LIMIT;
use crate::db::RealtimeStore;
use crate::handlers::{devices, health};

/// Immutable per-process state; `store` is `None` when the database is unavailable.
#[derive(Clone)]
pub struct GatewayState {
    pub store: Option<Arc<dyn RealtimeStore>>,
}

impl GatewayState {
    pub fn new(store: Option<Arc<dyn RealtimeStore>>) -> Self {
        Self { store }
    }

    pub fn unconfigured() -> Self {
        Self { store: None }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }
}

/// API routes, health check, and the static files under `static_root` as fallback.
pub fn gateway_router(state: GatewayState, static_root: &Path) -> Router {
    let api = Router::new()
        .route("/api/devices", get(devices::list_devices))
        .route(
            "/api/device/{id}",
            get(devices::get_device).post(devices::set_device),
        )
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .with_state(state);

    api.fallback_service(ServeDir::new(static_root))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

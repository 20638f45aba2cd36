mod demo;
mod font_route;
mod index;
mod leak;
mod static_setup;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Assembles the route table of spec.md §4.6. `enable_trace` gates
/// `tower_http::trace` request logging, driven by the `FASTAPI_LOGGING`
/// setting (spec.md §4.8).
pub fn build_router(state: Arc<AppState>, enable_trace: bool) -> Router {
    let router = Router::new()
        .route("/", get(index::handle))
        .route("/static", get(static_setup::handle))
        .route("/leak", get(leak::handle))
        .route("/font.ttf", get(font_route::handle))
        .route("/test", get(demo::handle_test))
        .route("/test-static", get(demo::handle_test_static))
        .with_state(state)
        .layer(CorsLayer::permissive());

    if enable_trace {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

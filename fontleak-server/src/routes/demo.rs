//! `GET /test` and `GET /test-static`: per-browser demo HTML pages
//! (spec.md §4.6, supplemented in SPEC_FULL.md §10 — useful for exercising
//! the dynamic and static flows from a plain browser tab rather than via
//! `curl`).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::AppState;

pub async fn handle_test(State(state): State<Arc<AppState>>) -> Response {
    let body = demo_page(&state.settings.host, "dynamic leak demo", "/");
    html_response(body)
}

pub async fn handle_test_static(State(state): State<Arc<AppState>>) -> Response {
    let body = demo_page(&state.settings.host, "static leak demo", "/static");
    html_response(body)
}

fn demo_page(host: &str, title: &str, setup_path: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><title>{title}</title></head>\n<body>\n<script>document.title = document.title;</script>\n<link rel=\"stylesheet\" href=\"{host}{setup_path}\">\n</body>\n</html>\n"
    )
}

fn html_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html")],
        body,
    )
        .into_response()
}

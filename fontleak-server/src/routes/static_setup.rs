//! `GET /static`: allocates a fresh static setup keyed by a new `sid`,
//! returning CSS bound to it (spec.md §4.6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::browser::Browser;
use crate::error::ApiError;
use crate::session::{LeakSetup, StaticSetup};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StaticParams {
    pub selector: Option<String>,
    pub parent: Option<String>,
    pub alphabet: Option<String>,
    pub attr: Option<String>,
    pub strip: Option<bool>,
    pub length: Option<usize>,
    pub browser: Option<String>,
}

pub async fn handle(State(state): State<Arc<AppState>>, Query(params): Query<StaticParams>) -> Response {
    let browser = match params.browser.as_deref() {
        Some(value) => match Browser::parse_setting(value) {
            Some(browser) => browser,
            None => return ApiError::UnsupportedBrowser(value.to_string()).into_response(),
        },
        None => Browser::All,
    };

    let sid = state.next_sid();
    let setup = LeakSetup {
        selector: params.selector.unwrap_or_else(|| state.settings.selector.clone()),
        parent: params.parent.unwrap_or_else(|| state.settings.parent.clone()),
        alphabet: params.alphabet.unwrap_or_else(|| state.settings.alphabet.clone()),
        attr: params.attr.unwrap_or_else(|| state.settings.attr.clone()),
        strip: params.strip.unwrap_or(true),
        timeout: state.settings.timeout,
    };

    let static_setup = StaticSetup {
        sid: sid.clone(),
        setup,
        length: params.length.unwrap_or(state.settings.length),
        browser,
    };
    state.orchestrator.store.put_static_setup(static_setup);

    let body = format!(
        "/* static setup installed: sid={sid}, host={host} */",
        host = state.settings.host,
    );
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/css")],
        body,
    )
        .into_response()
}

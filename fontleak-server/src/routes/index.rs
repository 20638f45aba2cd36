//! `GET /`: setup/step fetch (spec.md §4.5).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::browser::Browser;
use crate::orchestrator::StepResponse;
use crate::session::LeakSetup;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct IndexParams {
    pub id: Option<String>,
    pub step: Option<usize>,
    #[serde(default = "default_staging")]
    pub staging: bool,
    pub selector: Option<String>,
    pub parent: Option<String>,
    pub alphabet: Option<String>,
    pub attr: Option<String>,
    #[serde(default)]
    pub strip: Option<bool>,
}

fn default_staging() -> bool {
    true
}

pub async fn handle(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IndexParams>,
    headers: HeaderMap,
) -> Response {
    let browser = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(Browser::from_user_agent)
        .unwrap_or(Browser::All);

    let setup = LeakSetup {
        selector: params.selector.unwrap_or_else(|| state.settings.selector.clone()),
        parent: params.parent.unwrap_or_else(|| state.settings.parent.clone()),
        alphabet: params.alphabet.unwrap_or_else(|| state.settings.alphabet.clone()),
        attr: params.attr.unwrap_or_else(|| state.settings.attr.clone()),
        strip: params.strip.unwrap_or(true),
        timeout: state.settings.timeout,
    };

    // spec.md §9 resolution: step outside [0, length] is a client error.
    if let Some(step) = params.step {
        if step > state.settings.length {
            return (StatusCode::BAD_REQUEST, "step out of range").into_response();
        }
    }

    let result = state
        .orchestrator
        .handle_index(
            params.id,
            params.step,
            params.staging,
            browser,
            state.settings.length,
            setup,
        )
        .await;

    match result {
        Ok((_, StepResponse::Css(css))) => css_response(css),
        Ok((_, StepResponse::Empty)) => css_response(String::new()),
        Ok((_, StepResponse::Font(font))) => font_response(font),
        Err(err) => err.into_response(),
    }
}

fn css_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/css")],
        body,
    )
        .into_response()
}

fn font_response(font: fontleak_core::FontArtifact) -> Response {
    let bytes = decode_data_url(&font.data_url);
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "font/opentype")],
        bytes,
    )
        .into_response()
}

fn decode_data_url(data_url: &str) -> Vec<u8> {
    use base64::Engine;
    let b64 = data_url.rsplit(',').next().unwrap_or("");
    base64::engine::general_purpose::STANDARD
        .decode(b64)
        .unwrap_or_default()
}

//! `GET /font.ttf`: a default-alphabet font for debugging (spec.md §4.6).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::AppState;

pub async fn handle(State(state): State<Arc<AppState>>) -> Response {
    let opts = fontleak_core::FontBuilderOptions {
        alphabet: match fontleak_core::AlphabetModel::normalise(&state.settings.alphabet) {
            Ok(a) => a,
            Err(err) => return crate::error::ApiError::Font(err).into_response(),
        },
        idx_max: state.settings.length,
        strip: true,
        prefix: Vec::new(),
        prefix_idx: false,
        offset: 0,
    };
    let artifact = state.orchestrator.fonts.get_or_build(&opts, || {
        fontleak_core::FontBuilder::generate(&opts)
            .map(std::sync::Arc::new)
            .unwrap_or_else(|_| {
                std::sync::Arc::new(fontleak_core::FontArtifact {
                    data_url: String::new(),
                    step_map: Vec::new(),
                })
            })
    });

    let bytes = decode_data_url(&artifact.data_url);
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

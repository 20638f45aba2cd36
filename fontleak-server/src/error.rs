//! Maps [`FontError`] plus server-specific failure modes onto HTTP
//! responses (spec.md §7). `SessionUnknown` and timeout are deliberately
//! *not* represented here — per spec.md §7 they are protocol outcomes
//! (silent no-op / empty-200-CSS), handled as `Ok` branches in the route
//! handlers, never surfaced as an `ApiError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use fontleak_core::FontError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("font synthesis failed: {0}")]
    Font(#[from] FontError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsupported browser: {0}")]
    UnsupportedBrowser(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Font(_) | ApiError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UnsupportedBrowser(_) => StatusCode::NOT_IMPLEMENTED,
        };
        log::warn!("request rejected: {self}");
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_errors_map_to_422() {
        let err = ApiError::Font(FontError::AlphabetTooLarge { len: 200, max: 128 });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unsupported_browser_maps_to_501() {
        let err = ApiError::UnsupportedBrowser("opera".into());
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }
}

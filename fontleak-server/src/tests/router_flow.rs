//! End-to-end router tests driven through `tower::ServiceExt::oneshot`,
//! exercising the same `Router` `main` serves (spec.md §4.6/§8).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crate::config::Settings;
use crate::orchestrator::LeakOrchestrator;
use crate::routes::build_router;
use crate::store::SessionStore;
use crate::AppState;
use fontleak_core::FontCache;

fn test_settings() -> Settings {
    Settings {
        host: "http://localhost:4242".into(),
        host_leak: "http://127.0.0.1:4242".into(),
        selector: "script:first-of-type".into(),
        parent: "body".into(),
        alphabet: "ab".into(),
        attr: "textContent".into(),
        timeout: Duration::from_millis(50),
        length: 10,
        browser: "all".into(),
        fastapi_logging: false,
        listen: "0.0.0.0:0".into(),
    }
}

fn test_state() -> Arc<AppState> {
    let store = Arc::new(SessionStore::new());
    let fonts = Arc::new(FontCache::new());
    let settings = test_settings();
    let orchestrator = LeakOrchestrator::new(
        store,
        fonts,
        settings.host.clone(),
        settings.host_leak.clone(),
    );
    Arc::new(AppState {
        settings,
        orchestrator,
        next_sid: std::sync::atomic::AtomicU64::new(1),
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn chrome_staging_request_creates_a_session_and_imports_step_zero() {
    let router = build_router(test_state(), false);
    let req = Request::builder()
        .uri("/")
        .header("user-agent", "Mozilla/5.0 Chrome/120.0 Safari/537.36")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("@import"));
    assert!(body.contains("step=0"));
}

#[tokio::test]
async fn leak_probe_always_returns_400_with_png_and_no_store() {
    let router = build_router(test_state(), false);
    let req = Request::builder()
        .uri("/leak?id=missing&idx=0")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/png"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-store, no-cache, must-revalidate"
    );
}

#[tokio::test]
async fn static_setup_allocates_a_sid_referenced_in_the_response() {
    let router = build_router(test_state(), false);
    let req = Request::builder()
        .uri("/static?alphabet=ab&length=4")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("sid=s1"));
}

#[tokio::test]
async fn font_route_serves_an_opentype_payload() {
    let router = build_router(test_state(), false);
    let req = Request::builder()
        .uri("/font.ttf")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "font/opentype"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"OTTO") || bytes[0..4] == [0, 1, 0, 0]);
}

#[tokio::test]
async fn static_setup_rejects_an_unrecognized_browser_setting() {
    let router = build_router(test_state(), false);
    let req = Request::builder()
        .uri("/static?browser=opera")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn firefox_dynamic_request_gets_an_animation_keyframe_timeline() {
    let router = build_router(test_state(), false);
    let req = Request::builder()
        .uri("/?staging=false")
        .header(
            "user-agent",
            "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
        )
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("@keyframes fontleak-step"));
}

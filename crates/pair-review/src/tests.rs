use crate::build_state;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use pr_config::Config;
use pr_store::Store;
use tower::ServiceExt;

#[tokio::test]
async fn wired_state_serves_healthz() {
    let store = Store::open_in_memory().unwrap();
    let state = build_state(&Config::default(), store);
    let router = pr_http::router(state);

    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

//! Behavioural tests for the assembled application: middleware order,
//! OpenAPI and metrics endpoints, and store binding.

#[path = "support/app.rs"]
mod app_support;

use std::sync::Arc;

use actix_web::body::to_bytes;
use actix_web::http::{Method, StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{HttpResponse, web};
use ambulance_webapi::domain::{Ambulance, TRACE_ID_HEADER};
use ambulance_webapi::middleware::BoundStore;
use ambulance_webapi::server::build_app;
use app_support::TestApp;
use rstest::{fixture, rstest};

#[fixture]
fn test_app() -> TestApp {
    TestApp::new()
}

async fn explode() -> HttpResponse {
    panic!("handler exploded")
}

async fn store_address(store: BoundStore<Ambulance>) -> HttpResponse {
    let address = Arc::as_ptr(&store.store()) as *const () as usize;
    HttpResponse::Ok().body(address.to_string())
}

#[rstest]
#[actix_web::test]
async fn panics_become_internal_errors_and_are_counted(test_app: TestApp) {
    let app = test::init_service(
        build_app(test_app.deps()).route("/boom", web::get().to(explode)),
    )
    .await;

    let err = test::try_call_service(&app, TestRequest::get().uri("/boom").to_request())
        .await
        .err()
        .expect("panic is recovered as an error");
    let res = err.error_response();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(res.into_body()).await.expect("read body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["code"], "internal_error");
    assert_eq!(body["message"], "Internal server error");

    let res = test::call_service(&app, TestRequest::get().uri("/metrics").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let exposition = test::read_body(res).await;
    let text = std::str::from_utf8(&exposition).expect("utf8 exposition");
    let boom = text
        .lines()
        .find(|line| {
            line.starts_with("http_server_request_count") && line.contains("http_route=\"/boom\"")
        })
        .unwrap_or_else(|| panic!("no request count for /boom:\n{text}"));
    assert!(boom.contains("http_status_code=\"500\""), "{boom}");
}

#[rstest]
#[actix_web::test]
async fn routes_are_reachable_through_the_full_middleware_stack(test_app: TestApp) {
    let app = test::init_service(build_app(test_app.deps())).await;

    for uri in ["/openapi", "/metrics", "/api/ambulance"] {
        let res = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
}

#[rstest]
#[actix_web::test]
async fn preflight_is_answered_before_routing(test_app: TestApp) {
    let app = test::init_service(build_app(test_app.deps())).await;

    let res = test::call_service(
        &app,
        TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/api/waiting-list/bobulova/entries")
            .insert_header((header::ORIGIN, "https://wac-hospital.example"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
            .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()
            .get(header::ACCESS_CONTROL_MAX_AGE)
            .and_then(|value| value.to_str().ok()),
        Some("43200")
    );
    assert!(
        !res.headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
    );
}

#[rstest]
#[actix_web::test]
async fn openapi_document_is_served_as_yaml(test_app: TestApp) {
    let app = test::init_service(build_app(test_app.deps())).await;

    let res = test::call_service(&app, TestRequest::get().uri("/openapi").to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(TRACE_ID_HEADER));
    let body = test::read_body(res).await;
    let text = std::str::from_utf8(&body).expect("utf8 document");
    assert!(text.contains("openapi:"), "{text}");
    assert!(text.contains("/api/waiting-list/{ambulanceId}/entries"), "{text}");
}

#[rstest]
#[case(Method::GET)]
#[case(Method::POST)]
#[actix_web::test]
async fn metrics_are_exposed_for_any_method(test_app: TestApp, #[case] method: Method) {
    let app = test::init_service(build_app(test_app.deps())).await;
    test::call_service(&app, TestRequest::get().uri("/openapi").to_request()).await;

    let res = test::call_service(
        &app,
        TestRequest::default()
            .method(method)
            .uri("/metrics")
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body = test::read_body(res).await;
    let text = std::str::from_utf8(&body).expect("utf8 exposition");
    assert!(text.contains("http_server_request_count"), "{text}");
    assert!(text.contains("http_route=\"/openapi\""), "{text}");
}

#[rstest]
#[actix_web::test]
async fn every_request_sees_the_same_store(test_app: TestApp) {
    let expected = Arc::as_ptr(&test_app.dyn_store()) as *const () as usize;
    let app = test::init_service(
        build_app(test_app.deps()).route("/store", web::get().to(store_address)),
    )
    .await;

    for _ in 0..3 {
        let res = test::call_service(&app, TestRequest::get().uri("/store").to_request()).await;
        let body = test::read_body(res).await;
        assert_eq!(body, expected.to_string());
    }
}

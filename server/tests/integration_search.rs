use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use docsearch_core::timestamp::{Clock, FixedClock};
use docsearch_core::{Document, EngineConfig, SearchEngine};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_app, ContentResponse, DEFAULT_SEARCH_TIMEOUT};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use time::macros::datetime;
use time::PrimitiveDateTime;
use tower::ServiceExt;

fn tiny_app(dir: &std::path::Path) -> (Router, Arc<SearchEngine>) {
    let clock = Arc::new(FixedClock::new(datetime!(2025-01-01 00:00:00)));
    let engine = Arc::new(SearchEngine::open_with_clock(EngineConfig::new(dir), clock).unwrap());
    (build_app(engine.clone(), DEFAULT_SEARCH_TIMEOUT), engine)
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn seed(app: &Router) {
    let body = json!([
        {"content": "The quick brown fox", "createdDate": "2024-01-01T00:00:00"},
        {"content": "Lazy dogs sleep", "createdDate": "2024-06-01T00:00:00"}
    ]);
    let (status, body) = call(app.clone(), post_json("/api/v1/content/indexcontent", body)).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["responseMessage"], "Success");
}

#[tokio::test]
async fn index_then_search_by_path() {
    let dir = tempdir().unwrap();
    let (app, _) = tiny_app(dir.path());
    seed(&app).await;

    let (status, body) = call(app.clone(), get("/api/v1/content/searchcontent/fox/2024-01-01T00:00:00")).await;
    assert_eq!(status, StatusCode::OK);
    let results: Vec<ContentResponse> = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        results,
        vec![ContentResponse { content: "The quick brown fox".into(), created_date: "2024-01-01T00:00:00".into() }]
    );

    let (status, body) = call(app, get("/api/v1/content/searchcontent/fox/2024-02-01T00:00:00")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["responseMessage"], "Not Found");
}

#[tokio::test]
async fn empty_key_via_query_string_lists_everything() {
    let dir = tempdir().unwrap();
    let (app, _) = tiny_app(dir.path());
    seed(&app).await;

    let (status, body) =
        call(app, get("/api/v1/content/searchcontent?searchKey=&createdDate=2023-01-01T00:00:00")).await;
    assert_eq!(status, StatusCode::OK);
    let results: Vec<ContentResponse> = serde_json::from_slice(&body).unwrap();
    let contents: Vec<&str> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["The quick brown fox", "Lazy dogs sleep"]);
}

#[tokio::test]
async fn bad_input_is_a_client_error() {
    let dir = tempdir().unwrap();
    let (app, _) = tiny_app(dir.path());
    seed(&app).await;

    let (status, _) = call(app.clone(), get("/api/v1/content/searchcontent/fox/not-a-date")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(app.clone(), get("/api/v1/content/searchcontent/%22fox/2024-01-01T00:00:00")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(app.clone(), post_json("/api/v1/content/indexcontent", json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_date = json!([{"content": "x", "createdDate": "someday"}]);
    let (status, _) = call(app.clone(), post_json("/api/v1/content/indexcontent", bad_date)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing_field = json!([{"content": "x"}]);
    let (status, _) = call(app, post_json("/api/v1/content/indexcontent", missing_field)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn closed_engine_is_unavailable() {
    let dir = tempdir().unwrap();
    let (app, engine) = tiny_app(dir.path());
    seed(&app).await;
    engine.close().unwrap();

    let (status, _) = call(app, get("/api/v1/content/searchcontent/fox/2024-01-01T00:00:00")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health() {
    let dir = tempdir().unwrap();
    let (app, _) = tiny_app(dir.path());
    let (status, body) = call(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

/// Clock that can be told to hang, standing in for a search that runs long.
struct StallingClock {
    stall: AtomicBool,
}

impl Clock for StallingClock {
    fn now(&self) -> PrimitiveDateTime {
        if self.stall.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(300));
        }
        datetime!(2025-01-01 00:00:00)
    }
}

#[tokio::test]
async fn slow_search_times_out_without_partial_results() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(StallingClock { stall: AtomicBool::new(false) });
    let engine = Arc::new(SearchEngine::open_with_clock(EngineConfig::new(dir.path()), clock.clone()).unwrap());
    engine.index_content(&[Document::new("The quick brown fox", datetime!(2024-01-01 00:00:00))]).unwrap();
    let app = build_app(engine, Duration::from_millis(20));

    clock.stall.store(true, Ordering::SeqCst);
    let (status, body) = call(app.clone(), get("/api/v1/content/searchcontent/fox/2024-01-01T00:00:00")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!({"responseMessage": "Timeout"}));

    clock.stall.store(false, Ordering::SeqCst);
    let (status, _) = call(app, get("/api/v1/content/searchcontent/fox/2024-01-01T00:00:00")).await;
    assert_eq!(status, StatusCode::OK);
}

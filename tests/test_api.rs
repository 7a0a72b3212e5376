//! Integration test: HTTP API endpoints

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use penguin_serve::server::{create_router, AppState, ServerConfig};

/// Router backed by a temp artifact directory. The `TempDir` must outlive
/// the requests.
fn test_app() -> (axum::Router, TempDir) {
    let dir = common::artifact_dir();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        data_dir: dir.path().to_str().unwrap().to_string(),
    };
    let state = Arc::new(AppState::new(config).unwrap());
    (create_router(state), dir)
}

fn predict_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sample_body() -> Value {
    json!({
        "bill_length_mm": 39.1,
        "bill_depth_mm": 18.7,
        "flipper_length_mm": 181.0,
        "body_mass_g": 3750.0,
        "year": 2007,
        "sex": "male",
        "island": "Torgersen"
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_root_endpoint() {
    let (app, _dir) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Hello world");
}

#[tokio::test]
async fn test_predict_returns_known_species() {
    let (app, _dir) = test_app();
    let response = app.oneshot(predict_request(&sample_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let prediction = body["prediction"].as_str().unwrap();
    assert!(["Adelie", "Chinstrap", "Gentoo"].contains(&prediction));
}

#[tokio::test]
async fn test_predict_is_idempotent() {
    let (app, _dir) = test_app();
    let first = app
        .clone()
        .oneshot(predict_request(&sample_body()))
        .await
        .unwrap();
    let second = app.oneshot(predict_request(&sample_body())).await.unwrap();

    assert_eq!(
        body_json(first).await["prediction"],
        body_json(second).await["prediction"]
    );
}

#[tokio::test]
async fn test_missing_field_is_422_naming_the_field() {
    let (app, _dir) = test_app();
    let mut body = sample_body();
    body.as_object_mut().unwrap().remove("island");

    let response = app.oneshot(predict_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("island"));
}

#[tokio::test]
async fn test_wrong_type_is_422() {
    let (app, _dir) = test_app();
    let mut body = sample_body();
    body["bill_length_mm"] = json!("abc");

    let response = app.oneshot(predict_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_out_of_enum_value_is_422() {
    let (app, _dir) = test_app();
    let mut body = sample_body();
    body["sex"] = json!("other");

    let response = app.oneshot(predict_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_empty_request_is_422() {
    let (app, _dir) = test_app();
    let response = app.oneshot(predict_request(&json!({}))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_negative_measurements_still_predict() {
    // Type-valid but physically impossible values pass through: no range
    // validation by design.
    let (app, _dir) = test_app();
    let mut body = sample_body();
    body["body_mass_g"] = json!(-1000.0);

    let response = app.oneshot(predict_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["prediction"].is_string());
}

#[tokio::test]
async fn test_extra_fields_ignored() {
    let (app, _dir) = test_app();
    let mut body = sample_body();
    body["tag_id"] = json!("N1A1");

    let response = app.oneshot(predict_request(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (app, _dir) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_on_predict_is_405() {
    let (app, _dir) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/predict")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_missing_model_is_generic_internal_error() {
    let (app, dir) = test_app();
    // Metadata stays; the model artifact disappears between startup and
    // the request. Both load sources fail, so the request gets a 500 with
    // no internal detail.
    std::fs::remove_file(dir.path().join(penguin_serve::artifact::MODEL_FILE)).unwrap();

    let response = app.oneshot(predict_request(&sample_body())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert_eq!(message, "Prediction failed due to internal error.");
}

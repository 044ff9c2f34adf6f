//! Integration tests for the search API endpoints and top-level routes

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt; // for `oneshot`

mod helpers;
use helpers::{body_json, get, json_request, setup_test_app, ScriptedInvoker};

#[tokio::test]
async fn test_root() {
    let app = setup_test_app(ScriptedInvoker::default());

    let response = app.router.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "running");
}

#[tokio::test]
async fn test_run_search() {
    let app = setup_test_app(ScriptedInvoker::default());

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/v1/searches",
            json!({ "venue_name": " The Old Barn ", "search_type": "venue" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["venue_name"], "The Old Barn");
    assert_eq!(json["data"]["images"].as_array().unwrap().len(), 1);
    assert_eq!(app.invoker.calls(), vec!["The Old Barn".to_string()]);
}

#[tokio::test]
async fn test_run_search_blank_name() {
    let app = setup_test_app(ScriptedInvoker::default());

    let response = app
        .router
        .oneshot(json_request("POST", "/api/v1/searches", json!({ "venue_name": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert!(app.invoker.calls().is_empty());
}

#[tokio::test]
async fn test_run_search_without_results() {
    let app = setup_test_app(ScriptedInvoker::failing(&["Nowhere Manor"]));

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/v1/searches",
            json!({ "venue_name": "Nowhere Manor" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["message"], "No images found for 'Nowhere Manor'");
}
